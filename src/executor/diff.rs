//! Diff rendering for prospective changes

use similar::TextDiff;

use crate::models::refactor::RefactorChange;

/// Render one change as unified diff text.
///
/// Moves get explicit from/to headers even when the content is unchanged,
/// so the diff alone documents what apply will do.
pub fn render(change: &RefactorChange) -> String {
    let old_name = change.file.display().to_string();
    let new_name = change
        .new_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| old_name.clone());

    let mut out = String::new();
    if change.is_move() {
        out.push_str(&format!("rename from {}\nrename to {}\n", old_name, new_name));
    }

    if change.original_content == change.new_content {
        out.push_str(&format!("# {}\n", change.description));
        return out;
    }

    let diff = TextDiff::from_lines(&change.original_content, &change.new_content);
    out.push_str(
        &diff
            .unified_diff()
            .context_radius(3)
            .header(&format!("a/{}", old_name), &format!("b/{}", new_name))
            .to_string(),
    );
    out
}
