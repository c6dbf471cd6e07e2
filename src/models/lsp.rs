//! LSP wire-format domain types
//!
//! Positions and ranges follow the LSP convention (0-indexed lines and
//! characters); conversion to the 1-indexed model types happens at the
//! client boundary.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Position in a document (0-indexed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Range in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }
}

/// Location in a file (LSP wire format)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LspLocation {
    pub uri: String,
    #[serde(default)]
    pub range: Range,
}

/// A single text edit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

/// Workspace edit returned by rename and file-operation requests
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEdit {
    /// uri -> edits
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub changes: HashMap<String, Vec<TextEdit>>,
    /// Some servers respond with documentChanges instead of changes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub document_changes: Vec<TextDocumentEdit>,
}

impl WorkspaceEdit {
    /// Collapse `changes` and `document_changes` into one uri -> edits map
    pub fn all_changes(&self) -> HashMap<String, Vec<TextEdit>> {
        let mut merged = self.changes.clone();
        for doc_change in &self.document_changes {
            merged
                .entry(doc_change.text_document.uri.clone())
                .or_default()
                .extend(doc_change.edits.iter().cloned());
        }
        merged
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.document_changes.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextDocumentEdit {
    pub text_document: VersionedTextDocumentIdentifier,
    pub edits: Vec<TextEdit>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionedTextDocumentIdentifier {
    pub uri: String,
    #[serde(default)]
    pub version: Option<i64>,
}

/// Convert a filesystem path to a file:// URI
pub fn path_to_uri(path: &Path) -> String {
    let path_str = path.to_string_lossy();

    #[cfg(windows)]
    {
        format!("file:///{}", path_str.replace('\\', "/"))
    }

    #[cfg(not(windows))]
    {
        format!("file://{}", path_str)
    }
}

/// Convert a file:// URI back to a filesystem path
pub fn uri_to_path(uri: &str) -> Option<PathBuf> {
    let stripped = uri.strip_prefix("file://")?;

    #[cfg(windows)]
    let stripped = stripped.trim_start_matches('/');

    // Percent-decode the common cases (spaces and friends)
    let decoded = percent_decode(stripped);
    Some(PathBuf::from(decoded))
}

fn percent_decode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut bytes = s.bytes();
    while let Some(b) = bytes.next() {
        if b == b'%' {
            let hi = bytes.next();
            let lo = bytes.next();
            if let (Some(hi), Some(lo)) = (hi, lo)
                && let (Some(hi), Some(lo)) = ((hi as char).to_digit(16), (lo as char).to_digit(16))
            {
                out.push((hi * 16 + lo) as u8 as char);
                continue;
            }
            out.push('%');
        } else {
            out.push(b as char);
        }
    }
    out
}

/// Apply text edits to content, producing the edited document.
///
/// Edits are applied back-to-front so earlier offsets stay valid.
pub fn apply_text_edits(content: &str, edits: &[TextEdit]) -> String {
    let mut sorted: Vec<&TextEdit> = edits.iter().collect();
    sorted.sort_by(|a, b| {
        (b.range.start.line, b.range.start.character)
            .cmp(&(a.range.start.line, a.range.start.character))
    });

    let mut result = content.to_string();
    for edit in sorted {
        let Some(start) = offset_of(&result, edit.range.start) else {
            continue;
        };
        let Some(end) = offset_of(&result, edit.range.end) else {
            continue;
        };
        if start <= end && end <= result.len() {
            result.replace_range(start..end, &edit.new_text);
        }
    }
    result
}

/// Byte offset of an LSP position within content
fn offset_of(content: &str, pos: Position) -> Option<usize> {
    let mut offset = 0usize;
    for (i, line) in content.split_inclusive('\n').enumerate() {
        if i as u32 == pos.line {
            let col = pos.character as usize;
            let line_body = line.trim_end_matches('\n');
            let byte_col = line_body
                .char_indices()
                .nth(col)
                .map(|(idx, _)| idx)
                .unwrap_or(line_body.len());
            return Some(offset + byte_col);
        }
        offset += line.len();
    }
    // Position at end of document
    if pos.line as usize >= content.split_inclusive('\n').count() {
        Some(content.len())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uri_round_trip() {
        let path = Path::new("/workspace/src/main.rs");
        let uri = path_to_uri(path);
        assert_eq!(uri, "file:///workspace/src/main.rs");
        assert_eq!(uri_to_path(&uri).unwrap(), path);
    }

    #[test]
    fn test_uri_percent_decode() {
        let path = uri_to_path("file:///work%20space/a.rs").unwrap();
        assert_eq!(path, PathBuf::from("/work space/a.rs"));
    }

    #[test]
    fn test_apply_single_edit() {
        let content = "fn old_name() {}\n";
        let edits = vec![TextEdit {
            range: Range::new(Position::new(0, 3), Position::new(0, 11)),
            new_text: "new_name".to_string(),
        }];
        assert_eq!(apply_text_edits(content, &edits), "fn new_name() {}\n");
    }

    #[test]
    fn test_apply_multiple_edits_back_to_front() {
        let content = "let a = a + a;\n";
        let edits = vec![
            TextEdit {
                range: Range::new(Position::new(0, 4), Position::new(0, 5)),
                new_text: "total".to_string(),
            },
            TextEdit {
                range: Range::new(Position::new(0, 8), Position::new(0, 9)),
                new_text: "total".to_string(),
            },
            TextEdit {
                range: Range::new(Position::new(0, 12), Position::new(0, 13)),
                new_text: "total".to_string(),
            },
        ];
        assert_eq!(apply_text_edits(content, &edits), "let total = total + total;\n");
    }

    #[test]
    fn test_apply_multiline_edit() {
        let content = "line one\nline two\nline three\n";
        let edits = vec![TextEdit {
            range: Range::new(Position::new(1, 5), Position::new(1, 8)),
            new_text: "2".to_string(),
        }];
        assert_eq!(apply_text_edits(content, &edits), "line one\nline 2\nline three\n");
    }

    #[test]
    fn test_workspace_edit_merges_document_changes() {
        let edit = WorkspaceEdit {
            changes: HashMap::from([(
                "file:///a.rs".to_string(),
                vec![TextEdit {
                    range: Range::default(),
                    new_text: "x".to_string(),
                }],
            )]),
            document_changes: vec![TextDocumentEdit {
                text_document: VersionedTextDocumentIdentifier {
                    uri: "file:///b.rs".to_string(),
                    version: Some(1),
                },
                edits: vec![TextEdit {
                    range: Range::default(),
                    new_text: "y".to_string(),
                }],
            }],
        };
        let merged = edit.all_changes();
        assert_eq!(merged.len(), 2);
        assert!(merged.contains_key("file:///b.rs"));
    }
}
