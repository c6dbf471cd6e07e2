//! `recast capabilities` - effective capability matrix

use std::collections::BTreeMap;

use crate::app::App;
use crate::cli::{CapabilitiesArgs, print_json};
use crate::models::refactor::RefactorOp;
use crate::models::symbol::Language;

pub async fn execute(args: CapabilitiesArgs) -> anyhow::Result<()> {
    let app = App::init(args.root)?;

    let languages: Vec<Language> = match args.language {
        Some(language) => vec![language],
        None => Language::all().to_vec(),
    };

    let matrix: BTreeMap<String, BTreeMap<String, String>> = languages
        .iter()
        .map(|language| {
            let row: BTreeMap<String, String> = RefactorOp::all()
                .iter()
                .map(|op| {
                    (
                        op.to_string(),
                        app.registry.support(*op, *language).to_string(),
                    )
                })
                .collect();
            (language.to_string(), row)
        })
        .collect();

    print_json(&matrix)
}
