//! `recast doctor` - language server availability report

use serde::Serialize;

use crate::app::App;
use crate::cli::{DoctorArgs, print_json};
use crate::models::symbol::Language;

#[derive(Serialize)]
struct ServerReport {
    language: String,
    server: String,
    installed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    install_hint: Option<String>,
    memory_limit_mb: u64,
    timeout_secs: u64,
}

pub async fn execute(args: DoctorArgs) -> anyhow::Result<()> {
    let app = App::init(args.root)?;

    let mut reports = Vec::new();
    for language in Language::all() {
        let Some(config) = app.servers.get(language) else {
            continue;
        };
        let installed = config.is_installed();
        reports.push(ServerReport {
            language: language.to_string(),
            server: config.name.clone(),
            installed,
            version: if installed { config.version() } else { None },
            install_hint: if installed {
                None
            } else {
                Some(config.install_hint().to_string())
            },
            memory_limit_mb: config.memory_limit_mb,
            timeout_secs: config.timeout_secs,
        });
    }
    reports.sort_by(|a, b| a.language.cmp(&b.language));

    print_json(&reports)
}
