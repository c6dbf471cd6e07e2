//! Recast - Deterministic Refactoring Plan Executor CLI
//!
//! Applies approved change plans to multi-language codebases through
//! structural parsing, one-shot language server sessions, external rewrite
//! tools, and an explicitly-unverified textual fallback.

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use recast::cli::{Cli, Commands};

fn main() {
    // Quiet by default; RUST_LOG=recast=debug for verbose output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "recast=warn".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .compact(),
        )
        .init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!(
                r#"{{"success":false,"error":"Failed to create runtime: {}"}}"#,
                e
            );
            std::process::exit(1);
        }
    };
    let result = runtime.block_on(async_main());

    if let Err(e) = result {
        // Errors go out as JSON for consistent machine consumption
        let response = serde_json::json!({
            "success": false,
            "error": e.to_string()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&response)
                .unwrap_or_else(|_| format!(r#"{{"success":false,"error":"{}"}}"#, e))
        );
        std::process::exit(2);
    }
}

async fn async_main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    use recast::cli::commands;
    match cli.command {
        Commands::Run(args) => commands::run::execute(args).await,
        Commands::Parse(args) => commands::parse::execute(args).await,
        Commands::Capabilities(args) => commands::capabilities::execute(args).await,
        Commands::Doctor(args) => commands::doctor::execute(args).await,
    }
}
