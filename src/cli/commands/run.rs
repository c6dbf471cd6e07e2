//! `recast run` - execute a change plan

use std::sync::Arc;

use crate::app::App;
use crate::cli::{RunArgs, print_json};
use crate::executor::audit::JsonlAuditSink;
use crate::models::plan::ExecutionStatus;

pub async fn execute(args: RunArgs) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&args.plan)
        .map_err(|e| anyhow::anyhow!("cannot read plan {}: {}", args.plan.display(), e))?;
    let artifact: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| anyhow::anyhow!("plan is not valid JSON: {}", e))?;

    let app = App::init(args.root)?;
    let audit = Arc::new(JsonlAuditSink::new(app.root.join(".recast").join("audit")));
    let executor = app.executor(audit);

    let result = executor.execute(&artifact, args.mode).await;
    print_json(&result)?;

    if result.status != ExecutionStatus::Success {
        std::process::exit(1);
    }
    Ok(())
}
