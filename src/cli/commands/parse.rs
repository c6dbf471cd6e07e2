//! `recast parse` - structural parse of a file or directory

use crate::app::App;
use crate::cli::{ParseArgs, print_json};

pub async fn execute(args: ParseArgs) -> anyhow::Result<()> {
    let app = App::init(args.root)?;

    if args.path.is_dir() {
        let results = app
            .engine
            .parse_batch(&args.path, &app.config.parse.ignore_patterns);
        print_json(&results)
    } else {
        let result = app.engine.parse(&args.path, None);
        print_json(&result)
    }
}
