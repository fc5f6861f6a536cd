use anyhow::{Context, bail};
use lig_config::LigConfig;
use lig_graph::{CreateOptions, Graph, GraphSnapshot};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::LoadArgs;
use crate::output::output;

/// One line of a payload batch.
#[derive(Debug, Deserialize)]
struct PayloadLine {
    class: String,
    #[serde(default)]
    data: Value,
}

/// Handle `lig load`.
pub fn handle(args: &LoadArgs, flags: &GlobalFlags, config: &LigConfig) -> anyhow::Result<()> {
    let snapshot = load(args, config)?;
    output(&snapshot, flags.format)
}

fn load(args: &LoadArgs, config: &LigConfig) -> anyhow::Result<GraphSnapshot> {
    let doc = super::read_schema(&args.schema)?;
    let graph = Graph::from_schema_with_config(&doc, config.engine.clone())
        .with_context(|| format!("schema {} does not declare a valid graph", args.schema.display()))?;

    let lines: Vec<PayloadLine> = serde_jsonlines::json_lines(&args.payloads)
        .with_context(|| format!("failed to open {}", args.payloads.display()))?
        .collect::<Result<Vec<_>, _>>()
        .with_context(|| format!("failed to read {}", args.payloads.display()))?;

    let options = CreateOptions {
        parse: !args.no_parse,
    };
    for (index, line) in lines.into_iter().enumerate() {
        let number = index + 1;
        let Some(class) = graph.class_id(&line.class) else {
            bail!("line {number}: unknown class '{}'", line.class);
        };
        let model = graph
            .create_with(class, line.data, options)
            .with_context(|| format!("line {number}: failed to apply {} payload", line.class))?;
        debug!(line = number, class = %line.class, cid = %model.cid(), "applied payload");
    }

    Ok(graph.snapshot())
}
