use anyhow::Context;
use lig_config::LigConfig;
use lig_core::relation::RelationDescriptor;
use lig_graph::Graph;
use serde::Serialize;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::CheckArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
pub struct CheckReport {
    pub classes: Vec<ClassSummary>,
}

#[derive(Debug, Serialize)]
pub struct ClassSummary {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extends: Option<String>,
    /// Effective relations, inherited ones first.
    pub relations: Vec<RelationDescriptor>,
}

/// Handle `lig check`.
pub fn handle(args: &CheckArgs, flags: &GlobalFlags, config: &LigConfig) -> anyhow::Result<()> {
    let report = check(args, config)?;
    output(&report, flags.format)
}

fn check(args: &CheckArgs, config: &LigConfig) -> anyhow::Result<CheckReport> {
    let doc = super::read_schema(&args.schema)?;
    let graph = Graph::from_schema_with_config(&doc, config.engine.clone())
        .with_context(|| format!("schema {} does not declare a valid graph", args.schema.display()))?;

    let classes = doc
        .classes
        .iter()
        .filter_map(|class| {
            let id = graph.class_id(&class.name)?;
            Some(ClassSummary {
                name: class.name.clone(),
                extends: class.extends.clone(),
                relations: graph.relations(id),
            })
        })
        .collect();
    Ok(CheckReport { classes })
}
