use std::path::Path;

use anyhow::Context;
use lig_config::LigConfig;
use lig_core::schema::SchemaDoc;

use crate::cli::{Commands, GlobalFlags};

pub mod check;
pub mod load;
pub mod schema;

/// Route a parsed command to its handler.
pub fn dispatch(command: Commands, flags: &GlobalFlags, config: &LigConfig) -> anyhow::Result<()> {
    match command {
        Commands::Check(args) => check::handle(&args, flags, config),
        Commands::Load(args) => load::handle(&args, flags, config),
        Commands::Schema => schema::handle(flags),
    }
}

/// Read a schema document; `.json` files are JSON, anything else is TOML.
pub fn read_schema(path: &Path) -> anyhow::Result<SchemaDoc> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read schema {}", path.display()))?;
    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let doc = if is_json {
        SchemaDoc::from_json_str(&source)
    } else {
        SchemaDoc::from_toml_str(&source)
    };
    doc.with_context(|| format!("invalid schema {}", path.display()))
}
