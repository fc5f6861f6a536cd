use lig_core::schema::SchemaDoc;

use crate::cli::GlobalFlags;
use crate::output::output;

/// Handle `lig schema`.
pub fn handle(flags: &GlobalFlags) -> anyhow::Result<()> {
    output(&SchemaDoc::json_schema(), flags.format)
}
