use std::path::Path;

use modelsmith_codegen::GeneratorOptions;

use crate::CliResult;

/// Load generator options from a TOML file.
///
/// The file uses the same keys as [`GeneratorOptions`]; anything left out
/// keeps its default.
pub fn load_options(path: &Path) -> CliResult<GeneratorOptions> {
    let content = std::fs::read_to_string(path)?;
    let options: GeneratorOptions = toml::from_str(&content)?;
    tracing::debug!(
        event = "config_loaded",
        path = %path.display(),
        relationships = options.relationships.len(),
        types = options.types.len()
    );
    Ok(options)
}
