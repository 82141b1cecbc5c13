use crate::formats::{FormatParser, JsonFormatParser, RonFormatParser};
use crate::{Catalog, LoadError, RepositoryDescriptor};
use log::info;
use std::path::Path;

/// Picks the parser for a file from its extension.
pub fn parser_for_path(path: &Path) -> Result<Box<dyn FormatParser>, LoadError> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();
    let parsers: [Box<dyn FormatParser>; 2] =
        [Box::new(RonFormatParser::new()), Box::new(JsonFormatParser::new())];
    parsers
        .into_iter()
        .find(|p| p.extensions().contains(&extension.as_str()))
        .ok_or(LoadError::UnsupportedFormat(extension))
}

/// Reads and parses a repository file without compiling it.
pub fn load_descriptor(path: &Path) -> Result<RepositoryDescriptor, LoadError> {
    let parser = parser_for_path(path)?;
    let content = std::fs::read_to_string(path)?;
    parser.parse(&content)
}

/// Loads a repository file (`.ron` or `.json`) and compiles it into a catalog.
pub fn load_from_file(path: &Path) -> Result<Catalog, LoadError> {
    let descriptor = load_descriptor(path)?;
    info!(
        "Loaded repository {} ({} layers)",
        path.display(),
        descriptor.layers.len()
    );
    Ok(Catalog::compile(&descriptor)?)
}
