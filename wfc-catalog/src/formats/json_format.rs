use crate::formats::FormatParser;
use crate::{LoadError, RepositoryDescriptor};

/// Parser for repositories written in JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonFormatParser;

impl JsonFormatParser {
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for JsonFormatParser {
    fn parse(&self, content: &str) -> Result<RepositoryDescriptor, LoadError> {
        serde_json::from_str(content).map_err(|e| LoadError::ParseError {
            format: self.format_name(),
            message: e.to_string(),
        })
    }

    fn format_name(&self) -> &'static str {
        "JSON"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["json"]
    }
}
