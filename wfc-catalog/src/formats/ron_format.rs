use crate::formats::FormatParser;
use crate::{LoadError, RepositoryDescriptor};

/// Parser for repositories written in RON (Rusty Object Notation).
#[derive(Debug, Default, Clone, Copy)]
pub struct RonFormatParser;

impl RonFormatParser {
    pub fn new() -> Self {
        Self
    }
}

impl FormatParser for RonFormatParser {
    fn parse(&self, content: &str) -> Result<RepositoryDescriptor, LoadError> {
        ron::from_str(content).map_err(|e| LoadError::ParseError {
            format: self.format_name(),
            message: e.to_string(),
        })
    }

    fn format_name(&self) -> &'static str {
        "Rusty Object Notation (RON)"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ron"]
    }
}
