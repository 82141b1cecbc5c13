use crate::{LoadError, RepositoryDescriptor};

/// Interface of a format-specific repository parser.
///
/// Parsers only deserialize; validation and expansion happen when the
/// descriptor is compiled into a [`crate::Catalog`].
pub trait FormatParser {
    /// Parses file content into a repository descriptor.
    fn parse(&self, content: &str) -> Result<RepositoryDescriptor, LoadError>;

    /// Human-readable format name, used in errors and logs.
    fn format_name(&self) -> &'static str;

    /// File extensions handled by this parser, lowercase, without the dot.
    fn extensions(&self) -> &'static [&'static str];
}
