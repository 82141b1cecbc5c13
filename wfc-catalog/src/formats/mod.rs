//! Parsers for the supported repository file formats.

pub mod parser;
pub use parser::FormatParser;

pub mod json_format;
pub mod ron_format;

pub use json_format::JsonFormatParser;
pub use ron_format::RonFormatParser;
