pub mod document;
pub mod parser;
pub mod query;

pub use document::{
    Command, ConfigValue, ContentNode, Divert, Document, InlineNode, Label, Section,
    SourceLocation,
};
pub use parser::{ParseOptions, Parser, parse};
