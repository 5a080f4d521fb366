pub mod command;
mod structural;

use pulldown_cmark::Options;
use serde::Deserialize;

use crate::document::Document;

/// Knobs for the parser adapter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ParseOptions {
    /// Curly quotes, dashes and ellipses in running text. Command lines are
    /// always read raw.
    pub smart_punctuation: bool,
}

impl ParseOptions {
    fn cmark_options(&self) -> Options {
        let mut options = Options::ENABLE_STRIKETHROUGH;
        if self.smart_punctuation {
            options |= Options::ENABLE_SMART_PUNCTUATION;
        }
        options
    }
}

/// Parser entry point.
pub struct Parser {
    source: String,
    options: ParseOptions,
}

impl Parser {
    pub fn new(source: String, options: ParseOptions) -> Self {
        Parser { source, options }
    }

    /// Parse the source into a Document. Never fails: malformed fragments
    /// are embedded as `ParseError` / `InlineError` nodes.
    pub fn parse(&self) -> Document {
        structural::parse_document(&self.source, self.options.cmark_options())
    }
}

/// Parse `text` with `options`.
pub fn parse(options: &ParseOptions, text: &str) -> Document {
    structural::parse_document(text, options.cmark_options())
}
