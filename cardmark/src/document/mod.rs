use std::fmt;
use std::ops::Range;

/// A parsed cardmark document: an optional prelude followed by the
/// sections (cards) in source order.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    /// Content before the first heading. Never shown as a card.
    pub prelude: Vec<ContentNode>,
    pub sections: Vec<Section>,
}

impl Document {
    pub fn is_empty(&self) -> bool {
        self.prelude.is_empty() && self.sections.is_empty()
    }
}

/// One addressable card, introduced by a heading.
#[derive(Debug, Clone, PartialEq)]
pub struct Section {
    /// Heading depth, 1 for `#`. Only affects display weight.
    pub level: u8,
    pub label: Label,
    pub content: Vec<ContentNode>,
    /// Byte span in source, heading included.
    pub span: Range<usize>,
}

/// How a section is addressed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Label {
    /// Heading line as written, without its `#` marks, trimmed.
    Named(String),
    /// A heading without text, identified by its 1-based source line.
    Anonymous(usize),
}

impl Label {
    /// Title shown for the section. Anonymous labels read as `line N`;
    /// that string is not a lookup key.
    pub fn display_title(&self) -> String {
        match self {
            Label::Named(name) => name.clone(),
            Label::Anonymous(line) => format!("line {}", line),
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_title())
    }
}

/// 1-based line/column of a node in the source, plus its byte span for
/// codespan-reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
    pub span: Range<usize>,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Block-level content of a section.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentNode {
    Paragraph(Vec<InlineNode>),
    /// Literal text, whitespace preserved.
    Preformatted(String),
    ListItem(Vec<ContentNode>),
    /// A directive with an optional attached body.
    Command(Command, Option<Divert>),
    ParseError(SourceLocation, String),
}

/// How a command's body attaches to it.
#[derive(Debug, Clone, PartialEq)]
pub enum Divert {
    /// Indented block (a block quote under the command line).
    Nested(Vec<ContentNode>),
    /// Inline block on the command line itself (`! name: text`).
    Immediate(Vec<ContentNode>),
    /// Plain reference string (`! name -> target`).
    Reference(String),
}

/// Inline content inside a paragraph or annotation label.
#[derive(Debug, Clone, PartialEq)]
pub enum InlineNode {
    Text(String),
    /// A run of text delimited by a mark character: `*` bold, `_` italic,
    /// `~` strike, `` ` `` code.
    Verbatim(char, String),
    /// A link-like construct: visible label runs plus an optional target and
    /// an optional attached command describing its behavior.
    Annotation {
        label: Vec<InlineNode>,
        target: Option<String>,
        command: Option<Command>,
    },
    InlineError(SourceLocation, String),
}

/// A named directive with positional configuration values.
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
    pub name: Option<String>,
    pub config: Vec<ConfigValue>,
}

impl Command {
    pub fn named(name: impl Into<String>, config: Vec<ConfigValue>) -> Self {
        Command {
            name: Some(name.into()),
            config,
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    Variable(String),
    StringLiteral(String),
    IntLiteral(i64),
    Markup(Vec<InlineNode>),
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "!")?;
        if let Some(name) = &self.name {
            write!(f, " {}", name)?;
        }
        for value in &self.config {
            write!(f, " {}", value)?;
        }
        Ok(())
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Variable(name) => write!(f, "{}", name),
            ConfigValue::StringLiteral(s) => write!(f, "{:?}", s),
            ConfigValue::IntLiteral(n) => write!(f, "{}", n),
            ConfigValue::Markup(runs) => {
                write!(f, "[")?;
                for run in runs {
                    write!(f, "{}", run)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl fmt::Display for InlineNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InlineNode::Text(s) => write!(f, "{}", s),
            InlineNode::Verbatim(mark, text) => write!(f, "{}{}{}", mark, text, mark),
            InlineNode::Annotation {
                label,
                target,
                command,
            } => {
                write!(f, "[")?;
                for run in label {
                    write!(f, "{}", run)?;
                }
                write!(f, "]")?;
                match (target, command) {
                    (Some(target), _) => write!(f, "(#{})", target),
                    (None, Some(command)) => {
                        let rendered = command.to_string();
                        write!(f, "({})", rendered.trim_start_matches("! "))
                    }
                    (None, None) => Ok(()),
                }
            }
            InlineNode::InlineError(location, message) => {
                write!(f, "<error at {}: {}>", location, message)
            }
        }
    }
}
