//! Read-only helpers over a parsed Document.
//!
//! Every function here is total: absence is an `Option` or the [`NO_ARG`]
//! sentinel, never a panic.

use codespan_reporting::diagnostic::{Diagnostic, Label as SpanLabel};

use crate::document::{
    Command, ConfigValue, ContentNode, Divert, Document, InlineNode, Label, Section,
    SourceLocation,
};

/// Returned by [`command_arg_at`] for a missing argument. Callers treat it
/// as "absent", not as content.
pub const NO_ARG: &str = "noArg";

/// Index of the first section labelled `Named(label)`, in document order.
pub fn find_section_position(label: &str, sections: &[Section]) -> Option<usize> {
    sections
        .iter()
        .position(|section| matches!(&section.label, Label::Named(name) if name == label))
}

/// First section labelled `Named(label)`. Anonymous labels never match.
pub fn find_section_by_label<'d>(label: &str, sections: &'d [Section]) -> Option<&'d Section> {
    find_section_position(label, sections).map(|index| &sections[index])
}

pub fn extract_label_text(label: &Label) -> String {
    match label {
        Label::Named(name) => name.clone(),
        Label::Anonymous(line) => line.to_string(),
    }
}

/// The literal text of a `Text` run; `None` for every other inline.
pub fn get_raw_text(inline: &InlineNode) -> Option<&str> {
    match inline {
        InlineNode::Text(text) => Some(text),
        _ => None,
    }
}

/// Best-effort stringification, one string per run.
pub fn flatten_text_content(runs: &[InlineNode]) -> Vec<String> {
    runs.iter().map(stringify_inline).collect()
}

fn stringify_inline(run: &InlineNode) -> String {
    match run {
        InlineNode::Text(text) => text.clone(),
        InlineNode::Verbatim(_, text) => text.clone(),
        InlineNode::Annotation { label, .. } => flatten_text_content(label).join(" "),
        InlineNode::InlineError(location, message) => describe_error(location, message),
    }
}

/// `error at line L, column C: message`
pub fn describe_error(location: &SourceLocation, message: &str) -> String {
    format!(
        "error at line {}, column {}: {}",
        location.line, location.column, message
    )
}

/// Positional arguments as strings. A `Markup` value contributes one string
/// per inline run, spliced in place.
pub fn extract_config_args(config: &[ConfigValue]) -> Vec<String> {
    let mut args = Vec::with_capacity(config.len());
    for value in config {
        match value {
            ConfigValue::Variable(s) | ConfigValue::StringLiteral(s) => args.push(s.clone()),
            ConfigValue::IntLiteral(n) => args.push(n.to_string()),
            ConfigValue::Markup(runs) => args.extend(flatten_text_content(runs)),
        }
    }
    args
}

pub fn command_arg_at(args: &[String], k: usize) -> &str {
    args.get(k).map(String::as_str).unwrap_or(NO_ARG)
}

/// Targets of every `link` annotation in a section, in order.
pub fn section_links(section: &Section) -> Vec<String> {
    let mut links = Vec::new();
    for node in &section.content {
        collect_links(node, &mut links);
    }
    links
}

fn collect_links(node: &ContentNode, out: &mut Vec<String>) {
    match node {
        ContentNode::Paragraph(runs) => collect_inline_links(runs, out),
        ContentNode::ListItem(children) => {
            children.iter().for_each(|child| collect_links(child, out))
        }
        ContentNode::Command(_, Some(Divert::Nested(children) | Divert::Immediate(children))) => {
            children.iter().for_each(|child| collect_links(child, out))
        }
        ContentNode::Command(..) | ContentNode::Preformatted(_) | ContentNode::ParseError(..) => {}
    }
}

fn collect_inline_links(runs: &[InlineNode], out: &mut Vec<String>) {
    for run in runs {
        if let InlineNode::Annotation {
            command: Some(command),
            ..
        } = run
        {
            if command.name() == Some("link") {
                let args = extract_config_args(&command.config);
                out.push(command_arg_at(&args, 0).to_string());
            }
        }
    }
}

/// A `ParseError` or `InlineError` found somewhere in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct FragmentError<'d> {
    pub location: &'d SourceLocation,
    pub message: &'d str,
    /// True for `InlineError`, false for block-level `ParseError`.
    pub inline: bool,
}

impl FragmentError<'_> {
    /// Convert to a codespan-reporting Diagnostic for display.
    pub fn to_diagnostic(&self, file_id: usize) -> Diagnostic<usize> {
        let diagnostic = if self.inline {
            Diagnostic::warning()
        } else {
            Diagnostic::error()
        };
        diagnostic
            .with_message(self.message)
            .with_labels(vec![SpanLabel::primary(
                file_id,
                self.location.span.clone(),
            )])
    }
}

/// Every parse fragment error in the document (prelude first, then each
/// section), in source order.
pub fn collect_diagnostics(document: &Document) -> Vec<FragmentError<'_>> {
    let mut found = Vec::new();
    for node in &document.prelude {
        node_diagnostics(node, &mut found);
    }
    for section in &document.sections {
        for node in &section.content {
            node_diagnostics(node, &mut found);
        }
    }
    found
}

fn node_diagnostics<'d>(node: &'d ContentNode, out: &mut Vec<FragmentError<'d>>) {
    match node {
        ContentNode::Paragraph(runs) => inline_diagnostics(runs, out),
        ContentNode::Preformatted(_) => {}
        ContentNode::ListItem(children) => {
            children.iter().for_each(|child| node_diagnostics(child, out))
        }
        ContentNode::Command(command, divert) => {
            command_diagnostics(command, out);
            if let Some(Divert::Nested(children) | Divert::Immediate(children)) = divert {
                children.iter().for_each(|child| node_diagnostics(child, out));
            }
        }
        ContentNode::ParseError(location, message) => out.push(FragmentError {
            location,
            message: message.as_str(),
            inline: false,
        }),
    }
}

fn command_diagnostics<'d>(command: &'d Command, out: &mut Vec<FragmentError<'d>>) {
    for value in &command.config {
        if let ConfigValue::Markup(runs) = value {
            inline_diagnostics(runs, out);
        }
    }
}

fn inline_diagnostics<'d>(runs: &'d [InlineNode], out: &mut Vec<FragmentError<'d>>) {
    for run in runs {
        match run {
            InlineNode::Text(_) | InlineNode::Verbatim(..) => {}
            InlineNode::Annotation { label, command, .. } => {
                inline_diagnostics(label, out);
                if let Some(command) = command {
                    command_diagnostics(command, out);
                }
            }
            InlineNode::InlineError(location, message) => out.push(FragmentError {
                location,
                message: message.as_str(),
                inline: true,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::parser::{ParseOptions, parse};

    fn section(label: Label) -> Section {
        Section {
            level: 1,
            label,
            content: Vec::new(),
            span: 0..0,
        }
    }

    fn at(line: usize, column: usize) -> SourceLocation {
        SourceLocation {
            line,
            column,
            span: 0..1,
        }
    }

    #[test]
    fn lookup_returns_first_named_match() {
        let mut first = section(Label::Named("a".into()));
        first.level = 2;
        let sections = vec![
            section(Label::Anonymous(3)),
            first,
            section(Label::Named("a".into())),
        ];
        let found = find_section_by_label("a", &sections).unwrap();
        assert_eq!(found.level, 2);
        assert_eq!(find_section_position("a", &sections), Some(1));
    }

    #[test]
    fn lookup_is_exact() {
        let sections = vec![section(Label::Named("France".into()))];
        assert!(find_section_by_label("france", &sections).is_none());
        assert!(find_section_by_label("France ", &sections).is_none());
        assert!(find_section_by_label("France", &[]).is_none());
    }

    #[test]
    fn anonymous_labels_are_not_string_addressable() {
        let sections = vec![section(Label::Anonymous(42))];
        assert!(find_section_by_label("42", &sections).is_none());
        assert_eq!(extract_label_text(&sections[0].label), "42");
    }

    #[test]
    fn raw_text_only_for_text_runs() {
        assert_eq!(get_raw_text(&InlineNode::Text("a".into())), Some("a"));
        assert_eq!(get_raw_text(&InlineNode::Verbatim('*', "a".into())), None);
    }

    #[test]
    fn flatten_keeps_one_string_per_run() {
        let runs = vec![
            InlineNode::Text("plain".into()),
            InlineNode::Verbatim('`', "code".into()),
            InlineNode::Annotation {
                label: vec![
                    InlineNode::Text("go".into()),
                    InlineNode::Verbatim('*', "now".into()),
                ],
                target: None,
                command: None,
            },
            InlineNode::InlineError(at(4, 2), "bad".into()),
        ];
        assert_eq!(
            flatten_text_content(&runs),
            vec![
                "plain".to_string(),
                "code".to_string(),
                "go now".to_string(),
                "error at line 4, column 2: bad".to_string(),
            ]
        );
    }

    #[test]
    fn config_args_splice_markup() {
        let config = vec![
            ConfigValue::Variable("x".into()),
            ConfigValue::Markup(vec![]),
            ConfigValue::IntLiteral(-7),
            ConfigValue::Markup(vec![
                InlineNode::Text("a".into()),
                InlineNode::Verbatim('_', "b".into()),
            ]),
            ConfigValue::StringLiteral("s".into()),
        ];
        assert_eq!(
            extract_config_args(&config),
            vec!["x", "-7", "a", "b", "s"]
        );
        assert!(extract_config_args(&[]).is_empty());
    }

    #[test]
    fn missing_argument_is_sentinel() {
        assert_eq!(command_arg_at(&[], 0), NO_ARG);
        assert_eq!(command_arg_at(&[], 9), "noArg");
        let args = vec!["first".to_string()];
        assert_eq!(command_arg_at(&args, 0), "first");
        assert_eq!(command_arg_at(&args, 1), NO_ARG);
    }

    #[test]
    fn section_links_walks_nested_content() {
        let document = parse(
            &ParseOptions::default(),
            "# Hub\n[a](link \"A\") and [b](#B)\n\n- [c](link \"C\")\n",
        );
        assert_eq!(section_links(&document.sections[0]), vec!["A", "C"]);
    }

    #[test]
    fn diagnostics_are_found_everywhere() {
        let document = parse(
            &ParseOptions::default(),
            "<p>prelude</p>\n\n# S\n! image \"x\n\n- see ![i](i.png)\n",
        );
        let found = collect_diagnostics(&document);
        assert_eq!(found.len(), 3);
        assert!(!found[0].inline);
        assert_eq!(found[1].location.line, 4);
        assert!(found[2].inline);
        assert_eq!(found[2].location.line, 6);
    }
}
