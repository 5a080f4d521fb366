//! Projection of one section's content tree into a [`RenderModel`].
//!
//! The walk threads an explicit [`Context`] down the tree: the container
//! kind of the nearest enclosing command, the node's index among its
//! siblings, and the inline style inherited so far. Nothing else flows
//! between calls, so projecting the same section twice yields equal models.

use cardmark::query::{command_arg_at, extract_config_args, flatten_text_content, get_raw_text};
use cardmark::{Command, ContentNode, Divert, InlineNode, Section};
use serde::Deserialize;

use crate::error::NavigationIssue;
use crate::style::{HeadingTier, StyleFlags};
use crate::view::{
    HeadingView, InlineView, LINK_PLACEHOLDER, Layout, LinkView, ListMarker, RenderModel,
    ViewNode,
};

/// Layout knobs, in pixels. They size leaves and margins only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FormatConfig {
    pub image_height: u32,
    pub line_width: u32,
    pub left_padding: u32,
    pub top_padding: u32,
    pub bottom_padding: u32,
}

impl Default for FormatConfig {
    fn default() -> Self {
        FormatConfig {
            image_height: 200,
            line_width: 600,
            left_padding: 20,
            top_padding: 10,
            bottom_padding: 10,
        }
    }
}

/// Layout behavior selected by the nearest enclosing command name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Column,
    Row,
    List,
    Numbered,
    Code,
}

impl ContainerKind {
    pub fn from_command(name: Option<&str>) -> Self {
        match name {
            Some("row") => ContainerKind::Row,
            Some("list") => ContainerKind::List,
            Some("numbered") => ContainerKind::Numbered,
            Some("code") => ContainerKind::Code,
            _ => ContainerKind::Column,
        }
    }

    fn arrange(self, children: Vec<ViewNode>) -> ViewNode {
        match self {
            ContainerKind::Row => ViewNode::Row(children),
            _ => ViewNode::Column(children),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    pub container: ContainerKind,
    pub sibling_index: usize,
    pub style: StyleFlags,
}

impl Context {
    pub fn root() -> Self {
        Context {
            container: ContainerKind::Column,
            sibling_index: 0,
            style: StyleFlags::default(),
        }
    }

    fn at(self, sibling_index: usize) -> Self {
        Context {
            sibling_index,
            ..self
        }
    }

    fn within(self, container: ContainerKind) -> Self {
        Context {
            container,
            sibling_index: 0,
            ..self
        }
    }
}

/// Project a section into a card.
pub fn project(config: &FormatConfig, section: &Section) -> RenderModel {
    let projector = Projector { config };
    RenderModel {
        heading: Some(HeadingView {
            text: section.label.display_title(),
            tier: HeadingTier::for_level(section.level),
        }),
        body: projector.project_children(&section.content, Context::root()),
        layout: Layout::from(config),
    }
}

/// Project the current section, or the "no section" placeholder.
pub fn project_current(config: &FormatConfig, section: Option<&Section>) -> RenderModel {
    match section {
        Some(section) => project(config, section),
        None => RenderModel::placeholder(Layout::from(config)),
    }
}

/// Project a single node in an explicit context.
pub fn project_node(config: &FormatConfig, node: &ContentNode, ctx: Context) -> ViewNode {
    Projector { config }.project_node(node, ctx)
}

struct Projector<'c> {
    config: &'c FormatConfig,
}

impl Projector<'_> {
    fn project_children(&self, nodes: &[ContentNode], ctx: Context) -> Vec<ViewNode> {
        nodes
            .iter()
            .enumerate()
            .map(|(index, node)| self.project_node(node, ctx.at(index)))
            .collect()
    }

    fn project_node(&self, node: &ContentNode, ctx: Context) -> ViewNode {
        match node {
            ContentNode::Paragraph(runs) => {
                ViewNode::Paragraph(self.project_inlines(runs, ctx.style))
            }

            ContentNode::Preformatted(text) => ViewNode::Preformatted {
                text: text.clone(),
                bottom_padding: if text.ends_with('\n') {
                    self.config.bottom_padding
                } else {
                    0
                },
            },

            ContentNode::ListItem(children) => ViewNode::ListItem {
                marker: list_marker(ctx),
                children: self.project_children(children, ctx),
            },

            ContentNode::Command(command, divert) => {
                self.project_command(command, divert.as_ref(), ctx)
            }

            ContentNode::ParseError(location, message) => {
                let issue = NavigationIssue::fragment(location, message);
                log::debug!("rendering {}", issue);
                ViewNode::Diagnostic(issue.to_string())
            }
        }
    }

    fn project_command(
        &self,
        command: &Command,
        divert: Option<&Divert>,
        ctx: Context,
    ) -> ViewNode {
        if command.name() == Some("image") {
            let args = extract_config_args(&command.config);
            if args.is_empty() {
                log::debug!(
                    "{}",
                    NavigationIssue::MissingArgument {
                        command: "image".into(),
                        index: 0
                    }
                );
            }
            return ViewNode::Image {
                src: command_arg_at(&args, 0).to_string(),
                height: self.config.image_height,
            };
        }

        let kind = ContainerKind::from_command(command.name());
        match divert {
            Some(Divert::Nested(children)) => match kind {
                ContainerKind::Row => {
                    ViewNode::Row(self.project_children(children, ctx.within(kind)))
                }
                ContainerKind::Code => ViewNode::Code(code_lines(children)),
                _ => ViewNode::Indented {
                    padding: self.config.left_padding,
                    child: Box::new(ViewNode::Column(
                        self.project_children(children, ctx.within(kind)),
                    )),
                },
            },
            Some(Divert::Immediate(children)) => ViewNode::Highlighted(Box::new(
                kind.arrange(self.project_children(children, ctx.within(kind))),
            )),
            Some(Divert::Reference(target)) => ViewNode::Text(target.clone()),
            None => ViewNode::Empty,
        }
    }

    fn project_inlines(&self, runs: &[InlineNode], style: StyleFlags) -> Vec<InlineView> {
        let mut out = Vec::new();
        for run in runs {
            match run {
                InlineNode::Text(text) => push_words(&mut out, text, style),
                InlineNode::Verbatim(mark, text) => {
                    push_words(&mut out, text, style.with_mark(*mark))
                }
                InlineNode::Annotation { label, command, .. } => {
                    out.push(self.project_annotation(label, command.as_ref(), style))
                }
                InlineNode::InlineError(location, message) => {
                    let issue = NavigationIssue::fragment(location, message);
                    log::debug!("rendering {}", issue);
                    out.push(InlineView::Diagnostic(issue.to_string()));
                }
            }
        }
        out
    }

    /// Only `link` annotations are navigable; any other command, or none,
    /// projects to an empty primitive.
    fn project_annotation(
        &self,
        label: &[InlineNode],
        command: Option<&Command>,
        style: StyleFlags,
    ) -> InlineView {
        let Some(command) = command.filter(|c| c.name() == Some("link")) else {
            return InlineView::Empty;
        };

        let args = extract_config_args(&command.config);
        if args.is_empty() {
            log::debug!(
                "{}",
                NavigationIssue::MissingArgument {
                    command: "link".into(),
                    index: 0
                }
            );
        }
        let label = flatten_text_content(label)
            .into_iter()
            .next()
            .unwrap_or_else(|| LINK_PLACEHOLDER.to_string());

        InlineView::Link(LinkView {
            label,
            target: command_arg_at(&args, 0).to_string(),
            style: style.underlined(),
        })
    }
}

fn list_marker(ctx: Context) -> Option<ListMarker> {
    match ctx.container {
        ContainerKind::List => Some(ListMarker::Bullet),
        ContainerKind::Numbered => Some(ListMarker::Ordinal(ctx.sibling_index + 1)),
        _ => None,
    }
}

/// Lines of a `code` body: the raw text of each `Text` run in its
/// paragraphs. Everything else is dropped.
fn code_lines(children: &[ContentNode]) -> Vec<String> {
    children
        .iter()
        .filter_map(|child| match child {
            ContentNode::Paragraph(runs) => Some(runs),
            _ => None,
        })
        .flat_map(|runs| runs.iter().filter_map(get_raw_text).map(str::to_string))
        .collect()
}

fn push_words(out: &mut Vec<InlineView>, text: &str, style: StyleFlags) {
    out.extend(text.split_whitespace().map(|word| InlineView::Word {
        text: word.to_string(),
        style,
    }));
}

#[cfg(test)]
mod tests {
    use cardmark::{ConfigValue, Label, SourceLocation};
    use pretty_assertions::assert_eq;

    use super::*;

    fn section(content: Vec<ContentNode>) -> Section {
        Section {
            level: 1,
            label: Label::Named("card".into()),
            content,
            span: 0..0,
        }
    }

    fn link(label: &str, target: &str) -> InlineNode {
        InlineNode::Annotation {
            label: vec![InlineNode::Text(label.into())],
            target: None,
            command: Some(Command::named(
                "link",
                vec![ConfigValue::StringLiteral(target.into())],
            )),
        }
    }

    fn word(text: &str) -> InlineView {
        InlineView::Word {
            text: text.into(),
            style: StyleFlags::default(),
        }
    }

    fn nested(name: &str, children: Vec<ContentNode>) -> ContentNode {
        ContentNode::Command(Command::named(name, vec![]), Some(Divert::Nested(children)))
    }

    fn config() -> FormatConfig {
        FormatConfig::default()
    }

    #[test]
    fn heading_uses_label_title_and_tier() {
        let mut card = section(vec![]);
        card.level = 5;
        let model = project(&config(), &card);
        let heading = model.heading.unwrap();
        assert_eq!(heading.text, "card");
        assert_eq!(heading.tier, HeadingTier::for_level(4));
    }

    #[test]
    fn single_link_yields_one_clickable_target() {
        let card = section(vec![ContentNode::Paragraph(vec![link("Go", "X")])]);
        let model = project(&config(), &card);
        let links = model.links();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].target, "X");
        assert_eq!(links[0].label, "Go");
        assert!(links[0].style.underline);
    }

    #[test]
    fn projection_is_idempotent() {
        let card = section(vec![
            ContentNode::Paragraph(vec![InlineNode::Text("a b".into()), link("Go", "X")]),
            nested("list", vec![ContentNode::ListItem(vec![])]),
        ]);
        assert_eq!(project(&config(), &card), project(&config(), &card));
    }

    #[test]
    fn text_splits_into_styled_words() {
        let card = section(vec![ContentNode::Paragraph(vec![
            InlineNode::Text("  two   words ".into()),
            InlineNode::Verbatim('*', "loud text".into()),
            InlineNode::Verbatim('?', "odd".into()),
            InlineNode::Text("plain".into()),
        ])]);
        let model = project(&config(), &card);
        let bold = StyleFlags {
            bold: true,
            ..StyleFlags::default()
        };
        assert_eq!(
            model.body,
            vec![ViewNode::Paragraph(vec![
                word("two"),
                word("words"),
                InlineView::Word {
                    text: "loud".into(),
                    style: bold
                },
                InlineView::Word {
                    text: "text".into(),
                    style: bold
                },
                word("odd"),
                word("plain"),
            ])]
        );
    }

    #[test]
    fn non_link_annotations_are_empty() {
        let card = section(vec![ContentNode::Paragraph(vec![
            InlineNode::Annotation {
                label: vec![InlineNode::Text("x".into())],
                target: None,
                command: Some(Command::named("go", vec![])),
            },
            InlineNode::Annotation {
                label: vec![InlineNode::Text("y".into())],
                target: Some("elsewhere".into()),
                command: None,
            },
        ])]);
        let model = project(&config(), &card);
        assert_eq!(
            model.body,
            vec![ViewNode::Paragraph(vec![InlineView::Empty, InlineView::Empty])]
        );
        assert!(model.links().is_empty());
    }

    #[test]
    fn link_label_falls_back_and_missing_target_is_sentinel() {
        let card = section(vec![ContentNode::Paragraph(vec![InlineNode::Annotation {
            label: vec![],
            target: None,
            command: Some(Command::named("link", vec![])),
        }])]);
        let model = project(&config(), &card);
        let links = model.links();
        assert_eq!(links[0].label, LINK_PLACEHOLDER);
        assert_eq!(links[0].target, "noArg");
    }

    #[test]
    fn image_uses_first_argument_and_configured_height() {
        let config = FormatConfig {
            image_height: 120,
            ..FormatConfig::default()
        };
        let card = section(vec![
            ContentNode::Command(
                Command::named("image", vec![ConfigValue::StringLiteral("cat.png".into())]),
                None,
            ),
            ContentNode::Command(Command::named("image", vec![]), None),
        ]);
        let model = project(&config, &card);
        assert_eq!(
            model.body,
            vec![
                ViewNode::Image {
                    src: "cat.png".into(),
                    height: 120
                },
                ViewNode::Image {
                    src: "noArg".into(),
                    height: 120
                },
            ]
        );
    }

    #[test]
    fn code_divert_keeps_only_text_runs() {
        let card = section(vec![nested(
            "code",
            vec![
                ContentNode::Paragraph(vec![
                    InlineNode::Text("a".into()),
                    InlineNode::Text("b".into()),
                    link("ignored", "X"),
                ]),
                ContentNode::Preformatted("dropped".into()),
            ],
        )]);
        let model = project(&config(), &card);
        assert_eq!(model.body, vec![ViewNode::Code(vec!["a".into(), "b".into()])]);
        assert!(model.links().is_empty());
    }

    #[test]
    fn row_lays_out_horizontally_without_indent() {
        let card = section(vec![nested(
            "row",
            vec![
                ContentNode::Paragraph(vec![InlineNode::Text("left".into())]),
                ContentNode::Paragraph(vec![InlineNode::Text("right".into())]),
            ],
        )]);
        let model = project(&config(), &card);
        assert_eq!(
            model.body,
            vec![ViewNode::Row(vec![
                ViewNode::Paragraph(vec![word("left")]),
                ViewNode::Paragraph(vec![word("right")]),
            ])]
        );
    }

    #[test]
    fn other_nested_commands_indent_by_left_padding() {
        let card = section(vec![nested(
            "aside",
            vec![ContentNode::Paragraph(vec![InlineNode::Text("hi".into())])],
        )]);
        let model = project(&config(), &card);
        assert_eq!(
            model.body,
            vec![ViewNode::Indented {
                padding: 20,
                child: Box::new(ViewNode::Column(vec![ViewNode::Paragraph(vec![word("hi")])])),
            }]
        );
    }

    #[test]
    fn immediate_is_highlighted_and_reference_is_text() {
        let card = section(vec![
            ContentNode::Command(
                Command::named("note", vec![]),
                Some(Divert::Immediate(vec![ContentNode::Paragraph(vec![
                    InlineNode::Text("hey".into()),
                ])])),
            ),
            ContentNode::Command(
                Command::named("see", vec![]),
                Some(Divert::Reference("The beginning".into())),
            ),
            ContentNode::Command(Command::named("go", vec![]), None),
        ]);
        let model = project(&config(), &card);
        assert_eq!(
            model.body,
            vec![
                ViewNode::Highlighted(Box::new(ViewNode::Column(vec![ViewNode::Paragraph(
                    vec![word("hey")]
                )]))),
                ViewNode::Text("The beginning".into()),
                ViewNode::Empty,
            ]
        );
        assert!(model.links().is_empty());
    }

    #[test]
    fn list_markers_follow_container() {
        let items = || vec![ContentNode::ListItem(vec![]), ContentNode::ListItem(vec![])];
        let card = section(vec![
            nested("list", items()),
            nested("numbered", items()),
            nested("aside", items()),
        ]);
        let model = project(&config(), &card);
        let markers: Vec<Vec<Option<ListMarker>>> = model
            .body
            .iter()
            .map(|node| match node {
                ViewNode::Indented { child, .. } => match child.as_ref() {
                    ViewNode::Column(items) => items
                        .iter()
                        .map(|item| match item {
                            ViewNode::ListItem { marker, .. } => *marker,
                            other => panic!("expected list item, got {:?}", other),
                        })
                        .collect(),
                    other => panic!("expected column, got {:?}", other),
                },
                other => panic!("expected indented block, got {:?}", other),
            })
            .collect();
        assert_eq!(
            markers,
            vec![
                vec![Some(ListMarker::Bullet), Some(ListMarker::Bullet)],
                vec![Some(ListMarker::Ordinal(1)), Some(ListMarker::Ordinal(2))],
                vec![None, None],
            ]
        );
    }

    #[test]
    fn bare_list_item_has_no_marker() {
        let node = project_node(&config(), &ContentNode::ListItem(vec![]), Context::root());
        assert_eq!(
            node,
            ViewNode::ListItem {
                marker: None,
                children: vec![]
            }
        );
    }

    #[test]
    fn preformatted_padding_only_after_trailing_newline() {
        let card = section(vec![
            ContentNode::Preformatted("a  b\n".into()),
            ContentNode::Preformatted("c".into()),
        ]);
        let model = project(&config(), &card);
        assert_eq!(
            model.body,
            vec![
                ViewNode::Preformatted {
                    text: "a  b\n".into(),
                    bottom_padding: 10
                },
                ViewNode::Preformatted {
                    text: "c".into(),
                    bottom_padding: 0
                },
            ]
        );
    }

    #[test]
    fn errors_surface_with_location() {
        let location = SourceLocation {
            line: 7,
            column: 3,
            span: 40..41,
        };
        let card = section(vec![
            ContentNode::ParseError(location.clone(), "bad block".into()),
            ContentNode::Paragraph(vec![InlineNode::InlineError(location, "bad inline".into())]),
        ]);
        let model = project(&config(), &card);
        assert_eq!(
            model.diagnostics(),
            vec![
                "parse error at line 7, column 3: bad block",
                "parse error at line 7, column 3: bad inline",
            ]
        );
    }

    #[test]
    fn missing_section_projects_placeholder() {
        let model = project_current(&config(), None);
        assert!(model.is_placeholder());
    }

    #[test]
    fn format_config_reads_partial_toml() {
        let config: FormatConfig = toml::from_str("image_height = 64\n").unwrap();
        assert_eq!(config.image_height, 64);
        assert_eq!(config.line_width, FormatConfig::default().line_width);
    }
}
