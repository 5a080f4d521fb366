use std::fmt;

use crate::controller::Event;
use crate::projector::FormatConfig;
use crate::style::{HeadingTier, StyleFlags};

/// Shown in place of a card when navigation found no section.
pub const NO_SECTION: &str = "No section to show";

/// Visible text of an annotation that has no label runs.
pub const LINK_PLACEHOLDER: &str = "link";

/// Display-agnostic projection of one card. Rebuilt on every render.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderModel {
    pub heading: Option<HeadingView>,
    /// Top-level content, laid out as a column.
    pub body: Vec<ViewNode>,
    pub layout: Layout,
}

/// Card-level sizes taken from the format configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Layout {
    pub line_width: u32,
    pub left_padding: u32,
    pub top_padding: u32,
    pub bottom_padding: u32,
}

impl From<&FormatConfig> for Layout {
    fn from(config: &FormatConfig) -> Self {
        Layout {
            line_width: config.line_width,
            left_padding: config.left_padding,
            top_padding: config.top_padding,
            bottom_padding: config.bottom_padding,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HeadingView {
    pub text: String,
    pub tier: HeadingTier,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ViewNode {
    /// Children stacked vertically.
    Column(Vec<ViewNode>),
    /// Children side by side.
    Row(Vec<ViewNode>),
    Indented {
        padding: u32,
        child: Box<ViewNode>,
    },
    /// Content on a highlighted background.
    Highlighted(Box<ViewNode>),
    /// Wrapped inline flow.
    Paragraph(Vec<InlineView>),
    Text(String),
    Image {
        src: String,
        height: u32,
    },
    /// Monospaced block, whitespace preserved.
    Preformatted {
        text: String,
        bottom_padding: u32,
    },
    /// Monospaced, whitespace-preserving lines.
    Code(Vec<String>),
    ListItem {
        marker: Option<ListMarker>,
        children: Vec<ViewNode>,
    },
    Diagnostic(String),
    Placeholder(String),
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListMarker {
    Bullet,
    /// 1-based position among siblings.
    Ordinal(usize),
}

impl fmt::Display for ListMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ListMarker::Bullet => write!(f, "•"),
            ListMarker::Ordinal(n) => write!(f, "{}.", n),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum InlineView {
    /// One whitespace-free token.
    Word { text: String, style: StyleFlags },
    Link(LinkView),
    Diagnostic(String),
    /// An annotation with no navigation behavior.
    Empty,
}

/// A clickable span. Its target is forwarded untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkView {
    pub label: String,
    pub target: String,
    pub style: StyleFlags,
}

impl LinkView {
    /// The event a view emits when the link is activated.
    pub fn activate(&self) -> Event {
        Event::Navigate(self.target.clone())
    }
}

impl RenderModel {
    pub fn placeholder(layout: Layout) -> Self {
        RenderModel {
            heading: None,
            body: vec![ViewNode::Placeholder(NO_SECTION.to_string())],
            layout,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.body.as_slice(), [ViewNode::Placeholder(_)]) && self.heading.is_none()
    }

    /// Every clickable primitive, in document order.
    pub fn links(&self) -> Vec<&LinkView> {
        let mut links = Vec::new();
        for node in &self.body {
            node.collect_links(&mut links);
        }
        links
    }

    /// Every diagnostic string, block and inline, in document order.
    pub fn diagnostics(&self) -> Vec<&str> {
        let mut found = Vec::new();
        for node in &self.body {
            node.collect_diagnostics(&mut found);
        }
        found
    }
}

impl ViewNode {
    fn children(&self) -> &[ViewNode] {
        match self {
            ViewNode::Column(children)
            | ViewNode::Row(children)
            | ViewNode::ListItem { children, .. } => children,
            ViewNode::Indented { child, .. } | ViewNode::Highlighted(child) => {
                std::slice::from_ref(&**child)
            }
            _ => &[],
        }
    }

    fn collect_links<'m>(&'m self, out: &mut Vec<&'m LinkView>) {
        if let ViewNode::Paragraph(inlines) = self {
            out.extend(inlines.iter().filter_map(|inline| match inline {
                InlineView::Link(link) => Some(link),
                _ => None,
            }));
        }
        for child in self.children() {
            child.collect_links(out);
        }
    }

    fn collect_diagnostics<'m>(&'m self, out: &mut Vec<&'m str>) {
        match self {
            ViewNode::Diagnostic(text) => out.push(text.as_str()),
            ViewNode::Paragraph(inlines) => {
                out.extend(inlines.iter().filter_map(|inline| match inline {
                    InlineView::Diagnostic(text) => Some(text.as_str()),
                    _ => None,
                }))
            }
            _ => {}
        }
        for child in self.children() {
            child.collect_diagnostics(out);
        }
    }
}
