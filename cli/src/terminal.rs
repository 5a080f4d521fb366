//! Paints a [`RenderModel`] onto a color terminal.
//!
//! Pixel sizes from the layout are converted to cells at a fixed ratio.
//! Links are numbered in document order, the same order as
//! [`RenderModel::links`], so a number typed at the prompt maps straight
//! back to a link.

use std::io::{self, Write};

use codespan_reporting::term::termcolor::{Color, ColorSpec, WriteColor};
use navigator::style::StyleFlags;
use navigator::view::{InlineView, ListMarker, RenderModel, ViewNode};

pub const PIXELS_PER_CELL: u32 = 10;

pub fn cells(pixels: u32) -> usize {
    (pixels / PIXELS_PER_CELL) as usize
}

/// Write `model` to `out`, wrapping paragraphs at `width` columns.
pub fn paint<W: WriteColor>(out: &mut W, model: &RenderModel, width: usize) -> io::Result<()> {
    let mut painter = Painter {
        out,
        width: width.max(10),
        prefix: " ".repeat(cells(model.layout.left_padding)),
        column: 0,
        next_link: 1,
    };

    for _ in 0..cells(model.layout.top_padding) {
        writeln!(painter.out)?;
    }
    if let Some(heading) = &model.heading {
        let mut spec = ColorSpec::new();
        let color = heading.tier.color;
        spec.set_fg(Some(Color::Rgb(color.0, color.1, color.2)))
            .set_bold(heading.tier.bold)
            .set_italic(heading.tier.italic);
        painter.start_line()?;
        painter.styled(&spec, &heading.text)?;
        painter.end_line()?;
        writeln!(painter.out)?;
    }
    for node in &model.body {
        painter.block(node)?;
    }
    for _ in 0..cells(model.layout.bottom_padding) {
        writeln!(painter.out)?;
    }
    painter.out.flush()
}

struct Painter<'w, W> {
    out: &'w mut W,
    width: usize,
    prefix: String,
    /// Cells already used on the current line, prefix included. 0 until
    /// the prefix has been written.
    column: usize,
    next_link: usize,
}

impl<W: WriteColor> Painter<'_, W> {
    fn block(&mut self, node: &ViewNode) -> io::Result<()> {
        match node {
            ViewNode::Column(children) | ViewNode::Row(children) => {
                for child in children {
                    self.block(child)?;
                }
                Ok(())
            }
            ViewNode::Indented { padding, child } => {
                self.nested(&" ".repeat(cells(*padding)), |p| p.block(child))
            }
            ViewNode::Highlighted(child) => self.nested("┃ ", |p| p.block(child)),
            ViewNode::Paragraph(inlines) => self.paragraph(inlines),
            ViewNode::Text(text) => self.line(&ColorSpec::new(), text),
            ViewNode::Image { src, .. } => {
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Magenta));
                self.line(&spec, &format!("[image: {}]", src))
            }
            ViewNode::Preformatted {
                text,
                bottom_padding,
            } => {
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Green));
                for line in text.lines() {
                    self.line(&spec, line)?;
                }
                if *bottom_padding > 0 {
                    writeln!(self.out)?;
                }
                Ok(())
            }
            ViewNode::Code(lines) => {
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Green));
                self.nested("    ", |p| {
                    for line in lines {
                        p.line(&spec, line)?;
                    }
                    Ok(())
                })
            }
            ViewNode::ListItem { marker, children } => self.list_item(*marker, children),
            ViewNode::Diagnostic(text) => {
                let mut spec = ColorSpec::new();
                spec.set_fg(Some(Color::Red)).set_bold(true);
                self.line(&spec, text)
            }
            ViewNode::Placeholder(text) => {
                let mut spec = ColorSpec::new();
                spec.set_dimmed(true).set_italic(true);
                self.line(&spec, text)
            }
            ViewNode::Empty => Ok(()),
        }
    }

    fn list_item(&mut self, marker: Option<ListMarker>, children: &[ViewNode]) -> io::Result<()> {
        let lead = match marker {
            Some(marker) => format!("{} ", marker),
            None => "  ".to_string(),
        };
        self.start_line()?;
        write!(self.out, "{}", lead)?;
        self.column += lead.chars().count();
        let indent = " ".repeat(lead.chars().count());
        self.nested(&indent, |p| {
            for child in children {
                p.block(child)?;
            }
            Ok(())
        })?;
        if self.column > 0 {
            self.end_line()?;
        }
        Ok(())
    }

    fn paragraph(&mut self, inlines: &[InlineView]) -> io::Result<()> {
        self.start_line()?;
        let mut first = true;
        for inline in inlines {
            let (spec, text) = match inline {
                InlineView::Word { text, style } => (style_spec(*style), text.clone()),
                InlineView::Link(link) => {
                    let mut spec = style_spec(link.style);
                    spec.set_fg(Some(Color::Cyan));
                    let text = format!("{}[{}]", link.label, self.next_link);
                    self.next_link += 1;
                    (spec, text)
                }
                InlineView::Diagnostic(text) => {
                    let mut spec = ColorSpec::new();
                    spec.set_fg(Some(Color::Red));
                    (spec, text.clone())
                }
                InlineView::Empty => continue,
            };
            let len = text.chars().count();
            if !first && self.column + 1 + len > self.width {
                self.end_line()?;
                self.start_line()?;
            } else if !first {
                write!(self.out, " ")?;
                self.column += 1;
            }
            self.styled(&spec, &text)?;
            first = false;
        }
        self.end_line()
    }

    fn nested(
        &mut self,
        indent: &str,
        body: impl FnOnce(&mut Self) -> io::Result<()>,
    ) -> io::Result<()> {
        let saved = self.prefix.len();
        self.prefix.push_str(indent);
        let result = body(self);
        self.prefix.truncate(saved);
        result
    }

    fn line(&mut self, spec: &ColorSpec, text: &str) -> io::Result<()> {
        self.start_line()?;
        self.styled(spec, text)?;
        self.end_line()
    }

    fn start_line(&mut self) -> io::Result<()> {
        if self.column == 0 {
            write!(self.out, "{}", self.prefix)?;
            self.column = self.prefix.chars().count();
        }
        Ok(())
    }

    fn end_line(&mut self) -> io::Result<()> {
        writeln!(self.out)?;
        self.column = 0;
        Ok(())
    }

    fn styled(&mut self, spec: &ColorSpec, text: &str) -> io::Result<()> {
        self.out.set_color(spec)?;
        write!(self.out, "{}", text)?;
        self.out.reset()?;
        self.column += text.chars().count();
        Ok(())
    }
}

fn style_spec(style: StyleFlags) -> ColorSpec {
    let mut spec = ColorSpec::new();
    spec.set_bold(style.bold)
        .set_italic(style.italic)
        .set_strikethrough(style.strike)
        .set_underline(style.underline);
    if style.code {
        spec.set_fg(Some(Color::Green));
    }
    spec
}
