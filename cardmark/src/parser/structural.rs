use std::ops::Range;

use codespan_reporting::files::{Files, SimpleFile};
use pulldown_cmark::{Event, HeadingLevel, Options, Parser as CmarkParser, Tag, TagEnd};

use crate::document::{
    Command, ConfigValue, ContentNode, Divert, Document, InlineNode, Label, Section,
    SourceLocation,
};
use crate::parser::command::{RawArg, Tail, lex_command_line};

type Spanned<'e> = (Event<'e>, Range<usize>);

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Fold the pulldown-cmark event stream of `source` into a Document.
pub fn parse_document(source: &str, options: Options) -> Document {
    let events: Vec<Spanned<'_>> = CmarkParser::new_ext(source, options)
        .into_offset_iter()
        .collect();

    let state = ParseState::new(source, options);
    state.fold(&events)
}

// ---------------------------------------------------------------------------
// Parse state
// ---------------------------------------------------------------------------

struct ParseState<'a> {
    source: &'a str,
    options: Options,
    /// Line index used to turn byte offsets into line/column locations.
    file: SimpleFile<&'a str, &'a str>,
}

struct SectionBuilder {
    level: u8,
    label: Label,
    content: Vec<ContentNode>,
    span_start: usize,
}

impl SectionBuilder {
    fn into_section(self, span_end: usize) -> Section {
        Section {
            level: self.level,
            label: self.label,
            content: self.content,
            span: self.span_start..span_end,
        }
    }
}

impl<'a> ParseState<'a> {
    fn new(source: &'a str, options: Options) -> Self {
        ParseState {
            source,
            options,
            file: SimpleFile::new("", source),
        }
    }

    fn fold(&self, events: &[Spanned<'_>]) -> Document {
        let mut prelude = Vec::new();
        let mut sections = Vec::new();
        let mut current: Option<SectionBuilder> = None;
        let mut i = 0;

        while i < events.len() {
            let (ref ev, ref range) = events[i];

            // Setext headings fall through to `parse_block` as paragraphs.
            let section_level = match ev {
                Event::Start(Tag::Heading { level, .. }) if self.is_atx(range) => Some(level),
                _ => None,
            };
            if let Some(level) = section_level {
                let start = range.start;
                i += 1;
                collect_plain_text(events, &mut i, |e| matches!(e, TagEnd::Heading(_)));

                if let Some(done) = current.take() {
                    sections.push(done.into_section(start));
                }
                current = Some(SectionBuilder {
                    level: heading_level_to_u8(level),
                    label: self.label_for(start),
                    content: Vec::new(),
                    span_start: start,
                });
                continue;
            }

            let target = match current.as_mut() {
                Some(builder) => &mut builder.content,
                None => &mut prelude,
            };
            self.parse_block(events, &mut i, target);
        }

        if let Some(done) = current {
            sections.push(done.into_section(self.source.len()));
        }

        Document { prelude, sections }
    }

    /// Parse the block starting at `events[*i]`, appending its nodes to `out`.
    /// Always advances `i`.
    fn parse_block(&self, events: &[Spanned<'_>], i: &mut usize, out: &mut Vec<ContentNode>) {
        let (ref ev, ref range) = events[*i];

        match ev {
            Event::Start(Tag::Paragraph) => {
                *i += 1;
                self.fold_block_text(events, i, |e| matches!(e, TagEnd::Paragraph), out);
            }

            Event::Start(Tag::Heading { .. }) if !self.is_atx(range) => {
                *i += 1;
                self.fold_block_text(events, i, |e| matches!(e, TagEnd::Heading(_)), out);
            }

            // Tight list items carry their inline content without a paragraph.
            ev if is_inline_event(ev) => {
                let start = *i;
                while *i < events.len() && is_inline_event(&events[*i].0) {
                    *i += 1;
                }
                out.extend(self.fold_paragraph(&events[start..*i]));
                self.attach_nested(events, i, out);
            }

            Event::Start(Tag::Heading { .. }) => {
                let location = self.locate(range.clone());
                *i += 1;
                collect_plain_text(events, i, |e| matches!(e, TagEnd::Heading(_)));
                out.push(ContentNode::ParseError(
                    location,
                    "headings are only allowed at the top level".into(),
                ));
            }

            // A bare block quote is the body of an anonymous command.
            Event::Start(Tag::BlockQuote(_)) => {
                *i += 1;
                let children =
                    self.parse_blocks_until(events, i, &|e| matches!(e, TagEnd::BlockQuote(_)));
                out.push(ContentNode::Command(
                    Command {
                        name: None,
                        config: Vec::new(),
                    },
                    Some(Divert::Nested(children)),
                ));
            }

            Event::Start(Tag::CodeBlock(_)) => {
                *i += 1;
                let text = collect_plain_text(events, i, |e| matches!(e, TagEnd::CodeBlock));
                out.push(ContentNode::Preformatted(text));
            }

            // Lists become `list` / `numbered` commands so item markers follow
            // the enclosing command name.
            Event::Start(Tag::List(first_number)) => {
                let name = if first_number.is_some() {
                    "numbered"
                } else {
                    "list"
                };
                *i += 1;
                let items = self.collect_list_items(events, i);
                out.push(ContentNode::Command(
                    Command::named(name, Vec::new()),
                    Some(Divert::Nested(items)),
                ));
            }

            Event::Start(Tag::HtmlBlock) => {
                let location = self.locate(range.clone());
                *i += 1;
                collect_plain_text(events, i, |e| matches!(e, TagEnd::HtmlBlock));
                out.push(ContentNode::ParseError(
                    location,
                    "raw HTML blocks are not supported".into(),
                ));
            }

            Event::Html(_) => {
                out.push(ContentNode::ParseError(
                    self.locate(range.clone()),
                    "raw HTML blocks are not supported".into(),
                ));
                *i += 1;
            }

            _ => {
                *i += 1;
            }
        }
    }

    fn parse_blocks_until(
        &self,
        events: &[Spanned<'_>],
        i: &mut usize,
        is_end: &dyn Fn(&TagEnd) -> bool,
    ) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        while *i < events.len() {
            if let Event::End(tag_end) = &events[*i].0 {
                if is_end(tag_end) {
                    *i += 1;
                    break;
                }
            }
            self.parse_block(events, i, &mut nodes);
        }
        nodes
    }

    fn collect_list_items(&self, events: &[Spanned<'_>], i: &mut usize) -> Vec<ContentNode> {
        let mut items = Vec::new();
        while *i < events.len() {
            match &events[*i].0 {
                Event::End(TagEnd::List(_)) => {
                    *i += 1;
                    break;
                }
                Event::Start(Tag::Item) => {
                    *i += 1;
                    let children =
                        self.parse_blocks_until(events, i, &|e| matches!(e, TagEnd::Item));
                    items.push(ContentNode::ListItem(children));
                }
                _ => {
                    *i += 1;
                }
            }
        }
        items
    }

    /// Fold the inline events of a paragraph-like block up to its End tag,
    /// then give a trailing command the block quote that follows.
    fn fold_block_text(
        &self,
        events: &[Spanned<'_>],
        i: &mut usize,
        is_end: impl Fn(&TagEnd) -> bool,
        out: &mut Vec<ContentNode>,
    ) {
        let start = *i;
        while *i < events.len() && !matches!(&events[*i].0, Event::End(e) if is_end(e)) {
            *i += 1;
        }
        let inline = &events[start..*i];
        *i += 1;
        out.extend(self.fold_paragraph(inline));
        self.attach_nested(events, i, out);
    }

    /// Every line starting with `!` is a command; each run of other lines
    /// between them is an ordinary paragraph.
    fn fold_paragraph(&self, inline: &[Spanned<'_>]) -> Vec<ContentNode> {
        let mut nodes = Vec::new();
        let mut text_from = None;
        for (index, offset, line) in self.raw_lines(inline) {
            if is_command_line(line) {
                if let Some(from) = text_from.take() {
                    nodes.push(self.paragraph(&inline[from..index]));
                }
                nodes.push(self.command_line(line, offset));
            } else if text_from.is_none() {
                text_from = Some(index);
            }
        }
        if let Some(from) = text_from {
            nodes.push(self.paragraph(&inline[from..]));
        }
        nodes
    }

    fn paragraph(&self, inline: &[Spanned<'_>]) -> ContentNode {
        let mut i = 0;
        ContentNode::Paragraph(self.collect_inlines(inline, &mut i, &|_| false, 0))
    }

    /// Give the last command in `out` the block quote that follows it, if
    /// it has no body yet.
    fn attach_nested(&self, events: &[Spanned<'_>], i: &mut usize, out: &mut Vec<ContentNode>) {
        if !matches!(out.last(), Some(ContentNode::Command(_, None))) {
            return;
        }
        if let Some((Event::Start(Tag::BlockQuote(_)), _)) = events.get(*i) {
            *i += 1;
            let children =
                self.parse_blocks_until(events, i, &|e| matches!(e, TagEnd::BlockQuote(_)));
            if let Some(ContentNode::Command(_, divert)) = out.last_mut() {
                *divert = Some(Divert::Nested(children));
            }
        }
    }

    /// Raw source lines of a paragraph as (first event index, byte offset,
    /// text). Text is read from the source rather than the events so
    /// block-quote prefixes and smart punctuation never leak in.
    fn raw_lines(&self, inline: &[Spanned<'_>]) -> Vec<(usize, usize, &'a str)> {
        let mut starts = Vec::new();
        let mut line_start = true;
        for (index, (ev, range)) in inline.iter().enumerate() {
            match ev {
                Event::SoftBreak | Event::HardBreak => line_start = true,
                _ if line_start => {
                    starts.push((index, range.start));
                    line_start = false;
                }
                _ => {}
            }
        }

        starts
            .into_iter()
            .filter(|&(_, start)| start <= self.source.len())
            .map(|(index, start)| {
                let rest = &self.source[start..];
                let end = rest.find('\n').unwrap_or(rest.len());
                (index, start, rest[..end].trim_end())
            })
            .collect()
    }

    fn command_line(&self, line: &str, offset: usize) -> ContentNode {
        match lex_command_line(line) {
            Ok(parsed) => {
                let config = parsed
                    .args
                    .into_iter()
                    .map(|arg| match arg {
                        RawArg::Word(word) => ConfigValue::Variable(word.to_string()),
                        RawArg::Str(s) => ConfigValue::StringLiteral(s),
                        RawArg::Int(n) => ConfigValue::IntLiteral(n),
                        RawArg::Markup { text, offset: rel } => {
                            ConfigValue::Markup(self.parse_inline_fragment(text, offset + rel))
                        }
                    })
                    .collect();
                let divert = parsed.tail.map(|tail| match tail {
                    Tail::Reference(target) => Divert::Reference(target.to_string()),
                    Tail::Immediate { text, offset: rel } => {
                        Divert::Immediate(vec![ContentNode::Paragraph(
                            self.parse_inline_fragment(text, offset + rel),
                        )])
                    }
                });
                ContentNode::Command(
                    Command {
                        name: parsed.name.map(str::to_string),
                        config,
                    },
                    divert,
                )
            }
            Err(err) => {
                let start = offset + err.offset;
                ContentNode::ParseError(self.locate(start..start + err.len), err.message)
            }
        }
    }

    /// Parse a slice of the source (markup argument, immediate text) as
    /// inline content. `base` is the slice's byte offset in the source.
    fn parse_inline_fragment(&self, text: &str, base: usize) -> Vec<InlineNode> {
        let events: Vec<Spanned<'_>> = CmarkParser::new_ext(text, self.options)
            .into_offset_iter()
            .collect();
        let mut i = 0;
        self.collect_inlines(&events, &mut i, &|_| false, base)
    }

    /// Collect inline nodes until a matching End tag. Adjacent text merges
    /// into one run; line breaks end a run.
    fn collect_inlines(
        &self,
        events: &[Spanned<'_>],
        i: &mut usize,
        is_end: &dyn Fn(&TagEnd) -> bool,
        base: usize,
    ) -> Vec<InlineNode> {
        let mut runs = Vec::new();
        let mut text = String::new();

        while *i < events.len() {
            let (ref ev, ref range) = events[*i];
            let span = range.start + base..range.end + base;
            match ev {
                Event::End(tag_end) if is_end(tag_end) => {
                    *i += 1;
                    break;
                }
                Event::Text(s) => {
                    text.push_str(s);
                    *i += 1;
                }
                Event::SoftBreak | Event::HardBreak | Event::End(TagEnd::Paragraph) => {
                    flush_text(&mut text, &mut runs);
                    *i += 1;
                }
                Event::Code(s) => {
                    flush_text(&mut text, &mut runs);
                    runs.push(InlineNode::Verbatim('`', s.to_string()));
                    *i += 1;
                }
                Event::Start(tag @ (Tag::Strong | Tag::Emphasis | Tag::Strikethrough)) => {
                    flush_text(&mut text, &mut runs);
                    let (mark, end) = match tag {
                        Tag::Strong => ('*', TagEnd::Strong),
                        Tag::Emphasis => ('_', TagEnd::Emphasis),
                        _ => ('~', TagEnd::Strikethrough),
                    };
                    *i += 1;
                    runs.extend(self.marked_span(events, i, mark, end, base));
                }
                Event::Start(Tag::Link {
                    dest_url, title, ..
                }) => {
                    flush_text(&mut text, &mut runs);
                    let dest = dest_url.to_string();
                    let title = title.to_string();
                    *i += 1;
                    let label =
                        self.collect_inlines(events, i, &|e| matches!(e, TagEnd::Link), base);
                    runs.push(self.annotation(label, dest, title, span));
                }
                Event::Start(Tag::Image { .. }) => {
                    flush_text(&mut text, &mut runs);
                    *i += 1;
                    collect_plain_text(events, i, |e| matches!(e, TagEnd::Image));
                    runs.push(InlineNode::InlineError(
                        self.locate(span),
                        "inline images are not supported, use `! image \"src\"`".into(),
                    ));
                }
                Event::InlineHtml(_) | Event::Html(_) => {
                    flush_text(&mut text, &mut runs);
                    runs.push(InlineNode::InlineError(
                        self.locate(span),
                        "raw HTML is not supported".into(),
                    ));
                    *i += 1;
                }
                _ => {
                    *i += 1;
                }
            }
        }

        flush_text(&mut text, &mut runs);
        runs
    }

    /// The runs of a strong, emphasis or strike span, `events[*i]` being its
    /// first inner event. Plain spans flatten to one `Verbatim`. Spans
    /// holding a link, image or inline HTML keep those nodes and mark only
    /// their text runs.
    fn marked_span(
        &self,
        events: &[Spanned<'_>],
        i: &mut usize,
        mark: char,
        end: TagEnd,
        base: usize,
    ) -> Vec<InlineNode> {
        if !has_structure(&events[*i..], end) {
            let inner = collect_plain_text(events, i, |e| *e == end);
            return vec![InlineNode::Verbatim(mark, inner)];
        }
        self.collect_inlines(events, i, &|e| *e == end, base)
            .into_iter()
            .map(|node| match node {
                InlineNode::Text(text) => InlineNode::Verbatim(mark, text),
                other => other,
            })
            .collect()
    }

    /// `[label](#target)` names a target; `[label](name "arg")` attaches
    /// the command `name` with the title as its argument.
    fn annotation(
        &self,
        label: Vec<InlineNode>,
        dest: String,
        title: String,
        span: Range<usize>,
    ) -> InlineNode {
        if let Some(target) = dest.strip_prefix('#') {
            return InlineNode::Annotation {
                label,
                target: Some(target.to_string()),
                command: None,
            };
        }
        if dest.is_empty() {
            return InlineNode::InlineError(self.locate(span), "annotation has no command".into());
        }
        let config = if title.is_empty() {
            Vec::new()
        } else {
            vec![ConfigValue::StringLiteral(title)]
        };
        InlineNode::Annotation {
            label,
            target: None,
            command: Some(Command::named(dest, config)),
        }
    }

    fn is_atx(&self, heading: &Range<usize>) -> bool {
        self.source
            .get(heading.start..)
            .is_some_and(|rest| rest.trim_start_matches(' ').starts_with('#'))
    }

    /// The label is the heading line as written, minus its `#` marks, so
    /// inline markup in a heading stays part of the name.
    fn label_for(&self, heading_start: usize) -> Label {
        let line = self.source[heading_start..].lines().next().unwrap_or("");
        let name = line.trim_start().trim_start_matches('#').trim();
        if name.is_empty() {
            Label::Anonymous(self.locate(heading_start..heading_start).line)
        } else {
            Label::Named(name.to_string())
        }
    }

    fn locate(&self, span: Range<usize>) -> SourceLocation {
        let (line, column) = match self.file.location((), span.start) {
            Ok(location) => (location.line_number, location.column_number),
            Err(_) => (1, 1),
        };
        SourceLocation { line, column, span }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn heading_level_to_u8(level: &HeadingLevel) -> u8 {
    match level {
        HeadingLevel::H1 => 1,
        HeadingLevel::H2 => 2,
        HeadingLevel::H3 => 3,
        HeadingLevel::H4 => 4,
        HeadingLevel::H5 => 5,
        HeadingLevel::H6 => 6,
    }
}

fn is_command_line(line: &str) -> bool {
    line.starts_with('!') && !line.starts_with("![")
}

fn is_inline_event(ev: &Event<'_>) -> bool {
    match ev {
        Event::Text(_)
        | Event::Code(_)
        | Event::SoftBreak
        | Event::HardBreak
        | Event::InlineHtml(_)
        | Event::FootnoteReference(_) => true,
        Event::Start(tag) => matches!(
            tag,
            Tag::Emphasis | Tag::Strong | Tag::Strikethrough | Tag::Link { .. } | Tag::Image { .. }
        ),
        Event::End(tag_end) => matches!(
            tag_end,
            TagEnd::Emphasis | TagEnd::Strong | TagEnd::Strikethrough | TagEnd::Link | TagEnd::Image
        ),
        _ => false,
    }
}

/// Whether the span closed by `end` contains a link, an image or inline HTML.
fn has_structure(events: &[Spanned<'_>], end: TagEnd) -> bool {
    let mut depth = 0usize;
    for (ev, _) in events {
        match ev {
            Event::End(tag_end) if depth == 0 && *tag_end == end => return false,
            Event::Start(Tag::Link { .. } | Tag::Image { .. }) | Event::InlineHtml(_) => {
                return true;
            }
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    false
}

fn flush_text(text: &mut String, runs: &mut Vec<InlineNode>) {
    if !text.is_empty() {
        runs.push(InlineNode::Text(std::mem::take(text)));
    }
}

/// Concatenate all text (including code spans) until the End tag matching
/// `is_end` at the current nesting depth. Line breaks become spaces.
fn collect_plain_text(
    events: &[Spanned<'_>],
    i: &mut usize,
    is_end: impl Fn(&TagEnd) -> bool,
) -> String {
    let mut text = String::new();
    let mut depth = 0usize;
    while *i < events.len() {
        let (ref ev, _) = events[*i];
        *i += 1;
        match ev {
            Event::End(tag_end) if depth == 0 && is_end(tag_end) => break,
            Event::Start(_) => depth += 1,
            Event::End(_) => depth = depth.saturating_sub(1),
            Event::Text(s) | Event::Code(s) | Event::Html(s) | Event::InlineHtml(s) => {
                text.push_str(s)
            }
            Event::SoftBreak | Event::HardBreak => text.push(' '),
            _ => {}
        }
    }
    text
}
