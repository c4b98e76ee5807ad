//! Markdown to styled terminal lines.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, TagEnd};
use unicode_width::UnicodeWidthStr;

const CODE_INDENT: &str = "    ";
const QUOTE_BORDER: &str = "│ ";
const RULE: &str = "────────────────────────";

/// Inline styling flags for one span.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SpanStyle {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub dim: bool,
    pub heading: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Span {
    pub text: String,
    pub style: SpanStyle,
}

/// One rendered terminal line; an empty span list is a blank line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Line {
    pub spans: Vec<Span>,
}

impl Line {
    pub fn plain(&self) -> String {
        self.spans.iter().map(|s| s.text.as_str()).collect()
    }

    /// Display width in terminal columns.
    pub fn width(&self) -> usize {
        self.spans.iter().map(|s| s.text.width()).sum()
    }

    /// Rows occupied when wrapped at `columns`.
    pub fn rows(&self, columns: usize) -> usize {
        let columns = columns.max(1);
        self.width().div_ceil(columns).max(1)
    }
}

/// Render markdown source into styled lines.
pub fn render_markdown(source: &str) -> Vec<Line> {
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TASKLISTS;
    let mut writer = LineWriter::default();
    for event in Parser::new_ext(source, options) {
        writer.handle(event);
    }
    writer.finish()
}

/// Plain-text form of [`render_markdown`], one string per line.
pub fn render_plain(source: &str) -> Vec<String> {
    render_markdown(source).iter().map(Line::plain).collect()
}

#[derive(Default)]
struct LineWriter {
    lines: Vec<Line>,
    current: Vec<Span>,
    bold: usize,
    italic: usize,
    strikethrough: usize,
    link: usize,
    heading: bool,
    code_block: bool,
    quote_depth: usize,
    lists: Vec<Option<u64>>,
}

impl LineWriter {
    fn style(&self) -> SpanStyle {
        SpanStyle {
            bold: self.bold > 0 || self.heading,
            italic: self.italic > 0,
            strikethrough: self.strikethrough > 0,
            underline: self.link > 0,
            heading: self.heading,
            ..SpanStyle::default()
        }
    }

    fn push(&mut self, text: impl Into<String>, style: SpanStyle) {
        let text = text.into();
        if text.is_empty() {
            return;
        }
        if self.current.is_empty() && self.quote_depth > 0 {
            let border = QUOTE_BORDER.repeat(self.quote_depth);
            self.current.push(Span {
                text: border,
                style: SpanStyle {
                    dim: true,
                    ..SpanStyle::default()
                },
            });
        }
        self.current.push(Span { text, style });
    }

    fn flush(&mut self) {
        if !self.current.is_empty() {
            let spans = std::mem::take(&mut self.current);
            self.lines.push(Line { spans });
        }
    }

    fn blank(&mut self) {
        self.flush();
        if self.lists.is_empty() && self.lines.last().is_some_and(|l| !l.spans.is_empty()) {
            self.lines.push(Line::default());
        }
    }

    fn handle(&mut self, event: Event<'_>) {
        match event {
            Event::Start(tag) => self.start(tag),
            Event::End(tag) => self.end(tag),
            Event::Text(text) if self.code_block => {
                let style = SpanStyle {
                    code: true,
                    dim: true,
                    ..SpanStyle::default()
                };
                for line in text.lines() {
                    self.push(CODE_INDENT, SpanStyle::default());
                    self.push(line, style);
                    self.flush();
                }
            }
            Event::Text(text) => {
                let style = self.style();
                self.push(text.into_string(), style);
            }
            Event::Code(code) => {
                let style = SpanStyle {
                    code: true,
                    ..self.style()
                };
                self.push(code.into_string(), style);
            }
            Event::SoftBreak => {
                let style = self.style();
                self.push(" ", style);
            }
            Event::HardBreak => self.flush(),
            Event::Rule => {
                self.flush();
                self.push(
                    RULE,
                    SpanStyle {
                        dim: true,
                        ..SpanStyle::default()
                    },
                );
                self.blank();
            }
            Event::TaskListMarker(checked) => {
                let marker = if checked { "[x] " } else { "[ ] " };
                self.push(marker, SpanStyle::default());
            }
            Event::Html(html) | Event::InlineHtml(html) => {
                self.push(html.trim_end_matches('\n').to_string(), SpanStyle::default());
            }
            _ => {}
        }
    }

    fn start(&mut self, tag: Tag<'_>) {
        match tag {
            Tag::Heading { .. } => {
                self.flush();
                self.heading = true;
            }
            Tag::BlockQuote { .. } => {
                self.flush();
                self.quote_depth += 1;
            }
            Tag::CodeBlock(kind) => {
                self.flush();
                self.code_block = true;
                if let CodeBlockKind::Fenced(lang) = kind {
                    if !lang.is_empty() {
                        self.push(
                            format!("{CODE_INDENT}{lang}"),
                            SpanStyle {
                                dim: true,
                                italic: true,
                                ..SpanStyle::default()
                            },
                        );
                        self.flush();
                    }
                }
            }
            Tag::List(start) => {
                self.flush();
                self.lists.push(start);
            }
            Tag::Item => {
                self.flush();
                let depth = self.lists.len().saturating_sub(1);
                let indent = "  ".repeat(depth);
                let marker = match self.lists.last_mut() {
                    Some(Some(number)) => {
                        let marker = format!("{indent}{number}. ");
                        *number += 1;
                        marker
                    }
                    _ => format!("{indent}• "),
                };
                self.push(marker, SpanStyle::default());
            }
            Tag::Emphasis => self.italic += 1,
            Tag::Strong => self.bold += 1,
            Tag::Strikethrough => self.strikethrough += 1,
            Tag::Link { .. } => self.link += 1,
            _ => {}
        }
    }

    fn end(&mut self, tag: TagEnd) {
        match tag {
            TagEnd::Paragraph => {
                if self.lists.is_empty() {
                    self.blank();
                } else {
                    self.flush();
                }
            }
            TagEnd::Heading { .. } => {
                self.heading = false;
                self.blank();
            }
            TagEnd::BlockQuote { .. } => {
                self.flush();
                self.quote_depth = self.quote_depth.saturating_sub(1);
                self.blank();
            }
            TagEnd::CodeBlock => {
                self.code_block = false;
                self.blank();
            }
            TagEnd::List { .. } => {
                self.lists.pop();
                self.blank();
            }
            TagEnd::Item => self.flush(),
            TagEnd::Emphasis => self.italic = self.italic.saturating_sub(1),
            TagEnd::Strong => self.bold = self.bold.saturating_sub(1),
            TagEnd::Strikethrough => self.strikethrough = self.strikethrough.saturating_sub(1),
            TagEnd::Link => self.link = self.link.saturating_sub(1),
            _ => {}
        }
    }

    fn finish(mut self) -> Vec<Line> {
        self.flush();
        while self.lines.last().is_some_and(|l| l.spans.is_empty()) {
            self.lines.pop();
        }
        self.lines
    }
}
