//! Crossterm-backed terminal surface.

use std::io::{self, IsTerminal, Stdout, Write};

use crossterm::cursor::MoveToPreviousLine;
use crossterm::style::{Attribute, Color, ContentStyle, PrintStyledContent, Stylize};
use crossterm::terminal::{self, Clear, ClearType};
use crossterm::{queue, QueueableCommand};
use tracing::debug;

use super::markdown::{render_markdown, Line, SpanStyle};
use super::surface::RenderSurface;

const FALLBACK_COLUMNS: usize = 80;

/// Draws onto stdout.
///
/// On a TTY the answer segment is a redrawable region: each render moves the
/// cursor back over the rows it drew last time, clears them and draws the new
/// buffer. When stdout is not a terminal only the committed segment is
/// printed, as plain text.
pub struct TerminalSurface<W: Write = Stdout> {
    out: W,
    interactive: bool,
    region_rows: usize,
    pending: Option<String>,
}

impl TerminalSurface<Stdout> {
    pub fn stdout() -> Self {
        let out = io::stdout();
        let interactive = out.is_terminal();
        Self::new(out, interactive)
    }
}

impl<W: Write> TerminalSurface<W> {
    pub fn new(out: W, interactive: bool) -> Self {
        Self {
            out,
            interactive,
            region_rows: 0,
            pending: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    /// Underlying writer, for output that bypasses the surface.
    pub fn writer(&mut self) -> &mut W {
        &mut self.out
    }

    /// `User: ...` line for echoed or replayed prompts.
    pub fn user_message(&mut self, text: &str) {
        self.styled_line("User: ", ContentStyle::new().bold().blue(), text);
    }

    /// Informational line (help, listings, status).
    pub fn info(&mut self, text: &str) {
        self.line(text.to_string().with(Color::Cyan));
    }

    /// Plain line, no styling.
    pub fn plain(&mut self, text: &str) {
        self.attempt(|out| writeln!(out, "{text}"));
    }

    /// Render a complete markdown message outside of a streamed response.
    pub fn markdown(&mut self, source: &str) {
        let lines = render_markdown(source);
        self.attempt(|out| write_lines(out, &lines, true));
    }

    fn columns(&self) -> usize {
        terminal::size()
            .map(|(cols, _)| usize::from(cols))
            .ok()
            .filter(|cols| *cols > 0)
            .unwrap_or(FALLBACK_COLUMNS)
    }

    fn styled_line(&mut self, prefix: &str, style: ContentStyle, text: &str) {
        let prefix = style.apply(prefix.to_string());
        self.attempt(|out| {
            out.queue(PrintStyledContent(prefix))?;
            writeln!(out, "{text}")
        });
    }

    fn line(&mut self, content: crossterm::style::StyledContent<String>) {
        self.attempt(|out| {
            out.queue(PrintStyledContent(content))?;
            writeln!(out)
        });
    }

    fn attempt<F>(&mut self, f: F)
    where
        F: FnOnce(&mut W) -> io::Result<()>,
    {
        if let Err(err) = f(&mut self.out).and_then(|()| self.out.flush()) {
            debug!(error = %err, "terminal write failed");
        }
    }

    fn clear_region(&mut self) -> io::Result<()> {
        if self.region_rows > 0 {
            let rows = u16::try_from(self.region_rows).unwrap_or(u16::MAX);
            queue!(self.out, MoveToPreviousLine(rows), Clear(ClearType::FromCursorDown))?;
            self.region_rows = 0;
        }
        Ok(())
    }
}

fn span_style(style: SpanStyle) -> ContentStyle {
    let mut content = ContentStyle::new();
    if style.heading {
        content = content.with(Color::Magenta);
    }
    if style.code {
        content = content.with(Color::Cyan);
    }
    if style.bold {
        content = content.attribute(Attribute::Bold);
    }
    if style.italic {
        content = content.attribute(Attribute::Italic);
    }
    if style.underline {
        content = content.attribute(Attribute::Underlined);
    }
    if style.strikethrough {
        content = content.attribute(Attribute::CrossedOut);
    }
    if style.dim {
        content = content.attribute(Attribute::Dim);
    }
    content
}

fn write_lines<W: Write>(out: &mut W, lines: &[Line], styled: bool) -> io::Result<()> {
    for line in lines {
        if styled {
            for span in &line.spans {
                out.queue(PrintStyledContent(span_style(span.style).apply(span.text.clone())))?;
            }
            writeln!(out)?;
        } else {
            writeln!(out, "{}", line.plain())?;
        }
    }
    Ok(())
}

impl<W: Write> RenderSurface for TerminalSurface<W> {
    fn begin_reasoning(&mut self) {
        let header = "🧠 Thinking: ".to_string().magenta().bold();
        self.attempt(|out| {
            writeln!(out)?;
            out.queue(PrintStyledContent(header))?;
            Ok(())
        });
    }

    fn write_reasoning(&mut self, token: &str) {
        let token = token.to_string().magenta().italic().dim();
        self.attempt(|out| {
            out.queue(PrintStyledContent(token))?;
            Ok(())
        });
    }

    fn end_reasoning(&mut self) {
        self.attempt(|out| {
            writeln!(out)?;
            writeln!(out)
        });
    }

    fn agent_banner(&mut self) {
        self.line("Agent:".to_string().green().bold());
    }

    fn render_answer(&mut self, markdown: &str) {
        if !self.interactive {
            self.pending = Some(markdown.to_string());
            return;
        }
        let lines = render_markdown(markdown);
        let columns = self.columns();
        let rows: usize = lines.iter().map(|line| line.rows(columns)).sum();
        let result = self
            .clear_region()
            .and_then(|()| write_lines(&mut self.out, &lines, true))
            .and_then(|()| self.out.flush());
        match result {
            Ok(()) => self.region_rows = rows,
            Err(err) => debug!(error = %err, "terminal redraw failed"),
        }
    }

    fn commit_answer(&mut self) {
        self.region_rows = 0;
        if let Some(markdown) = self.pending.take() {
            let lines = render_markdown(&markdown);
            self.attempt(|out| write_lines(out, &lines, false));
        }
    }

    fn tool_call(&mut self, name: &str) {
        self.line(format!("🔧 Calling tool: {name}").yellow().bold());
    }

    fn tool_output(&mut self, preview: &str) {
        self.line(format!("📤 Tool output: {preview}").cyan());
    }

    fn reasoning_summary(&mut self, preview: &str) {
        self.line(format!("💭 Reasoning: {preview}...").magenta().italic().dim());
    }

    fn error(&mut self, message: &str) {
        self.line(format!("❌ Error: {message}").red().bold());
    }

    fn blank_line(&mut self) {
        self.attempt(|out| writeln!(out));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn captured(surface: TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.into_inner()).unwrap()
    }

    #[test]
    fn non_interactive_prints_committed_answer_once() {
        let mut surface = TerminalSurface::new(Vec::new(), false);
        surface.render_answer("**par");
        surface.render_answer("**partial** answer");
        surface.commit_answer();
        let text = captured(surface);
        assert_eq!(text.matches("partial").count(), 1);
        assert!(text.contains("partial answer"));
    }

    #[test]
    fn notices_carry_their_markers() {
        let mut surface = TerminalSurface::new(Vec::new(), false);
        surface.tool_call("execute_command");
        surface.tool_output("hello");
        surface.error("boom");
        let text = captured(surface);
        assert!(text.contains("Calling tool: execute_command"));
        assert!(text.contains("Tool output: hello"));
        assert!(text.contains("Error: boom"));
    }

    #[test]
    fn interactive_redraw_clears_previous_rows() {
        let mut surface = TerminalSurface::new(Vec::new(), true);
        surface.render_answer("one");
        surface.render_answer("one two");
        let text = captured(surface);
        // Second draw moves back over the single row drawn first.
        assert!(text.contains("\u{1b}[1F"));
        assert!(text.contains("one two"));
    }
}
