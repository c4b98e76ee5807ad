//! Streaming reconciler: classified events in, incremental terminal output out.
//!
//! Three exclusive modes drive the surface:
//!
//! * `Idle`: nothing open.
//! * `Reasoning`: a reasoning block is open; every token is written at once.
//! * `Answering`: an answer segment is open; the buffer is redrawn every
//!   `render_every` tokens and once more when the segment closes.
//!
//! A tool call closes whatever is open. Text after it starts a new answer
//! segment without repeating the `Agent:` banner.
//!
//! Modes only move forward within one completion: once answer text has
//! started, reasoning cannot reopen until the next tool call. Reasoning that
//! arrives late is held back and shown as a closed block at the next tool
//! call, error, or finalize.
//!
//! [`Reconciler::finalize`] is idempotent and also runs on drop, so a
//! consuming task that is cancelled mid-stream still leaves the terminal in
//! a closed state.

use futures::{pin_mut, Stream, StreamExt};
use tracing::debug;

use super::surface::RenderSurface;
use crate::config::DEFAULT_RENDER_EVERY;
use crate::types::{truncate_chars, StreamEvent};

pub const PREVIEW_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Idle,
    Reasoning,
    Answering,
}

/// Whether the consuming loop should keep reading events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Stop,
}

pub struct Reconciler<S: RenderSurface> {
    surface: S,
    render_every: usize,
    mode: Mode,
    answer: String,
    answer_tokens: usize,
    answer_started: bool,
    deferred_reasoning: String,
    banner_shown: bool,
    reasoning_shown: bool,
    summary_shown: bool,
    stopped: bool,
    finalized: bool,
}

impl<S: RenderSurface> Reconciler<S> {
    pub fn new(surface: S, render_every: usize) -> Self {
        Self {
            surface,
            render_every: if render_every == 0 {
                DEFAULT_RENDER_EVERY
            } else {
                render_every
            },
            mode: Mode::Idle,
            answer: String::new(),
            answer_tokens: 0,
            answer_started: false,
            deferred_reasoning: String::new(),
            banner_shown: false,
            reasoning_shown: false,
            summary_shown: false,
            stopped: false,
            finalized: false,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Apply one event. Returns [`Flow::Stop`] after an error event.
    pub fn handle(&mut self, event: &StreamEvent) -> Flow {
        if self.stopped || self.finalized {
            return Flow::Stop;
        }

        match event {
            StreamEvent::ReasoningDelta { content } => self.on_reasoning(content),
            StreamEvent::TextDelta { content } => self.on_text(content),
            StreamEvent::ToolCall { name } => {
                self.close_open_mode();
                self.flush_deferred_reasoning();
                self.answer_started = false;
                self.surface.tool_call(name);
            }
            StreamEvent::ToolOutput { output } => {
                self.surface.tool_output(&preview(output));
            }
            StreamEvent::ReasoningSummary { content } => self.on_summary(content),
            StreamEvent::AgentUpdate { name } => {
                debug!(agent = %name, "agent updated");
            }
            StreamEvent::Error { content } => {
                self.close_open_mode();
                self.flush_deferred_reasoning();
                self.surface.error(content);
                self.stopped = true;
                return Flow::Stop;
            }
        }
        Flow::Continue
    }

    /// Close any open mode, redraw the answer one last time and print the
    /// trailing separator. Safe to call more than once.
    pub fn finalize(&mut self) {
        if self.finalized {
            return;
        }
        self.close_open_mode();
        self.flush_deferred_reasoning();
        self.surface.blank_line();
        self.finalized = true;
    }

    fn on_reasoning(&mut self, token: &str) {
        if self.answer_started {
            self.deferred_reasoning.push_str(token);
            return;
        }
        if self.mode != Mode::Reasoning {
            self.surface.begin_reasoning();
            self.mode = Mode::Reasoning;
            self.reasoning_shown = true;
        }
        self.surface.write_reasoning(token);
    }

    fn on_text(&mut self, token: &str) {
        if self.mode == Mode::Reasoning {
            self.close_reasoning();
        }
        if self.mode != Mode::Answering {
            if !self.banner_shown {
                self.surface.agent_banner();
                self.banner_shown = true;
            }
            self.mode = Mode::Answering;
            self.answer_started = true;
            self.answer.clear();
            self.answer_tokens = 0;
        }
        self.answer.push_str(token);
        self.answer_tokens += 1;
        if self.answer_tokens % self.render_every == 0 {
            self.surface.render_answer(&self.answer);
        }
    }

    fn on_summary(&mut self, content: &str) {
        if self.reasoning_shown || self.summary_shown {
            return;
        }
        let preview = truncate_chars(content, PREVIEW_CHARS);
        if !preview.is_empty() {
            self.surface.reasoning_summary(preview);
            self.summary_shown = true;
        }
    }

    /// Show reasoning held back during an answer as one closed block.
    fn flush_deferred_reasoning(&mut self) {
        if self.deferred_reasoning.is_empty() {
            return;
        }
        let reasoning = std::mem::take(&mut self.deferred_reasoning);
        self.surface.begin_reasoning();
        self.surface.write_reasoning(&reasoning);
        self.surface.end_reasoning();
        self.reasoning_shown = true;
    }

    fn close_open_mode(&mut self) {
        match self.mode {
            Mode::Reasoning => self.close_reasoning(),
            Mode::Answering => self.close_answer(),
            Mode::Idle => {}
        }
    }

    fn close_reasoning(&mut self) {
        self.surface.end_reasoning();
        self.mode = Mode::Idle;
    }

    fn close_answer(&mut self) {
        if !self.answer.is_empty() {
            self.surface.render_answer(&self.answer);
        }
        self.surface.commit_answer();
        self.answer.clear();
        self.answer_tokens = 0;
        self.mode = Mode::Idle;
    }
}

impl<S: RenderSurface> Drop for Reconciler<S> {
    fn drop(&mut self) {
        self.finalize();
    }
}

/// Tool output preview: at most 100 characters, with `...` when cut.
pub fn preview(output: &str) -> String {
    let cut = truncate_chars(output, PREVIEW_CHARS);
    if cut.len() < output.len() {
        format!("{cut}...")
    } else {
        cut.to_string()
    }
}

/// Consume `events` in order onto `surface`, stopping after an error event.
///
/// The reconciler is finalized when the stream ends, after an error, and
/// when the returned future is dropped before completion.
pub async fn render_stream<S, St>(surface: S, render_every: usize, events: St)
where
    S: RenderSurface,
    St: Stream<Item = StreamEvent>,
{
    let mut reconciler = Reconciler::new(surface, render_every);
    pin_mut!(events);
    while let Some(event) = events.next().await {
        if reconciler.handle(&event) == Flow::Stop {
            break;
        }
    }
    reconciler.finalize();
}
