//! Output surfaces driven by the reconciler.

/// Terminal-like sink the [`Reconciler`](super::Reconciler) draws onto.
///
/// The reconciler decides *when* something is shown; a surface only decides
/// *how*. Answer text arrives as the whole markdown buffer of the current
/// segment on every redraw, so a surface can replace what it drew last time.
pub trait RenderSurface {
    /// Open a reasoning block (header line).
    fn begin_reasoning(&mut self);
    /// Append one reasoning token to the open block.
    fn write_reasoning(&mut self, token: &str);
    /// Close the reasoning block and leave a blank separator line.
    fn end_reasoning(&mut self);
    /// The `Agent:` banner shown once per response.
    fn agent_banner(&mut self);
    /// Redraw the current answer segment from its full markdown buffer.
    fn render_answer(&mut self, markdown: &str);
    /// Freeze the current answer segment; the next render starts a new one.
    fn commit_answer(&mut self);
    fn tool_call(&mut self, name: &str);
    fn tool_output(&mut self, preview: &str);
    fn reasoning_summary(&mut self, preview: &str);
    fn error(&mut self, message: &str);
    fn blank_line(&mut self);
}

impl<S: RenderSurface + ?Sized> RenderSurface for &mut S {
    fn begin_reasoning(&mut self) {
        (**self).begin_reasoning();
    }

    fn write_reasoning(&mut self, token: &str) {
        (**self).write_reasoning(token);
    }

    fn end_reasoning(&mut self) {
        (**self).end_reasoning();
    }

    fn agent_banner(&mut self) {
        (**self).agent_banner();
    }

    fn render_answer(&mut self, markdown: &str) {
        (**self).render_answer(markdown);
    }

    fn commit_answer(&mut self) {
        (**self).commit_answer();
    }

    fn tool_call(&mut self, name: &str) {
        (**self).tool_call(name);
    }

    fn tool_output(&mut self, preview: &str) {
        (**self).tool_output(preview);
    }

    fn reasoning_summary(&mut self, preview: &str) {
        (**self).reasoning_summary(preview);
    }

    fn error(&mut self, message: &str) {
        (**self).error(message);
    }

    fn blank_line(&mut self) {
        (**self).blank_line();
    }
}

/// One call made on a [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SurfaceOp {
    BeginReasoning,
    Reasoning(String),
    EndReasoning,
    AgentBanner,
    RenderAnswer(String),
    CommitAnswer,
    ToolCall(String),
    ToolOutput(String),
    ReasoningSummary(String),
    Error(String),
    BlankLine,
}

/// Surface that records every call instead of drawing. Used for headless
/// capture of a response and in tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecordingSurface {
    pub ops: Vec<SurfaceOp>,
}

impl RecordingSurface {
    pub fn count(&self, predicate: impl Fn(&SurfaceOp) -> bool) -> usize {
        self.ops.iter().filter(|op| predicate(op)).count()
    }

    /// Concatenated reasoning tokens.
    pub fn reasoning_text(&self) -> String {
        self.ops
            .iter()
            .filter_map(|op| match op {
                SurfaceOp::Reasoning(token) => Some(token.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Last rendered buffer of every committed answer segment, joined.
    pub fn answer_text(&self) -> String {
        let mut segments = Vec::new();
        let mut last: Option<&str> = None;
        for op in &self.ops {
            match op {
                SurfaceOp::RenderAnswer(markdown) => last = Some(markdown),
                SurfaceOp::CommitAnswer => {
                    if let Some(markdown) = last.take() {
                        segments.push(markdown);
                    }
                }
                _ => {}
            }
        }
        if let Some(markdown) = last {
            segments.push(markdown);
        }
        segments.concat()
    }
}

impl RenderSurface for RecordingSurface {
    fn begin_reasoning(&mut self) {
        self.ops.push(SurfaceOp::BeginReasoning);
    }

    fn write_reasoning(&mut self, token: &str) {
        self.ops.push(SurfaceOp::Reasoning(token.to_string()));
    }

    fn end_reasoning(&mut self) {
        self.ops.push(SurfaceOp::EndReasoning);
    }

    fn agent_banner(&mut self) {
        self.ops.push(SurfaceOp::AgentBanner);
    }

    fn render_answer(&mut self, markdown: &str) {
        self.ops.push(SurfaceOp::RenderAnswer(markdown.to_string()));
    }

    fn commit_answer(&mut self) {
        self.ops.push(SurfaceOp::CommitAnswer);
    }

    fn tool_call(&mut self, name: &str) {
        self.ops.push(SurfaceOp::ToolCall(name.to_string()));
    }

    fn tool_output(&mut self, preview: &str) {
        self.ops.push(SurfaceOp::ToolOutput(preview.to_string()));
    }

    fn reasoning_summary(&mut self, preview: &str) {
        self.ops.push(SurfaceOp::ReasoningSummary(preview.to_string()));
    }

    fn error(&mut self, message: &str) {
        self.ops.push(SurfaceOp::Error(message.to_string()));
    }

    fn blank_line(&mut self) {
        self.ops.push(SurfaceOp::BlankLine);
    }
}
