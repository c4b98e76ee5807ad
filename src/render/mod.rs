//! Streaming output: the reconciler state machine and the surfaces it drives.

pub mod markdown;
pub mod reconciler;
pub mod surface;
pub mod terminal;

pub use markdown::{render_markdown, render_plain};
pub use reconciler::{preview, render_stream, Flow, Mode, Reconciler};
pub use surface::{RecordingSurface, RenderSurface, SurfaceOp};
pub use terminal::TerminalSurface;
