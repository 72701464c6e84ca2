//! Event system for UI decoupling.
//!
//! Lets the CLI (or any other frontend) follow a capture without the engine
//! depending on a rendering stack. Observers are injected explicitly; the
//! engine holds no ambient reporting state.

/// Events emitted by the capture engine.
#[derive(Debug, Clone)]
pub enum CaptureEvent {
    /// The console answered a probe and is sitting at its prompt.
    PromptSynchronized { probes: u32 },
    /// A dump command was written to the console.
    CommandSent { command: String },
    /// One page was assembled successfully.
    PageRead { block: u32, page: u32, len: usize },
    /// A page read failed and will be re-attempted.
    PageRetry {
        block: u32,
        page: u32,
        attempt: u32,
        max_retries: u32,
        error: String,
    },
    /// Bulk mode padded a gap in the address sequence with zero chunks.
    GapPadded { after_addr: u32, chunks: usize },
    /// Bulk mode dropped a retransmitted line.
    DuplicateDropped { addr: u32 },
    /// Bulk mode skipped a line it could not decode.
    LineSkipped { line: String },
}

/// Observer trait for receiving capture events.
///
/// Implement this in the frontend to follow progress and diagnostics.
pub trait CaptureObserver: Send + Sync {
    fn on_event(&self, event: &CaptureEvent);
}

/// No-op observer that discards all events.
pub struct NullObserver;

impl CaptureObserver for NullObserver {
    fn on_event(&self, _event: &CaptureEvent) {}
}

/// Observer that logs events using tracing.
pub struct TracingObserver;

impl CaptureObserver for TracingObserver {
    fn on_event(&self, event: &CaptureEvent) {
        match event {
            CaptureEvent::PromptSynchronized { probes } => {
                tracing::info!(probes, "console prompt synchronized");
            }
            CaptureEvent::CommandSent { command } => {
                tracing::debug!(command = %command, "command sent");
            }
            CaptureEvent::PageRead { block, page, len } => {
                tracing::debug!(block, page, len, "page read");
            }
            CaptureEvent::PageRetry {
                block,
                page,
                attempt,
                max_retries,
                error,
            } => {
                tracing::warn!(
                    block,
                    page,
                    attempt,
                    max_retries,
                    error = %error,
                    "page read failed, retrying"
                );
            }
            CaptureEvent::GapPadded { after_addr, chunks } => {
                tracing::warn!(
                    after_addr = %format!("{after_addr:#010x}"),
                    chunks,
                    "address gap padded with zeroes"
                );
            }
            CaptureEvent::DuplicateDropped { addr } => {
                tracing::debug!(addr = %format!("{addr:#010x}"), "duplicate line dropped");
            }
            CaptureEvent::LineSkipped { line } => {
                tracing::warn!(line = %line, "undecodable line skipped");
            }
        }
    }
}
