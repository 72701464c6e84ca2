//! Capture engine: drives the console's `dn` command and reassembles pages.
//!
//! Two read protocols share the line decoder. The single-page protocol is
//! one request/response exchange per page with a retry budget; the bulk
//! protocol issues one command for an arbitrary page run and consumes the
//! response as a continuous stream, trusting the console's section framing
//! for page boundaries. Pages come back through lazy, forward-only
//! iterators; the caller persists each page before pulling the next.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::events::{CaptureEvent, CaptureObserver, TracingObserver};
use crate::params::CaptureParams;
use crate::prompt::PromptMatcher;
use crate::protocol::constants::{CHUNK_BYTES, CHUNK_STEP, PROMPT_PROBE};
use crate::protocol::line::{self, DecodeError, DumpLine};
use crate::protocol::DumpCommand;
use crate::transport::{Transport, TransportError};

/// Probe cycles attempted before giving up on finding a prompt. Each cycle
/// is bounded by the transport's read timeout.
const MAX_PROMPT_PROBES: u32 = 128;

#[derive(Error, Debug)]
pub enum CaptureError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// Assembled page length differed from the configured page size.
    #[error("read page size ({actual}) different from expected size ({expected})")]
    PageSizeMismatch { actual: usize, expected: usize },

    /// A block did not yield the expected page count.
    #[error("block {block} yielded {actual} pages, expected {expected}")]
    BlockSizeMismatch {
        block: u32,
        actual: u32,
        expected: u32,
    },

    /// The retry budget for one page is spent; the capture is over.
    #[error("block {block} page {page} failed after {attempts} attempts")]
    MaxRetriesExceeded { block: u32, page: u32, attempts: u32 },

    /// The console never presented its prompt.
    #[error("console prompt not found after {probes} probes")]
    PromptNotFound { probes: u32 },

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl CaptureError {
    /// Transient failures are recovered by re-reading the same page.
    fn is_transient(&self) -> bool {
        matches!(
            self,
            CaptureError::Decode(_) | CaptureError::PageSizeMismatch { .. }
        )
    }
}

/// Capture session: owns the console link for its whole lifetime and turns
/// `dn` responses into fixed-size pages.
pub struct CaptureSession<T: Transport, O: CaptureObserver = TracingObserver> {
    transport: T,
    params: CaptureParams,
    observer: Arc<O>,
}

impl<T: Transport> CaptureSession<T, TracingObserver> {
    /// Create a session that reports through tracing.
    pub fn new(transport: T, params: CaptureParams) -> Self {
        Self::with_observer(transport, params, Arc::new(TracingObserver))
    }
}

impl<T: Transport, O: CaptureObserver> CaptureSession<T, O> {
    /// Create a session with a custom observer.
    pub fn with_observer(transport: T, params: CaptureParams, observer: Arc<O>) -> Self {
        Self {
            transport,
            params,
            observer,
        }
    }

    pub fn params(&self) -> &CaptureParams {
        &self.params
    }

    /// The underlying transport, e.g. for replay offset diagnostics.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Bring the console to a known state: poke it with newlines until the
    /// prompt marker comes back, then drain whatever else it had queued.
    /// No-op on non-interactive transports.
    pub fn prime(&mut self) -> Result<(), CaptureError> {
        if !self.transport.is_interactive() {
            return Ok(());
        }
        info!("waiting for console prompt");
        let mut matcher = PromptMatcher::new();
        for probe in 1..=MAX_PROMPT_PROBES {
            self.transport.write(PROMPT_PROBE)?;
            loop {
                let bytes = self.transport.read(1)?;
                let Some(&byte) = bytes.first() else {
                    break; // link went quiet, poke it again
                };
                if matcher.advance(byte) {
                    self.drain_junk()?;
                    self.observer
                        .on_event(&CaptureEvent::PromptSynchronized { probes: probe });
                    return Ok(());
                }
            }
        }
        Err(CaptureError::PromptNotFound {
            probes: MAX_PROMPT_PROBES,
        })
    }

    /// Swallow unsolicited bytes so the next command starts clean. Reading
    /// a replay log here would eat the following responses, so only live
    /// links are drained.
    fn drain_junk(&mut self) -> Result<(), CaptureError> {
        if !self.transport.is_interactive() {
            return Ok(());
        }
        while !self.transport.read(1)?.is_empty() {}
        Ok(())
    }

    fn send_command(&mut self, command: DumpCommand) -> Result<(), CaptureError> {
        self.transport.write(&command.encode())?;
        self.observer.on_event(&CaptureEvent::CommandSent {
            command: command.to_string(),
        });
        Ok(())
    }

    /// One `dn <block> <page> 1` exchange.
    fn read_page_once(&mut self, block: u32, page: u32) -> Result<Vec<u8>, CaptureError> {
        let expected = self.params.page_size as usize;
        self.send_command(DumpCommand::page(block, page))?;

        // Skip the command echo and any banner up to the separator that
        // opens the main area.
        loop {
            let raw = self.transport.read_line()?;
            if raw.is_empty() {
                // Truncated response; the page retry owns recovery.
                return Err(CaptureError::PageSizeMismatch {
                    actual: 0,
                    expected,
                });
            }
            let text = String::from_utf8_lossy(&raw);
            if line::is_separator(text.trim()) {
                break;
            }
        }

        let mut buf = Vec::with_capacity(expected);
        let mut separators = 0u32;
        loop {
            let raw = self.transport.read_line()?;
            if raw.is_empty() {
                return Err(CaptureError::PageSizeMismatch {
                    actual: buf.len(),
                    expected,
                });
            }
            let text = String::from_utf8_lossy(&raw);
            let text = text.trim();

            if line::is_separator(text) {
                separators += 1;
                // The main area ends at the first separator; with spare-area
                // dumping enabled a second separator closes the spare dump.
                if !self.params.spare_area || separators == 2 {
                    break;
                }
                continue;
            }
            if text.is_empty() {
                continue;
            }
            if separators > 0 {
                // Spare-area content, not part of the image payload.
                continue;
            }
            if let Some(dump) = DumpLine::parse(text)? {
                buf.extend_from_slice(&dump.data);
            }
        }

        if buf.len() != expected {
            return Err(CaptureError::PageSizeMismatch {
                actual: buf.len(),
                expected,
            });
        }

        self.drain_junk()?;
        self.observer.on_event(&CaptureEvent::PageRead {
            block,
            page,
            len: buf.len(),
        });
        Ok(buf)
    }

    /// Read one page, retrying transient failures up to the configured
    /// budget. Exhausting the budget is fatal for the whole capture.
    pub fn read_page(&mut self, block: u32, page: u32) -> Result<Vec<u8>, CaptureError> {
        let mut attempt = 0u32;
        loop {
            match self.read_page_once(block, page) {
                Ok(buf) => return Ok(buf),
                Err(err) if err.is_transient() => {
                    attempt += 1;
                    warn!(block, page, attempt, error = %err, "page read failed");
                    self.observer.on_event(&CaptureEvent::PageRetry {
                        block,
                        page,
                        attempt,
                        max_retries: self.params.max_retries,
                        error: err.to_string(),
                    });
                    if attempt >= self.params.max_retries {
                        return Err(CaptureError::MaxRetriesExceeded {
                            block,
                            page,
                            attempts: attempt,
                        });
                    }
                    // Let the console finish talking before re-requesting.
                    self.drain_junk()?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    /// Sequential single-page reads of `count` pages starting at
    /// `(block, start)`.
    pub fn read_pages(&mut self, block: u32, start: u32, count: u32) -> Pages<'_, T, O> {
        Pages {
            session: self,
            block,
            next_page: start,
            end_page: start.saturating_add(count),
            failed: false,
        }
    }

    /// All pages of one block.
    pub fn read_block(&mut self, block: u32) -> Blocks<'_, T, O> {
        self.read_blocks(block, 1)
    }

    /// All pages of `count` blocks starting at `start`.
    pub fn read_blocks(&mut self, start: u32, count: u32) -> Blocks<'_, T, O> {
        Blocks {
            session: self,
            next_block: start,
            end_block: start.saturating_add(count),
            page_in_block: 0,
            yielded_in_block: 0,
            failed: false,
        }
    }

    /// Every page of the NAND, one request/response exchange per page.
    pub fn read_nand(&mut self) -> Blocks<'_, T, O> {
        let blocks = self.params.blocks();
        self.read_blocks(0, blocks)
    }

    /// One streaming command covering `count` pages starting at
    /// `(block, start)`.
    pub fn read_pages_bulk(
        &mut self,
        block: u32,
        start: u32,
        count: u32,
    ) -> Result<BulkPages<'_, T, O>, CaptureError> {
        self.send_command(DumpCommand::range(block, start, count))?;
        Ok(BulkPages {
            session: self,
            started: false,
            last_addr: None,
            done: false,
        })
    }

    /// The whole NAND as one bulk stream.
    pub fn read_nand_bulk(&mut self) -> Result<BulkPages<'_, T, O>, CaptureError> {
        let pages = self.params.total_pages() as u32;
        self.read_pages_bulk(0, 0, pages)
    }
}

/// Lazy single-page reads over one block's page range.
///
/// Fuses after the first fatal error: retry exhaustion stops the capture,
/// and pages already yielded stay valid.
pub struct Pages<'s, T: Transport, O: CaptureObserver> {
    session: &'s mut CaptureSession<T, O>,
    block: u32,
    next_page: u32,
    end_page: u32,
    failed: bool,
}

impl<T: Transport, O: CaptureObserver> Iterator for Pages<'_, T, O> {
    type Item = Result<Vec<u8>, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_page >= self.end_page {
            return None;
        }
        let page = self.next_page;
        self.next_page += 1;
        let result = self.session.read_page(self.block, page);
        if result.is_err() {
            self.failed = true;
        }
        Some(result)
    }
}

/// Lazy block-spanning page sequence. Every block must yield exactly
/// `block_size / page_size` pages; a shortfall is fatal, not retried —
/// page-level retries have already spent their budget by then.
pub struct Blocks<'s, T: Transport, O: CaptureObserver> {
    session: &'s mut CaptureSession<T, O>,
    next_block: u32,
    end_block: u32,
    page_in_block: u32,
    yielded_in_block: u32,
    failed: bool,
}

impl<T: Transport, O: CaptureObserver> Iterator for Blocks<'_, T, O> {
    type Item = Result<Vec<u8>, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.next_block >= self.end_block {
            return None;
        }
        let block = self.next_block;
        let page = self.page_in_block;
        let per_block = self.session.params.pages_per_block();

        match self.session.read_page(block, page) {
            Ok(buf) => {
                self.yielded_in_block += 1;
                self.page_in_block += 1;
                if self.page_in_block >= per_block {
                    if self.yielded_in_block != per_block {
                        self.failed = true;
                        return Some(Err(CaptureError::BlockSizeMismatch {
                            block,
                            actual: self.yielded_in_block,
                            expected: per_block,
                        }));
                    }
                    debug!(block, pages = per_block, "block complete");
                    self.next_block += 1;
                    self.page_in_block = 0;
                    self.yielded_in_block = 0;
                }
                Some(Ok(buf))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Streaming bulk read: one command, one continuous response.
///
/// Pages are framed by the spare-area separators; the stream ends when the
/// line source does. Bulk mode trusts the console's framing, so a page cut
/// short at a boundary is yielded as-is.
pub struct BulkPages<'s, T: Transport, O: CaptureObserver> {
    session: &'s mut CaptureSession<T, O>,
    started: bool,
    last_addr: Option<u32>,
    done: bool,
}

impl<T: Transport, O: CaptureObserver> BulkPages<'_, T, O> {
    /// Discard the spare-area dump through its closing separator.
    fn skip_spare_section(&mut self) -> Result<(), CaptureError> {
        loop {
            let raw = self.session.transport.read_line()?;
            if raw.is_empty() {
                self.done = true;
                return Ok(());
            }
            if line::is_separator(String::from_utf8_lossy(&raw).trim()) {
                return Ok(());
            }
        }
    }
}

impl<T: Transport, O: CaptureObserver> Iterator for BulkPages<'_, T, O> {
    type Item = Result<Vec<u8>, CaptureError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        if !self.started {
            // Skip everything up to the separator opening the first page.
            loop {
                let raw = match self.session.transport.read_line() {
                    Ok(raw) => raw,
                    Err(err) => {
                        self.done = true;
                        return Some(Err(err.into()));
                    }
                };
                if raw.is_empty() {
                    self.done = true;
                    return None;
                }
                if line::is_separator(String::from_utf8_lossy(&raw).trim()) {
                    self.started = true;
                    break;
                }
            }
        }

        let mut buf = Vec::with_capacity(self.session.params.page_size as usize);
        loop {
            let raw = match self.session.transport.read_line() {
                Ok(raw) => raw,
                Err(err) => {
                    self.done = true;
                    return Some(Err(err.into()));
                }
            };
            if raw.is_empty() {
                // Source exhausted; a partial buffer past the last boundary
                // is not emitted.
                self.done = true;
                if !buf.is_empty() {
                    debug!(len = buf.len(), "dropping trailing partial page buffer");
                }
                return None;
            }
            let text = String::from_utf8_lossy(&raw);
            let text = text.trim();
            if text.is_empty() {
                continue;
            }

            if line::is_spare_separator(text) {
                // Page boundary: emit what we have, discard the spare dump.
                if let Err(err) = self.skip_spare_section() {
                    self.done = true;
                    return Some(Err(err));
                }
                return Some(Ok(buf));
            }
            if line::is_separator(text) {
                continue;
            }

            let dump = match DumpLine::parse(text) {
                Ok(Some(dump)) => dump,
                Ok(None) => continue,
                Err(err) => {
                    // Bulk mode favors throughput: log it and move on.
                    warn!(error = %err, "skipping undecodable line");
                    self.session.observer.on_event(&CaptureEvent::LineSkipped {
                        line: text.to_string(),
                    });
                    continue;
                }
            };

            if let Some(last) = self.last_addr {
                if dump.addr <= last {
                    self.session
                        .observer
                        .on_event(&CaptureEvent::DuplicateDropped { addr: dump.addr });
                    continue;
                }
                let mut cursor = last;
                let mut padded = 0usize;
                while dump.addr - cursor > CHUNK_STEP {
                    cursor += CHUNK_STEP;
                    padded += 1;
                }
                if padded > 0 {
                    buf.resize(buf.len() + padded * CHUNK_BYTES, 0);
                    warn!(
                        after = %format!("{last:#010x}"),
                        chunks = padded,
                        "padding address gap with zeroes"
                    );
                    self.session.observer.on_event(&CaptureEvent::GapPadded {
                        after_addr: last,
                        chunks: padded,
                    });
                }
            }
            self.last_addr = Some(dump.addr);
            buf.extend_from_slice(&dump.data);
        }
    }
}
