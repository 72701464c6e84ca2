//! cfedump-core: capture engine for CFE console NAND dumps.
//!
//! Recovers the contents of a NAND flash chip through a Broadcom CFE
//! bootloader's interactive `dn` hex-dump command, reachable only over a
//! serial console, and reassembles the loosely formatted output into a
//! byte-exact image.
//!
//! # Architecture
//!
//! The crate is organized into layers:
//!
//! - **Protocol**: dump-line decoding, separator classification, `dn`
//!   command encoding
//! - **Transport**: console link abstraction (serial, replay, mock)
//! - **Prompt**: byte-level synchronization on the `CFE>` marker
//! - **Session**: the capture engine — single-page and bulk protocols,
//!   retry policy, page/block/NAND composition
//! - **Events**: observer pattern for UI decoupling
//! - **Params**: NAND geometry and retry policy
//!
//! # Example
//!
//! ```no_run
//! use cfedump_core::params::CaptureParams;
//! use cfedump_core::session::CaptureSession;
//! use cfedump_core::transport::ReplayTransport;
//!
//! let transport = ReplayTransport::open("console.log").expect("open log");
//! let mut session = CaptureSession::new(transport, CaptureParams::default());
//! session.prime().expect("synchronize");
//! for page in session.read_pages(0, 0, 4) {
//!     let page = page.expect("page read");
//!     assert_eq!(page.len(), 2048);
//! }
//! ```

pub mod events;
pub mod params;
pub mod prompt;
pub mod protocol;
pub mod session;
pub mod transport;

// Re-exports for convenience
pub use events::{CaptureEvent, CaptureObserver, NullObserver, TracingObserver};
pub use params::CaptureParams;
pub use prompt::{PromptMatcher, SyncState};
pub use protocol::{DecodeError, DumpCommand, DumpLine};
pub use session::{Blocks, BulkPages, CaptureError, CaptureSession, Pages};
pub use transport::{MockTransport, ReplayTransport, SerialTransport, Transport, TransportError};
