//! Transport layer module.

pub mod mock;
pub mod replay;
pub mod serial;
pub mod traits;

pub use mock::MockTransport;
pub use replay::ReplayTransport;
pub use serial::SerialTransport;
pub use traits::{Transport, TransportError};
