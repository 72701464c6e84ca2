//! Console protocol: command encoding and dump-line decoding.

pub mod command;
pub mod constants;
pub mod line;

pub use command::DumpCommand;
pub use line::{DecodeError, DumpLine, is_separator, is_spare_separator};
