//! Console protocol constants.

/// Idle marker the console prints when it is ready for a command.
pub const PROMPT_MARKER: &[u8; 4] = b"CFE>";

/// Probe sent while waiting for the prompt to appear.
pub const PROMPT_PROBE: &[u8] = b"\r\n";

/// Section separators are runs of at least this many dashes.
pub const SEPARATOR_PREFIX: &str = "-----";

/// Annotation on the separator that opens a spare-area section.
pub const SPARE_AREA_MARKER: &str = "spare area";

/// Bytes carried by one dump line.
pub const CHUNK_BYTES: usize = 16;

/// Address step between consecutive dump lines.
pub const CHUNK_STEP: u32 = 16;

/// Hex digits per data group (4 bytes, big-endian).
pub const GROUP_DIGITS: usize = 8;

/// Data groups per dump line.
pub const GROUPS_PER_LINE: usize = 4;
