//! Dump-line decoding.
//!
//! The console emits main-area data as loosely formatted hex dump lines:
//!
//! ```text
//! 00fc2000: 27051956 ea3c0c74 4f676039 67e7a5b2   '..V.<.tOg`9g...
//! ```
//!
//! An 8-digit address, a colon, four 8-digit data groups, and an optional
//! ASCII gutter. Each group is an unsigned integer re-expressed as its
//! big-endian byte string, 4 bytes per group, 16 bytes per line.

use std::fmt;

use byteorder::{BigEndian, ByteOrder};
use thiserror::Error;

use super::constants::{
    CHUNK_BYTES, GROUP_DIGITS, GROUPS_PER_LINE, SEPARATOR_PREFIX, SPARE_AREA_MARKER,
};

#[derive(Error, Debug)]
pub enum DecodeError {
    /// The line had the dump shape but a group would not decode as hex.
    #[error("unusable dump line: {line:?}")]
    MalformedLine { line: String },
}

/// One decoded dump line: the address it starts at and its 16-byte chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpLine {
    pub addr: u32,
    pub data: [u8; CHUNK_BYTES],
}

impl DumpLine {
    /// Decode one console line, already stripped of its terminator.
    ///
    /// Returns `Ok(None)` for lines that are not dump lines at all (echoes,
    /// banners, blanks, separators) — those are the caller's to skip. Only
    /// a line that matches the dump shape but carries broken hex content is
    /// an error, and the error keeps the raw line for diagnosis.
    pub fn parse(line: &str) -> Result<Option<Self>, DecodeError> {
        let Some((head, rest)) = line.split_once(": ") else {
            return Ok(None);
        };
        if head.len() != GROUP_DIGITS || !head.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Ok(None);
        }

        // Four 8-character groups separated by single spaces, then either
        // end of line or whitespace before the ASCII gutter.
        const DATA_CHARS: usize = GROUPS_PER_LINE * GROUP_DIGITS + (GROUPS_PER_LINE - 1);
        if rest.len() < DATA_CHARS || !rest.is_char_boundary(DATA_CHARS) {
            return Ok(None);
        }
        let (groups, gutter) = rest.split_at(DATA_CHARS);
        if !gutter.is_empty() && !gutter.starts_with(|c: char| c.is_ascii_whitespace()) {
            return Ok(None);
        }

        let malformed = || DecodeError::MalformedLine {
            line: line.to_string(),
        };

        let mut data = [0u8; CHUNK_BYTES];
        let mut count = 0;
        for (i, group) in groups.split(' ').enumerate() {
            if i >= GROUPS_PER_LINE || group.len() != GROUP_DIGITS {
                return Ok(None);
            }
            // The shape is established; bad hex from here on is an error.
            let word = u32::from_str_radix(group, 16).map_err(|_| malformed())?;
            BigEndian::write_u32(&mut data[i * 4..(i + 1) * 4], word);
            count += 1;
        }
        if count != GROUPS_PER_LINE {
            return Ok(None);
        }

        let addr = u32::from_str_radix(head, 16).map_err(|_| malformed())?;
        Ok(Some(Self { addr, data }))
    }
}

impl fmt::Display for DumpLine {
    /// Re-encode in the console's own format (without the gutter).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:08x}:", self.addr)?;
        for group in self.data.chunks(4) {
            write!(f, " {:08x}", BigEndian::read_u32(group))?;
        }
        Ok(())
    }
}

/// Section separator: a run of five or more dashes opens and closes dump
/// areas.
pub fn is_separator(line: &str) -> bool {
    line.starts_with(SEPARATOR_PREFIX)
}

/// Separator that additionally marks a spare-area section boundary.
pub fn is_spare_separator(line: &str) -> bool {
    is_separator(line) && line.contains(SPARE_AREA_MARKER)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_line() {
        let parsed = DumpLine::parse("00fc2000: 27051956 ea3c0c74 4f676039 67e7a5b2")
            .unwrap()
            .expect("dump line");
        assert_eq!(parsed.addr, 0x00fc_2000);
        assert_eq!(
            parsed.data,
            [
                0x27, 0x05, 0x19, 0x56, 0xea, 0x3c, 0x0c, 0x74, 0x4f, 0x67, 0x60, 0x39, 0x67,
                0xe7, 0xa5, 0xb2
            ]
        );
    }

    #[test]
    fn test_parse_with_ascii_gutter() {
        let parsed = DumpLine::parse("00000010: 41424344 45464748 494a4b4c 4d4e4f50   ABCDEFGHIJKLMNOP")
            .unwrap()
            .expect("dump line");
        assert_eq!(parsed.addr, 0x10);
        assert_eq!(&parsed.data, b"ABCDEFGHIJKLMNOP");
    }

    #[test]
    fn test_parse_gutter_with_spaces() {
        // The gutter is arbitrary ASCII and may itself contain spaces.
        let parsed = DumpLine::parse("00000000: 2f62696e 2f627573 79626f78 20202020   /bin/busybox    ")
            .unwrap()
            .expect("dump line");
        assert_eq!(&parsed.data, b"/bin/busybox    ");
    }

    #[test]
    fn test_parse_uppercase_hex() {
        let parsed = DumpLine::parse("0000FFF0: DEADBEEF CAFEBABE 00000000 FFFFFFFF")
            .unwrap()
            .expect("dump line");
        assert_eq!(parsed.addr, 0xfff0);
        assert_eq!(parsed.data[0..4], [0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn test_non_dump_lines_are_none() {
        for line in [
            "",
            "CFE> dn 0 0 1",
            "Dumping block 0 page 0",
            "------------------------",
            "----------------- spare area -----------------",
            "Flash is: NAND 512MB",
            "00000000:",
            "00000000: 27051956",
        ] {
            assert!(DumpLine::parse(line).unwrap().is_none(), "line: {line:?}");
        }
    }

    #[test]
    fn test_bad_hex_in_matching_shape_is_error() {
        let err = DumpLine::parse("00000000: 2705195g ea3c0c74 4f676039 67e7a5b2").unwrap_err();
        let DecodeError::MalformedLine { line } = err;
        assert!(line.contains("2705195g"));
    }

    #[test]
    fn test_display_round_trips() {
        let text = "00fc2000: 27051956 ea3c0c74 4f676039 67e7a5b2";
        let parsed = DumpLine::parse(text).unwrap().expect("dump line");
        assert_eq!(parsed.to_string(), text);
    }

    #[test]
    fn test_separator_classification() {
        assert!(is_separator("------------------------"));
        assert!(is_separator("-----"));
        assert!(!is_separator("----"));
        assert!(!is_separator("CFE>"));
        assert!(is_spare_separator("----------------- spare area -----------------"));
        assert!(!is_spare_separator("------------------------"));
    }
}
