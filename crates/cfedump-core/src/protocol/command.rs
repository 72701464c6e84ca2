//! `dn` dump command encoding.

use std::fmt;

/// One `dn <block> <page> <count>` console command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpCommand {
    pub block: u32,
    pub page: u32,
    pub count: u32,
}

impl DumpCommand {
    /// Dump a single page.
    pub fn page(block: u32, page: u32) -> Self {
        Self {
            block,
            page,
            count: 1,
        }
    }

    /// Dump `count` consecutive pages starting at `page`.
    pub fn range(block: u32, page: u32, count: u32) -> Self {
        Self { block, page, count }
    }

    /// ASCII command line as sent to the console, CRLF-terminated.
    pub fn encode(&self) -> Vec<u8> {
        format!("{self}\r\n").into_bytes()
    }
}

impl fmt::Display for DumpCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dn {} {} {}", self.block, self.page, self.count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_page_encoding() {
        let cmd = DumpCommand::page(3, 17);
        assert_eq!(cmd.encode(), b"dn 3 17 1\r\n");
    }

    #[test]
    fn test_range_encoding() {
        let cmd = DumpCommand::range(0, 0, 262144);
        assert_eq!(cmd.encode(), b"dn 0 0 262144\r\n");
        assert_eq!(cmd.to_string(), "dn 0 0 262144");
    }
}
