//! Prompt synchronization.
//!
//! Before the first command the engine must see the console sitting at its
//! `CFE>` prompt. Bytes are matched one at a time against the marker; a
//! mismatch forgets the partial match entirely — no memory is carried
//! beyond the immediate prefix count.

use std::fmt;

use crate::protocol::constants::PROMPT_MARKER;

/// Where the matcher currently is in the prompt marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// No marker bytes matched yet.
    Probing,
    /// The first `n` marker bytes matched.
    MatchedPrefix(usize),
    /// Full marker seen.
    Synchronized,
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncState::Probing => write!(f, "PROBING"),
            SyncState::MatchedPrefix(n) => write!(f, "MATCHED_PREFIX({n})"),
            SyncState::Synchronized => write!(f, "SYNCHRONIZED"),
        }
    }
}

/// Byte-at-a-time matcher for the console prompt.
#[derive(Debug, Default)]
pub struct PromptMatcher {
    matched: usize,
}

impl PromptMatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SyncState {
        match self.matched {
            0 => SyncState::Probing,
            n if n >= PROMPT_MARKER.len() => SyncState::Synchronized,
            n => SyncState::MatchedPrefix(n),
        }
    }

    /// Feed one byte; true once the full marker has been seen.
    pub fn advance(&mut self, byte: u8) -> bool {
        if self.matched >= PROMPT_MARKER.len() {
            return true;
        }
        if byte == PROMPT_MARKER[self.matched] {
            self.matched += 1;
        } else {
            self.matched = 0;
        }
        self.matched >= PROMPT_MARKER.len()
    }

    pub fn reset(&mut self) {
        self.matched = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(matcher: &mut PromptMatcher, bytes: &[u8]) -> bool {
        let mut matched = false;
        for &b in bytes {
            matched = matcher.advance(b);
        }
        matched
    }

    #[test]
    fn test_exact_marker_matches() {
        let mut matcher = PromptMatcher::new();
        assert!(feed(&mut matcher, b"CFE>"));
        assert_eq!(matcher.state(), SyncState::Synchronized);
    }

    #[test]
    fn test_marker_after_junk() {
        let mut matcher = PromptMatcher::new();
        assert!(feed(&mut matcher, b"web info: all ok\r\nCFE>"));
    }

    #[test]
    fn test_prefix_states() {
        let mut matcher = PromptMatcher::new();
        assert_eq!(matcher.state(), SyncState::Probing);
        matcher.advance(b'C');
        matcher.advance(b'F');
        assert_eq!(matcher.state(), SyncState::MatchedPrefix(2));
        matcher.reset();
        assert_eq!(matcher.state(), SyncState::Probing);
    }

    #[test]
    fn test_mismatch_resets_to_probing() {
        let mut matcher = PromptMatcher::new();
        matcher.advance(b'C');
        matcher.advance(b'F');
        matcher.advance(b'X');
        assert_eq!(matcher.state(), SyncState::Probing);

        // A later clean occurrence still matches.
        assert!(feed(&mut matcher, b"CFE>"));
    }

    #[test]
    fn test_no_partial_match_memory() {
        let mut matcher = PromptMatcher::new();
        // The overlapping 'C' is consumed by the reset, so this run does
        // not match; the console repeats its prompt anyway.
        assert!(!feed(&mut matcher, b"CCFE"));
        assert!(feed(&mut matcher, b"\r\nCFE>"));
    }
}
