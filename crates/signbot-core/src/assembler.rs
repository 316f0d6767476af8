//! Streaming reply accumulation

/// Accumulates the text deltas of one assistant reply.
///
/// The buffer only ever grows between resets, so every published snapshot
/// is a prefix of the next.
#[derive(Debug, Default, Clone)]
pub struct ReplyAssembler {
    text: String,
}

impl ReplyAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty the buffer before a new reply
    pub fn reset(&mut self) {
        self.text.clear();
    }

    /// Append a fragment and return the full text so far
    pub fn push(&mut self, delta: &str) -> &str {
        self.text.push_str(delta);
        &self.text
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Take the accumulated text, leaving the buffer empty
    pub fn take(&mut self) -> String {
        std::mem::take(&mut self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_push_republishes_prefix_consistent_text() {
        let mut assembler = ReplyAssembler::new();
        let mut snapshots = Vec::new();
        for delta in ["Hi", " the", "re"] {
            snapshots.push(assembler.push(delta).to_string());
        }
        assert_eq!(snapshots, vec!["Hi", "Hi the", "Hi there"]);
        assert!(snapshots.windows(2).all(|w| w[1].starts_with(&w[0])));
    }

    #[test]
    fn test_take_and_reset() {
        let mut assembler = ReplyAssembler::new();
        assembler.push("abc");
        assert_eq!(assembler.take(), "abc");
        assert!(assembler.is_empty());

        assembler.push("x");
        assembler.reset();
        assert_eq!(assembler.text(), "");
    }
}
