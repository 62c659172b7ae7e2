use tokio::time::Instant;

/// Accumulates finalized speech fragments until the scheduler flushes them.
///
/// The buffer is passive: the controller owns the flush timer and decides when
/// to call [`TranscriptBuffer::take`]. The buffer only tracks text and the
/// instant accumulation began.
#[derive(Debug)]
pub struct TranscriptBuffer {
    text: String,
    started_at: Option<Instant>,
    max_chars: usize,
}

impl TranscriptBuffer {
    pub fn new(max_chars: usize) -> Self {
        Self {
            text: String::new(),
            started_at: None,
            max_chars,
        }
    }

    /// Append a finalized fragment, separated from previous text by a single
    /// space. Returns `true` if the fragment was accepted (blank fragments are
    /// dropped); the caller arms the flush timer when none is pending.
    pub fn append(&mut self, fragment: &str) -> bool {
        let fragment = fragment.trim();
        if fragment.is_empty() {
            return false;
        }

        if self.started_at.is_none() {
            self.started_at = Some(Instant::now());
        }

        if !self.text.is_empty() {
            self.text.push(' ');
        }
        self.text.push_str(fragment);

        true
    }

    /// Whether the accumulated text exceeds the safety threshold and should be
    /// flushed ahead of the timer.
    pub fn over_limit(&self) -> bool {
        self.text.len() > self.max_chars
    }

    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Take the trimmed buffer contents and reset to empty. Returns `None`
    /// when there is nothing to flush.
    pub fn take(&mut self) -> Option<String> {
        self.started_at = None;
        let text = std::mem::take(&mut self.text);
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }

    /// Discard contents without emitting anything.
    pub fn clear(&mut self) {
        self.text.clear();
        self.started_at = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_fragments_accumulate() {
        let mut buf = TranscriptBuffer::new(1000);
        assert!(buf.append("hello"));
        assert!(buf.append("world"));
        assert_eq!(buf.take(), Some("hello world".to_string()));

        // After a flush the buffer starts over.
        assert!(buf.append("again"));
        assert_eq!(buf.take(), Some("again".to_string()));
    }

    #[test]
    fn fragments_join_with_single_space() {
        let mut buf = TranscriptBuffer::new(1000);
        buf.append("  one ");
        buf.append("two");
        buf.append(" three  ");
        assert_eq!(buf.take(), Some("one two three".to_string()));
    }

    #[test]
    fn blank_fragments_are_ignored() {
        let mut buf = TranscriptBuffer::new(1000);
        assert!(!buf.append("   "));
        assert!(!buf.append(""));
        assert!(buf.is_empty());
        assert_eq!(buf.take(), None);
    }

    #[test]
    fn take_on_empty_buffer_emits_nothing() {
        let mut buf = TranscriptBuffer::new(1000);
        assert_eq!(buf.take(), None);
    }

    #[test]
    fn over_limit_trips_past_threshold() {
        let mut buf = TranscriptBuffer::new(10);
        buf.append("short");
        assert!(!buf.over_limit());
        buf.append("and then some more");
        assert!(buf.over_limit());
    }

    #[test]
    fn clear_discards_without_emitting() {
        let mut buf = TranscriptBuffer::new(1000);
        buf.append("discard me");
        buf.clear();
        assert_eq!(buf.take(), None);
    }
}
