use crate::message::Message;

/// Bounded, strictly-ordered accumulator owned exclusively by the Batcher's
/// main loop. Limits are enforced by triggering a flush, never by rejecting
/// an `add`.
pub struct Buffer {
    messages: Vec<Message>,
    byte_size: usize,
    max_elements: usize,
    max_size: usize,
}

impl Buffer {
    pub fn new(max_elements: usize, max_size: usize) -> Self {
        Self {
            messages: Vec::new(),
            byte_size: 0,
            max_elements,
            max_size,
        }
    }

    pub fn add(&mut self, msg: Message) {
        self.byte_size += msg.size();
        self.messages.push(msg);
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn byte_size(&self) -> usize {
        self.byte_size
    }

    pub fn count_limit_reached(&self) -> bool {
        self.messages.len() >= self.max_elements
    }

    pub fn size_limit_reached(&self) -> bool {
        self.byte_size >= self.max_size
    }

    /// Takes the current contents and resets the buffer to empty, atomically
    /// from the caller's point of view (single-threaded owner, no `.await`
    /// inside).
    pub fn snapshot_and_reset(&mut self) -> Vec<Message> {
        self.byte_size = 0;
        std::mem::take(&mut self.messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Uid;
    use serde_json::json;

    fn doc(n: u8) -> Message {
        Message::document(Uid::from_bytes([n; 16]), json!({ "n": n }))
    }

    #[test]
    fn count_limit_triggers_at_exact_threshold() {
        let mut buf = Buffer::new(3, 1_000_000);
        assert!(!buf.count_limit_reached());
        buf.add(doc(1));
        buf.add(doc(2));
        assert!(!buf.count_limit_reached());
        buf.add(doc(3));
        assert!(buf.count_limit_reached());
    }

    #[test]
    fn size_limit_accounts_serialized_bytes() {
        let mut buf = Buffer::new(1_000, 10);
        let m = doc(1);
        let size = m.size();
        buf.add(m);
        assert_eq!(buf.byte_size(), size);
        assert_eq!(buf.size_limit_reached(), size >= 10);
    }

    #[test]
    fn snapshot_and_reset_is_idempotent_when_empty() {
        let mut buf = Buffer::new(10, 10_000);
        buf.add(doc(1));
        buf.add(doc(2));
        let first = buf.snapshot_and_reset();
        assert_eq!(first.len(), 2);
        assert!(buf.is_empty());
        assert_eq!(buf.byte_size(), 0);

        let second = buf.snapshot_and_reset();
        assert!(second.is_empty());
        assert_eq!(buf.byte_size(), 0);
    }

    #[test]
    fn oversize_singleton_is_still_admitted() {
        let mut buf = Buffer::new(10, 1);
        buf.add(doc(1));
        assert_eq!(buf.len(), 1);
        assert!(buf.size_limit_reached());
    }
}
