use std::collections::BTreeMap;

/// Outcome of offering a DATA payload to the buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insert {
    /// First time this sequence was seen; the payload was kept.
    Fresh,
    /// The sequence was already buffered; the payload was discarded.
    Duplicate,
}

/// A sequence-keyed reorder buffer for the receive path.
///
/// The sender's window discipline delivers in order when nothing is lost,
/// but retransmissions can arrive both late and more than once. Payloads are
/// held keyed by sequence and written out in sequence order once the END
/// packet closes the session, so duplicated or reordered arrivals cannot
/// corrupt the output file.
#[derive(Debug, Default)]
pub struct ReorderBuffer {
    segments: BTreeMap<u32, Vec<u8>>,
    bytes: u64,
}

impl ReorderBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offers one DATA payload. Duplicates (by sequence) are discarded.
    pub fn insert(&mut self, seq: u32, payload: Vec<u8>) -> Insert {
        use std::collections::btree_map::Entry;
        match self.segments.entry(seq) {
            Entry::Occupied(_) => Insert::Duplicate,
            Entry::Vacant(slot) => {
                self.bytes += payload.len() as u64;
                slot.insert(payload);
                Insert::Fresh
            }
        }
    }

    /// Unique payload bytes buffered so far.
    pub fn bytes(&self) -> u64 {
        self.bytes
    }

    /// Number of distinct sequences buffered.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Consumes the buffer, yielding payloads in ascending sequence order.
    pub fn into_ordered(self) -> impl Iterator<Item = (u32, Vec<u8>)> {
        self.segments.into_iter()
    }
}
