use smallvec::SmallVec;

/// Maximum number of retransmissions per DATA packet.
pub const RETRY_BUDGET: u32 = 5;

/// Outcome of asking to retransmit a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryVerdict {
    /// The packet still has budget; send it again.
    Retry,
    /// The budget is spent; the packet is abandoned and the session moves on.
    Exhausted,
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    seq: u32,
    acked: bool,
    retries: u32,
    abandoned: bool,
}

/// Tracks one window of outstanding DATA packets.
///
/// Acknowledgements are matched by sequence number, never by window
/// position, so a late or duplicated ACK for a retransmitted packet lands on
/// the right slot. A window is settled once every slot is either acked or
/// abandoned after [`RETRY_BUDGET`] retransmissions.
#[derive(Debug, Clone)]
pub struct SendWindow {
    slots: Vec<Slot>,
}

impl SendWindow {
    pub fn new(seqs: impl IntoIterator<Item = u32>) -> Self {
        Self {
            slots: seqs
                .into_iter()
                .map(|seq| Slot {
                    seq,
                    acked: false,
                    retries: 0,
                    abandoned: false,
                })
                .collect(),
        }
    }

    /// Records an ACK. Returns `true` when the sequence belongs to this
    /// window and was not already acknowledged.
    pub fn record_ack(&mut self, seq: u32) -> bool {
        match self.slots.iter_mut().find(|slot| slot.seq == seq) {
            Some(slot) if !slot.acked => {
                slot.acked = true;
                true
            }
            _ => false,
        }
    }

    /// Sequences that still need retransmission, in window order.
    pub fn unacked(&self) -> SmallVec<[u32; 8]> {
        self.slots
            .iter()
            .filter(|slot| !slot.acked && !slot.abandoned)
            .map(|slot| slot.seq)
            .collect()
    }

    /// Charges one retransmission against `seq`'s budget.
    ///
    /// The sixth attempt is refused: the slot is abandoned and
    /// [`RetryVerdict::Exhausted`] is returned.
    pub fn note_retransmit(&mut self, seq: u32) -> RetryVerdict {
        let Some(slot) = self.slots.iter_mut().find(|slot| slot.seq == seq) else {
            return RetryVerdict::Exhausted;
        };
        if slot.acked || slot.abandoned {
            return RetryVerdict::Exhausted;
        }
        if slot.retries >= RETRY_BUDGET {
            slot.abandoned = true;
            return RetryVerdict::Exhausted;
        }
        slot.retries += 1;
        RetryVerdict::Retry
    }

    /// Whether every packet in the window is acked or abandoned.
    pub fn is_settled(&self) -> bool {
        self.slots.iter().all(|slot| slot.acked || slot.abandoned)
    }

    /// Number of packets abandoned after exhausting their budget.
    pub fn abandoned(&self) -> usize {
        self.slots.iter().filter(|slot| slot.abandoned).count()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
