use crate::error::{TransportError, TransportResult};

/// One planned DATA segment of a transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub seq: u32,
    pub payload: Vec<u8>,
}

/// The full transmission plan for one file: every DATA segment in sequence
/// order plus the sequence number the END packet will carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentPlan {
    pub segments: Vec<Segment>,
    pub end_seq: u32,
}

/// Splits `content` into segments of at most `payload_len` bytes.
///
/// Sequence numbers ascend by one per segment starting at `initial_seq`; the
/// last segment may be shorter. An empty file plans zero DATA segments and an
/// END at `initial_seq`.
pub fn plan_segments(
    content: &[u8],
    payload_len: usize,
    initial_seq: u32,
) -> TransportResult<SegmentPlan> {
    if payload_len == 0 {
        return Err(TransportError::InvalidPayloadLength);
    }

    let segments: Vec<Segment> = content
        .chunks(payload_len)
        .enumerate()
        .map(|(i, chunk)| Segment {
            seq: initial_seq.wrapping_add(i as u32),
            payload: chunk.to_vec(),
        })
        .collect();

    let end_seq = initial_seq.wrapping_add(segments.len() as u32);
    Ok(SegmentPlan { segments, end_seq })
}
