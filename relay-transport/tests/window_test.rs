use relay_transport::{RETRY_BUDGET, RetryVerdict, SendWindow, plan_segments};

#[test]
fn test_chunking_counts_and_sizes() {
    let content = vec![7u8; 2345];
    let plan = plan_segments(&content, 500, 100).unwrap();

    assert_eq!(plan.segments.len(), 5);
    assert_eq!(plan.segments[0].seq, 100);
    assert_eq!(plan.segments[4].seq, 104);
    assert_eq!(plan.segments[0].payload.len(), 500);
    assert_eq!(plan.segments[4].payload.len(), 345);
    assert_eq!(plan.end_seq, 105);
}

#[test]
fn test_chunking_exact_multiple_and_empty() {
    let plan = plan_segments(&[1u8; 1000], 500, 1).unwrap();
    assert_eq!(plan.segments.len(), 2);
    assert_eq!(plan.segments[1].payload.len(), 500);
    assert_eq!(plan.end_seq, 3);

    let empty = plan_segments(&[], 500, 9).unwrap();
    assert!(empty.segments.is_empty());
    assert_eq!(empty.end_seq, 9);
}

#[test]
fn test_chunking_rejects_zero_payload_length() {
    assert!(plan_segments(&[1, 2, 3], 0, 1).is_err());
}

#[test]
fn test_chunking_preserves_content() {
    let content: Vec<u8> = (0u32..1234).map(|i| i as u8).collect();
    let plan = plan_segments(&content, 100, 1).unwrap();
    let rebuilt: Vec<u8> = plan
        .segments
        .iter()
        .flat_map(|segment| segment.payload.iter().copied())
        .collect();
    assert_eq!(rebuilt, content);
}

#[test]
fn test_ack_matches_by_sequence() {
    let mut window = SendWindow::new([10, 11, 12]);

    assert!(window.record_ack(11));
    assert!(!window.record_ack(11), "duplicate ACK is not fresh");
    assert!(!window.record_ack(99), "unknown sequence is rejected");
    assert_eq!(window.unacked().as_slice(), &[10, 12]);
    assert!(!window.is_settled());

    assert!(window.record_ack(10));
    assert!(window.record_ack(12));
    assert!(window.is_settled());
    assert_eq!(window.abandoned(), 0);
}

#[test]
fn test_retry_budget_exhaustion() {
    let mut window = SendWindow::new([5]);

    for _ in 0..RETRY_BUDGET {
        assert_eq!(window.note_retransmit(5), RetryVerdict::Retry);
    }
    assert_eq!(window.note_retransmit(5), RetryVerdict::Exhausted);
    assert!(window.is_settled(), "abandoned packet settles the window");
    assert_eq!(window.abandoned(), 1);
    assert!(window.unacked().is_empty());
}

#[test]
fn test_retransmit_of_acked_packet_is_refused() {
    let mut window = SendWindow::new([1, 2]);
    assert!(window.record_ack(1));
    assert_eq!(window.note_retransmit(1), RetryVerdict::Exhausted);
    assert_eq!(window.note_retransmit(2), RetryVerdict::Retry);
}

#[test]
fn test_late_ack_lands_after_retransmits() {
    let mut window = SendWindow::new([20, 21]);
    assert_eq!(window.note_retransmit(20), RetryVerdict::Retry);
    assert_eq!(window.note_retransmit(20), RetryVerdict::Retry);
    assert!(window.record_ack(20), "late ACK still settles the slot");
    assert_eq!(window.unacked().as_slice(), &[21]);
}
