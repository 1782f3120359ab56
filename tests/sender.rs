use netstack::{ByteStream, SegmentFlags, TcpAck, TcpSegment, TcpSender, Wrap32};

const RTO: u64 = 1000;

fn sender(capacity: usize, isn: u32) -> TcpSender {
    TcpSender::new(ByteStream::new(capacity), Wrap32::new(isn), RTO)
}

fn collect_push(sender: &mut TcpSender) -> Vec<TcpSegment> {
    let mut sent = Vec::new();
    sender.push(|seg| sent.push(seg.clone()));
    sent
}

fn collect_tick(sender: &mut TcpSender, ms: u64) -> Vec<TcpSegment> {
    let mut sent = Vec::new();
    sender.tick(ms, |seg| sent.push(seg.clone()));
    sent
}

fn ack(ackno: u32, window_size: u16) -> TcpAck {
    TcpAck {
        ackno: Some(Wrap32::new(ackno)),
        window_size,
        rst: false,
    }
}

#[test]
fn syn_goes_out_alone_under_initial_window() {
    let mut tx = sender(64, 100);
    tx.writer().push(b"data waits for the handshake");

    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].syn());
    assert!(!sent[0].fin());
    assert_eq!(sent[0].seqno, Wrap32::new(100));
    assert!(sent[0].payload.is_empty());
    assert_eq!(tx.sequence_numbers_in_flight(), 1);

    // window still full of the SYN: nothing more to send
    assert!(collect_push(&mut tx).is_empty());
}

#[test]
fn syn_and_fin_share_the_opening_segment() {
    let mut tx = sender(64, 0);
    tx.writer().close();

    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    let seg = &sent[0];
    assert!(seg.syn() && seg.fin() && !seg.rst());
    assert_eq!(seg.seqno, Wrap32::new(0));
    assert!(seg.payload.is_empty());
    assert_eq!(seg.sequence_length(), 2);
    assert_eq!(tx.sequence_numbers_in_flight(), 2);

    tx.receive(&ack(2, 1000));
    assert_eq!(tx.sequence_numbers_in_flight(), 0);
    // a stopped timer never fires
    assert!(collect_tick(&mut tx, 10 * RTO).is_empty());
}

#[test]
fn data_flows_once_the_window_opens() {
    let mut tx = sender(64, 0);
    tx.writer().push(b"hello");
    collect_push(&mut tx); // SYN
    tx.receive(&ack(1, 5));

    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, b"hello");
    assert_eq!(sent[0].seqno, Wrap32::new(1));
    assert_eq!(tx.sequence_numbers_in_flight(), 5);
}

#[test]
fn window_caps_the_bytes_in_flight() {
    let mut tx = sender(64, 0);
    tx.writer().push(b"abcdefghij");
    collect_push(&mut tx);
    tx.receive(&ack(1, 4));

    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, b"abcd");
    assert_eq!(tx.sequence_numbers_in_flight(), 4);
    assert!(collect_push(&mut tx).is_empty());

    // acking frees window for the rest
    tx.receive(&ack(5, 4));
    let sent = collect_push(&mut tx);
    assert_eq!(sent[0].payload, b"efgh");
}

#[test]
fn large_writes_split_at_max_payload_size() {
    let mut tx = sender(4096, 0);
    tx.writer().push(&[b'x'; 2000]);
    collect_push(&mut tx);
    tx.receive(&ack(1, 10_000));

    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].payload.len(), netstack::tcp::sender::MAX_PAYLOAD_SIZE);
    assert_eq!(sent[1].payload.len(), 2000 - netstack::tcp::sender::MAX_PAYLOAD_SIZE);
}

#[test]
fn fin_waits_for_window_space_after_the_handshake() {
    let mut tx = sender(64, 0);
    tx.writer().push(b"ab");
    collect_push(&mut tx);
    tx.receive(&ack(1, 2));
    tx.writer().close();

    // window fits the payload exactly; the FIN has to wait
    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, b"ab");
    assert!(!sent[0].fin());

    tx.receive(&ack(3, 2));
    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].fin());
    assert!(sent[0].payload.is_empty());
    assert_eq!(sent[0].seqno, Wrap32::new(3));
}

#[test]
fn retransmission_backs_off_exponentially() {
    let mut tx = sender(64, 0);
    collect_push(&mut tx); // SYN
    tx.receive(&ack(1, 1));
    tx.writer().push(b"x");
    let first = collect_push(&mut tx);
    assert_eq!(first.len(), 1);

    assert!(collect_tick(&mut tx, RTO - 1).is_empty());

    let retx = collect_tick(&mut tx, 1);
    assert_eq!(retx.len(), 1);
    assert_eq!(retx[0], first[0]);
    assert_eq!(tx.consecutive_retransmissions(), 1);

    // the doubled timeout has to elapse in full before the next one
    assert!(collect_tick(&mut tx, 2 * RTO - 1).is_empty());
    let retx = collect_tick(&mut tx, 1);
    assert_eq!(retx.len(), 1);
    assert_eq!(tx.consecutive_retransmissions(), 2);
}

#[test]
fn ack_progress_resets_the_backoff() {
    let mut tx = sender(64, 0);
    collect_push(&mut tx);
    tx.receive(&ack(1, 2));
    tx.writer().push(b"ab");
    collect_push(&mut tx);

    collect_tick(&mut tx, RTO);
    assert_eq!(tx.consecutive_retransmissions(), 1);

    tx.receive(&ack(2, 2)); // partial progress
    assert_eq!(tx.consecutive_retransmissions(), 0);
    // timer restarted at the initial RTO
    assert!(collect_tick(&mut tx, RTO - 1).is_empty());
    assert_eq!(collect_tick(&mut tx, 1).len(), 1);
}

#[test]
fn zero_window_probe_does_not_back_off() {
    let mut tx = sender(64, 0);
    collect_push(&mut tx);
    tx.receive(&ack(1, 0));
    tx.writer().push(b"probe");

    // zero window is treated as one byte for probing
    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].payload, b"p");

    let retx = collect_tick(&mut tx, RTO);
    assert_eq!(retx.len(), 1);
    assert_eq!(tx.consecutive_retransmissions(), 0);
    // timeout unchanged: the next expiry is one plain RTO away
    let retx = collect_tick(&mut tx, RTO);
    assert_eq!(retx.len(), 1);
    assert_eq!(tx.consecutive_retransmissions(), 0);
}

#[test]
fn earliest_outstanding_segment_is_the_one_retransmitted() {
    let mut tx = sender(64, 0);
    collect_push(&mut tx);
    tx.receive(&ack(1, 8));
    tx.writer().push(b"abcd");
    collect_push(&mut tx);
    tx.writer().push(b"efgh");
    let second = collect_push(&mut tx);
    assert_eq!(second.len(), 1);

    let retx = collect_tick(&mut tx, RTO);
    assert_eq!(retx.len(), 1);
    assert_eq!(retx[0].payload, b"abcd");
}

#[test]
fn ack_of_unsent_data_is_ignored() {
    let mut tx = sender(64, 0);
    collect_push(&mut tx); // SYN only: next seqno is 1
    tx.receive(&ack(100, 10));
    assert_eq!(tx.sequence_numbers_in_flight(), 1);

    // a valid ack still lands afterwards
    tx.receive(&ack(1, 10));
    assert_eq!(tx.sequence_numbers_in_flight(), 0);
}

#[test]
fn stream_error_turns_into_a_rst_segment() {
    let mut tx = sender(64, 7);
    collect_push(&mut tx);
    tx.stream_mut().set_error();

    let sent = collect_push(&mut tx);
    assert_eq!(sent.len(), 1);
    assert!(sent[0].rst());
    assert_eq!(sent[0].sequence_length(), 0);
    assert_eq!(sent[0].seqno, Wrap32::new(8));

    assert!(tx.make_empty_message().rst());
}

#[test]
fn peer_rst_poisons_the_outbound_stream() {
    let mut tx = sender(64, 0);
    tx.receive(&TcpAck {
        ackno: None,
        window_size: 0,
        rst: true,
    });
    assert!(tx.stream().has_error());
}

#[test]
fn make_empty_message_tracks_next_seqno() {
    let mut tx = sender(64, 42);
    assert_eq!(tx.make_empty_message().seqno, Wrap32::new(42));
    assert_eq!(tx.make_empty_message().sequence_length(), 0);

    collect_push(&mut tx); // SYN
    assert_eq!(tx.make_empty_message().seqno, Wrap32::new(43));
}

#[test]
fn flags_survive_the_wire_record() {
    // sanity on the flag set itself
    let seg = TcpSegment {
        seqno: Wrap32::new(0),
        flags: SegmentFlags::SYN | SegmentFlags::FIN,
        payload: b"abc".to_vec(),
    };
    assert_eq!(seg.sequence_length(), 5);
    assert!(!seg.rst());
}
