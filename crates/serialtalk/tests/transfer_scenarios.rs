//! Transfer loop scenarios driven through the public API with the scripted
//! relay port.

use serialtalk::application::{EndReason, TransferLoop};
use serialtalk::domain::RelayOptions;
use serialtalk::infrastructure::relay_port::mock::{MockRelayPort, RecordingObserver};
use serialtalk_core::{InboundCarriageReturn, OutboundNewline, Timeout, TranslationPolicy};

fn relay(options: RelayOptions, port: &mut MockRelayPort) -> serialtalk::application::SessionSummary {
    TransferLoop::new(options)
        .run(port, &mut RecordingObserver::default())
        .expect("relay session")
}

#[test]
fn test_zero_timeout_makes_one_non_blocking_wait() {
    // Arrange: more device data is pending than one pass can move.
    let mut port = MockRelayPort::new();
    port.push_serial_bytes(b"s1");
    let options = RelayOptions {
        timeout: Timeout::Immediate,
        ..Default::default()
    };

    // Act
    let summary = relay(options, &mut port);

    // Assert
    assert_eq!(port.wait_count(), 1);
    assert_eq!(port.waits()[0].1, Timeout::Immediate);
    assert_eq!(port.peer_output(), b"s");
    assert_eq!(summary.reason, EndReason::SinglePass);
}

#[test]
fn test_zero_timeout_with_nothing_pending_still_ends() {
    let mut port = MockRelayPort::new();
    let options = RelayOptions {
        timeout: Timeout::Immediate,
        ..Default::default()
    };

    let summary = relay(options, &mut port);

    assert_eq!(port.wait_count(), 1);
    assert_eq!(summary.to_serial + summary.to_peer, 0);
}

#[test]
fn test_infinite_timeout_never_ends_on_idle() {
    // Arrange: a long run of empty wakeups, then a hang-up.
    let mut port = MockRelayPort::new();
    port.push_idle(500);
    port.push_peer_hangup();

    // Act
    let summary = relay(RelayOptions::default(), &mut port);

    // Assert
    assert_eq!(port.wait_count(), 501);
    assert_eq!(summary.reason, EndReason::PeerHangup);
}

#[test]
fn test_bounded_timeout_without_hangup_keeps_running() {
    let mut port = MockRelayPort::new();
    port.push_idle(50);
    port.push_peer_hangup();
    let options = RelayOptions {
        timeout: Timeout::Millis(20),
        ..Default::default()
    };

    let summary = relay(options, &mut port);

    // 50 idle ticks while active, the hang-up, then one wait to spend the
    // zero idle budget.
    assert_eq!(port.wait_count(), 52);
    assert_eq!(summary.reason, EndReason::DrainExpired);
}

#[test]
fn test_drain_window_is_spent_in_timeout_steps() {
    // Arrange: 50 ms waits, 200 ms window.
    let mut port = MockRelayPort::new();
    port.push_peer_hangup();
    let options = RelayOptions {
        timeout: Timeout::Millis(50),
        idle_after_close_ms: 200,
        ..Default::default()
    };

    // Act
    let summary = relay(options, &mut port);

    // Assert: one hang-up wait, then four idle waits with the peer disarmed.
    assert_eq!(port.wait_count(), 5);
    assert!(port.waits()[0].0);
    assert!(port.waits()[1..].iter().all(|(armed, _)| !armed));
    assert_eq!(summary.reason, EndReason::DrainExpired);
}

#[test]
fn test_serial_data_during_drain_reaches_peer() {
    let mut port = MockRelayPort::new();
    port.push_peer_bytes(b"AT\n");
    port.push_peer_hangup();
    port.push_serial_bytes(b"OK\r");
    let options = RelayOptions {
        timeout: Timeout::Millis(10),
        idle_after_close_ms: 10,
        translation: TranslationPolicy {
            outbound: OutboundNewline::Cr,
            inbound: InboundCarriageReturn::CrLf,
        },
        ..Default::default()
    };

    let summary = relay(options, &mut port);

    assert_eq!(port.serial_output(), b"AT\r");
    assert_eq!(port.peer_output(), b"OK\r\n");
    assert_eq!(summary.to_serial, 3);
    assert_eq!(summary.to_peer, 4);
}

#[test]
fn test_bytes_keep_their_order_in_both_directions() {
    // Arrange
    let mut port = MockRelayPort::new();
    port.push_serial_bytes(b"12");
    port.push_peer_bytes(b"ab");
    port.push_serial_bytes(b"34");
    port.push_peer_bytes(b"cd");
    port.push_peer_hangup();

    // Act
    relay(RelayOptions::default(), &mut port);

    // Assert
    assert_eq!(port.peer_output(), b"1234");
    assert_eq!(port.serial_output(), b"abcd");
}
