//! Line configuration and relaying against a pseudo-terminal.
//!
//! The slave side of a pty is a real tty, so `termios` calls behave as on a
//! serial port.  Modem-control and `serial_struct` ioctls are not supported
//! by ptys and are not exercised here beyond their failure path.

#![cfg(target_os = "linux")]

use std::fs::File;
use std::io::{Read, Write};
use std::net::{Shutdown, TcpListener, TcpStream};

use nix::pty::{openpty, OpenptyResult};
use nix::sys::termios::{LocalFlags, OutputFlags};

use serialtalk::application::{ConfigureError, ConfigureLineUseCase, EndReason, TransferLoop};
use serialtalk::domain::RelayOptions;
use serialtalk::infrastructure::relay_port::mock::RecordingObserver;
use serialtalk::infrastructure::{Peer, PollPort, SerialDevice};
use serialtalk_core::{
    Capabilities, InboundCarriageReturn, LineConfig, OutboundNewline, Parity, Timeout,
    TranslationPolicy,
};

const LINUX: Capabilities = Capabilities {
    supports_custom_baud: true,
};

fn pty_device() -> (SerialDevice, File) {
    let OpenptyResult { master, slave } = openpty(None, None).expect("openpty");
    (SerialDevice::from_file(File::from(slave), "pty"), File::from(master))
}

fn configure(device: &mut SerialDevice, config: &LineConfig) -> Result<(), ConfigureError> {
    ConfigureLineUseCase::new(LINUX, false)
        .run(device, config, &mut RecordingObserver::default())
        .map(|_| ())
}

#[test]
fn test_standard_rates_round_trip_independently() {
    // Arrange
    let (mut device, _master) = pty_device();
    let config = LineConfig {
        input_baud: 19_200,
        output_baud: 115_200,
        ..Default::default()
    };

    // Act
    configure(&mut device, &config).expect("configure");

    // Assert
    assert_eq!(device.speeds().expect("speeds"), (Some(19_200), Some(115_200)));
}

#[test]
fn test_line_is_raw_after_configuration() {
    let (mut device, _master) = pty_device();

    configure(&mut device, &LineConfig::default()).expect("configure");

    let attrs = device.attributes().expect("attributes");
    assert!(!attrs.local_flags.contains(LocalFlags::ICANON));
    assert!(!attrs.local_flags.contains(LocalFlags::ECHO));
    assert!(!attrs.output_flags.contains(OutputFlags::OPOST));
}

#[test]
fn test_reapplying_config_gives_identical_attributes() {
    // Arrange
    let (mut device, _master) = pty_device();
    let config = LineConfig {
        input_baud: 57_600,
        parity: Parity::Even,
        hangup_on_close: true,
        ..Default::default()
    };

    // Act
    configure(&mut device, &config).expect("first");
    let first = device.attributes().expect("attributes");
    configure(&mut device, &config).expect("second");
    let second = device.attributes().expect("attributes");

    // Assert
    assert_eq!(first.input_flags, second.input_flags);
    assert_eq!(first.output_flags, second.output_flags);
    assert_eq!(first.control_flags, second.control_flags);
    assert_eq!(first.local_flags, second.local_flags);
    assert_eq!(first.control_chars, second.control_chars);
}

#[test]
fn test_custom_rate_on_pty_fails_at_divisor_step() {
    // A pty accepts the placeholder rate but has no serial_struct.
    let (mut device, _master) = pty_device();
    let config = LineConfig {
        input_baud: 250_000,
        ..Default::default()
    };

    let result = configure(&mut device, &config);

    assert!(matches!(result, Err(ConfigureError::Divisor { rate: 250_000, .. })));
}

#[test]
fn test_relay_between_pty_and_tcp_peer() {
    // Arrange: the pty master plays the device, a TCP client plays the peer.
    let (mut device, mut master) = pty_device();
    configure(&mut device, &LineConfig::default()).expect("configure");
    master.write_all(b"X\rY").expect("device output");

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let mut client = TcpStream::connect(listener.local_addr().expect("addr")).expect("connect");
    let (stream, addr) = listener.accept().expect("accept");
    client.write_all(b"A\nB").expect("client write");
    client.shutdown(Shutdown::Write).expect("shutdown");

    let options = RelayOptions {
        translation: TranslationPolicy {
            outbound: OutboundNewline::CrLf,
            inbound: InboundCarriageReturn::CrLf,
        },
        timeout: Timeout::Millis(50),
        idle_after_close_ms: 100,
        ..Default::default()
    };

    // Act
    let mut peer = Peer::socket(stream, addr);
    let summary = {
        let mut port = PollPort::new(&mut device, &mut peer);
        TransferLoop::new(options)
            .run(&mut port, &mut RecordingObserver::default())
            .expect("relay")
    };
    drop(peer);

    // Assert
    let mut to_device = [0u8; 4];
    master.read_exact(&mut to_device).expect("device input");
    assert_eq!(&to_device, b"A\r\nB");

    let mut to_client = Vec::new();
    client.read_to_end(&mut to_client).expect("client read");
    assert_eq!(to_client, b"X\r\nY");

    assert_eq!(summary.to_serial, 4);
    assert_eq!(summary.to_peer, 4);
    assert_eq!(summary.reason, EndReason::DrainExpired);
}

#[test]
fn test_session_ends_when_device_goes_away() {
    // Arrange: configure the line, then close the master as if the device
    // were unplugged.  The TCP peer stays connected and silent.
    let (mut device, master) = pty_device();
    configure(&mut device, &LineConfig::default()).expect("configure");
    drop(master);

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let _client = TcpStream::connect(listener.local_addr().expect("addr")).expect("connect");
    let (stream, addr) = listener.accept().expect("accept");

    let options = RelayOptions {
        timeout: Timeout::Millis(100),
        idle_after_close_ms: 300,
        ..Default::default()
    };

    // Act
    let mut peer = Peer::socket(stream, addr);
    let mut port = PollPort::new(&mut device, &mut peer);
    let summary = TransferLoop::new(options)
        .run(&mut port, &mut RecordingObserver::default())
        .expect("relay");

    // Assert
    assert_eq!(summary.reason, EndReason::SerialHangup);
    assert_eq!(summary.to_peer, 0);
}
