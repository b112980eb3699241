//! serialtalk entry point.
//!
//! Opens a serial device, configures the line, and relays bytes between the
//! device and either this terminal or one TCP client at a time.
//!
//! # Usage
//!
//! ```text
//! serialtalk [OPTIONS] <DEVICE>
//!
//!   -b <RATE>   baud rate [default: 9600]
//!   -o <RATE>   output baud rate, 0 = same as -b
//!   -t <MS>     poll timeout in milliseconds, -1 = forever, 0 = one pass
//!   -B <BITS>   data bits: 5, 6, 7 or 8
//!   -s          print modem line state on every timeout (needs -t)
//!   -v          verbose: print the parameters
//!   -d / -D     clear / set DTR
//!   -r / -R     clear / set RTS
//!   -c / -C     clear / set CTS
//!   -p / -P     odd / even parity
//!   -n          non-canonical stdin (send each key at once)
//!   -N          no local echo
//!   -x / -X     translate typed LF to CR LF / to CR
//!   -i / -I     translate received CR to CR LF / to LF
//!   -y          send ctrl-c and exit
//!   -T          print timestamped byte traces
//!   -H          lower modem lines on close (HUPCL)
//!   -w <MS>     keep reading the device this long after input ends
//!   -l <PORT>   serve TCP clients on PORT instead of stdin/stdout
//!   -F          detach into the background after setup
//!   --config <FILE>  TOML defaults file
//! ```
//!
//! Exit with ctrl-c.  Diagnostics go to stderr; set `RUST_LOG=debug` for more.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use serialtalk::application::{send_interrupt, ConfigureLineUseCase, EndReason, TransferLoop};
use serialtalk::domain::{PeerMode, RelayConfig, RelayOptions, StdinMode};
use serialtalk::infrastructure::daemon;
use serialtalk::infrastructure::network;
use serialtalk::infrastructure::storage::{load_config_from, FileConfig};
use serialtalk::infrastructure::terminal::StdinModeGuard;
use serialtalk::infrastructure::{Peer, PollPort, SerialDevice, StderrTrace};
use serialtalk_core::{
    Capabilities, DataBits, InboundCarriageReturn, ModemLines, OutboundNewline, Parity, Timeout,
};

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Talk to a serial device from a terminal or over TCP.
#[derive(Debug, Parser)]
#[command(
    name = "serialtalk",
    about = "Relay bytes between a serial device and a terminal or a TCP peer",
    version
)]
struct Cli {
    /// Serial device path, e.g. /dev/ttyUSB0.
    device: PathBuf,

    /// Baud rate (input, and output unless -o is given).
    #[arg(short = 'b', long = "baud", value_name = "RATE")]
    baud: Option<u32>,

    /// Output baud rate; 0 means the same as -b.
    #[arg(short = 'o', long = "output-baud", value_name = "RATE")]
    output_baud: Option<u32>,

    /// Poll timeout in milliseconds: negative waits forever, 0 makes a single
    /// non-blocking pass.
    #[arg(short = 't', long = "timeout", value_name = "MS", allow_negative_numbers = true)]
    timeout: Option<i64>,

    /// Number of data bits.
    #[arg(short = 'B', long = "bits", value_parser = clap::value_parser!(u8).range(5..=8))]
    bits: Option<u8>,

    /// Show the modem line state after every timeout.
    #[arg(short = 's', long = "show-state")]
    show_state: bool,

    /// Print the line parameters before relaying.
    #[arg(short = 'v', long)]
    verbose: bool,

    /// Clear DTR.
    #[arg(short = 'd', long = "clear-dtr")]
    clear_dtr: bool,

    /// Set DTR.
    #[arg(short = 'D', long = "set-dtr")]
    set_dtr: bool,

    /// Clear RTS.
    #[arg(short = 'r', long = "clear-rts")]
    clear_rts: bool,

    /// Set RTS.
    #[arg(short = 'R', long = "set-rts")]
    set_rts: bool,

    /// Clear CTS.
    #[arg(short = 'c', long = "clear-cts")]
    clear_cts: bool,

    /// Set CTS.
    #[arg(short = 'C', long = "set-cts")]
    set_cts: bool,

    /// Odd parity.
    #[arg(short = 'p', long = "odd", conflicts_with = "even")]
    odd: bool,

    /// Even parity.
    #[arg(short = 'P', long = "even")]
    even: bool,

    /// Non-canonical stdin: send each key immediately instead of per line.
    #[arg(short = 'n', long = "raw-input")]
    noncanonical: bool,

    /// No local echo of typed characters.
    #[arg(short = 'N', long = "no-echo")]
    noecho: bool,

    /// Translate LF to CR LF towards the device.
    #[arg(short = 'x', long = "lf-to-crlf", conflicts_with = "lf_to_cr")]
    lf_to_crlf: bool,

    /// Translate LF to CR towards the device.
    #[arg(short = 'X', long = "lf-to-cr")]
    lf_to_cr: bool,

    /// Translate CR to CR LF from the device.
    #[arg(short = 'i', long = "cr-to-crlf", conflicts_with = "cr_to_lf")]
    cr_to_crlf: bool,

    /// Translate CR to LF from the device.
    #[arg(short = 'I', long = "cr-to-lf")]
    cr_to_lf: bool,

    /// Send ctrl-c to the device and exit.
    #[arg(short = 'y', long = "interrupt")]
    interrupt: bool,

    /// Print a timestamped line for every byte relayed.
    #[arg(short = 'T', long = "trace")]
    trace: bool,

    /// Lower the modem control lines when the device is closed.
    #[arg(short = 'H', long = "hangup")]
    hangup: bool,

    /// Keep reading the device this many milliseconds after input ends.
    #[arg(short = 'w', long = "wait", value_name = "MS")]
    wait: Option<u32>,

    /// Serve TCP clients on this port instead of stdin/stdout.
    #[arg(short = 'l', long = "listen", value_name = "PORT")]
    listen: Option<u16>,

    /// Detach into the background once the device is configured.
    #[arg(short = 'F', long = "background")]
    background: bool,

    /// TOML file with default line and relay settings.
    #[arg(long = "config", value_name = "FILE", env = "SERIALTALK_CONFIG")]
    config: Option<PathBuf>,
}

impl Cli {
    /// Merges the parsed arguments over the file defaults into a
    /// [`RelayConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the file names an unknown modem line.
    fn into_relay_config(self, file: &FileConfig) -> anyhow::Result<RelayConfig> {
        let mut line = file
            .line
            .to_line_config()
            .context("invalid [line] section in config file")?;

        if let Some(baud) = self.baud {
            line.input_baud = baud;
        }
        if let Some(output) = self.output_baud {
            line.output_baud = output;
        }
        if let Some(bits) = self.bits {
            line.data_bits = DataBits::try_from(bits)?;
        }
        if self.odd {
            line.parity = Parity::Odd;
        } else if self.even {
            line.parity = Parity::Even;
        }
        line.hangup_on_close |= self.hangup;

        for (flag, bit) in [
            (self.set_dtr, ModemLines::DTR),
            (self.set_rts, ModemLines::RTS),
            (self.set_cts, ModemLines::CTS),
        ] {
            if flag {
                line.set_lines.insert(bit);
            }
        }
        for (flag, bit) in [
            (self.clear_dtr, ModemLines::DTR),
            (self.clear_rts, ModemLines::RTS),
            (self.clear_cts, ModemLines::CTS),
        ] {
            if flag {
                line.clear_lines.insert(bit);
            }
        }

        let mut translation = file.relay.translation;
        if self.lf_to_crlf {
            translation.outbound = OutboundNewline::CrLf;
        } else if self.lf_to_cr {
            translation.outbound = OutboundNewline::Cr;
        }
        if self.cr_to_crlf {
            translation.inbound = InboundCarriageReturn::CrLf;
        } else if self.cr_to_lf {
            translation.inbound = InboundCarriageReturn::Lf;
        }

        let idle_after_close_ms = self.wait.unwrap_or(file.relay.wait_ms);
        let timeout = Timeout::from_millis(self.timeout.unwrap_or(file.relay.timeout_ms))
            .with_idle_fallback(idle_after_close_ms);

        let peer = match self.listen.or(file.relay.listen_port) {
            Some(port) => PeerMode::Listen(port),
            None => PeerMode::Terminal,
        };

        Ok(RelayConfig {
            device: self.device,
            line,
            relay: RelayOptions {
                translation,
                timeout,
                idle_after_close_ms,
                show_state: self.show_state || file.relay.show_state,
                trace_bytes: self.trace || file.relay.trace,
            },
            verbose: self.verbose,
            send_interrupt: self.interrupt,
            peer,
            background: self.background,
            stdin_mode: StdinMode {
                canonical: !(self.noncanonical || file.relay.stdin_noncanonical),
                echo: !(self.noecho || file.relay.stdin_noecho),
            },
        })
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

/// Program entry point.
///
/// # What happens at startup
///
/// 1. CLI arguments are parsed with `clap`.
/// 2. `tracing_subscriber` is initialised to write diagnostics to **stderr**
///    (stdout carries relayed data).  `RUST_LOG` overrides the default level
///    of `warn` (`info` with `-v`).
/// 3. The optional TOML defaults file is loaded and merged under the flags.
/// 4. [`run`] opens and configures the device, then relays.
///
/// Any error returned here is printed with its cause chain and the process
/// exits with status 1.
fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "info" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let file = match &cli.config {
        Some(path) => load_config_from(path)
            .with_context(|| format!("can't load config file {}", path.display()))?,
        None => FileConfig::default(),
    };
    let config = cli.into_relay_config(&file)?;

    run(&config)
}

/// Opens and configures the device, then relays until the session ends.
fn run(config: &RelayConfig) -> anyhow::Result<()> {
    let caps = Capabilities::for_current_platform();
    let mut trace = StderrTrace::stderr();

    if config.relay.show_state && config.relay.timeout == Timeout::Forever {
        warn!("state display needs a timeout (-t); it will only show at startup");
    }
    if config.background && config.peer == PeerMode::Terminal {
        warn!("background mode detaches from stdin/stdout; use it with -l");
    }

    if config.verbose {
        trace.opening(&config.device);
    }
    let mut device = SerialDevice::open(&config.device)?;
    if config.verbose {
        // An invalid plan is reported by the configurator below.
        if let Ok(plan) = config.line.plan(caps) {
            trace.parameters(&plan);
        }
    }

    ConfigureLineUseCase::new(caps, config.relay.show_state)
        .run(&mut device, &config.line, &mut trace)
        .with_context(|| format!("can't configure {}", config.device.display()))?;

    if config.send_interrupt {
        send_interrupt(&mut &device).context("can't send interrupt")?;
        return Ok(());
    }

    if config.background {
        daemon::detach()?;
    }

    let transfer = TransferLoop::new(config.relay);
    let reason = match config.peer {
        PeerMode::Terminal => {
            let _stdin_mode = StdinModeGuard::apply(config.stdin_mode)?;
            let mut peer = Peer::stdio().context("can't duplicate stdin/stdout")?;
            let mut relay = PollPort::new(&mut device, &mut peer);
            transfer.run(&mut relay, &mut trace)?.reason
        }
        PeerMode::Listen(port) => {
            let listener = network::bind(port)?;
            // Returns only once the device has gone away.
            network::serve(&listener, |stream, addr| {
                let mut peer = Peer::socket(stream, addr);
                let mut relay = PollPort::new(&mut device, &mut peer);
                transfer.run(&mut relay, &mut trace)
            })?;
            EndReason::SerialHangup
        }
    };

    if reason == EndReason::SerialHangup {
        anyhow::bail!("serial device {} closed", config.device.display());
    }

    info!("serialtalk finished");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serialtalk::infrastructure::storage::parse_config;

    fn config_from(args: &[&str]) -> RelayConfig {
        let mut argv = vec!["serialtalk"];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
            .into_relay_config(&FileConfig::default())
            .expect("config")
    }

    #[test]
    fn test_cli_requires_device() {
        let result = Cli::try_parse_from(["serialtalk"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_defaults() {
        // Arrange / Act
        let config = config_from(&["/dev/ttyS0"]);

        // Assert
        assert_eq!(config.device, PathBuf::from("/dev/ttyS0"));
        assert_eq!(config.line.input_baud, 9600);
        assert_eq!(config.line.effective_output_baud(), 9600);
        assert_eq!(config.line.data_bits, DataBits::Eight);
        assert_eq!(config.line.parity, Parity::None);
        assert_eq!(config.relay.timeout, Timeout::Forever);
        assert_eq!(config.peer, PeerMode::Terminal);
        assert!(!config.stdin_mode.is_changed());
    }

    #[test]
    fn test_cli_baud_and_output_baud() {
        let config = config_from(&["-b", "115200", "-o", "9600", "/dev/ttyS0"]);
        assert_eq!(config.line.input_baud, 115_200);
        assert_eq!(config.line.output_baud, 9600);
    }

    #[test]
    fn test_cli_negative_timeout_waits_forever() {
        let config = config_from(&["-t", "-1", "/dev/ttyS0"]);
        assert_eq!(config.relay.timeout, Timeout::Forever);
    }

    #[test]
    fn test_cli_zero_timeout_is_single_pass() {
        let config = config_from(&["-t", "0", "/dev/ttyS0"]);
        assert_eq!(config.relay.timeout, Timeout::Immediate);
    }

    #[test]
    fn test_cli_wait_without_timeout_bounds_each_poll() {
        let config = config_from(&["-w", "500", "/dev/ttyS0"]);
        assert_eq!(config.relay.timeout, Timeout::Millis(500));
        assert_eq!(config.relay.idle_after_close_ms, 500);
    }

    #[test]
    fn test_cli_bits_out_of_range_rejected() {
        let result = Cli::try_parse_from(["serialtalk", "-B", "9", "/dev/ttyS0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_parity_flags_conflict() {
        let result = Cli::try_parse_from(["serialtalk", "-p", "-P", "/dev/ttyS0"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_cli_line_flags() {
        // Arrange / Act
        let config = config_from(&["-D", "-r", "-C", "/dev/ttyS0"]);

        // Assert
        assert_eq!(config.line.set_lines, ModemLines(ModemLines::DTR | ModemLines::CTS));
        assert_eq!(config.line.clear_lines, ModemLines(ModemLines::RTS));
    }

    #[test]
    fn test_cli_translation_flags() {
        let config = config_from(&["-x", "-I", "/dev/ttyS0"]);
        assert_eq!(config.relay.translation.outbound, OutboundNewline::CrLf);
        assert_eq!(config.relay.translation.inbound, InboundCarriageReturn::Lf);
    }

    #[test]
    fn test_cli_stdin_mode_flags() {
        let config = config_from(&["-n", "-N", "/dev/ttyS0"]);
        assert!(!config.stdin_mode.canonical);
        assert!(!config.stdin_mode.echo);
    }

    #[test]
    fn test_cli_listen_port() {
        let config = config_from(&["-l", "2000", "/dev/ttyS0"]);
        assert_eq!(config.peer, PeerMode::Listen(2000));
    }

    #[test]
    fn test_cli_flags_override_file_defaults() {
        // Arrange
        let file = parse_config(
            "[line]\nbaud = 57600\nparity = \"odd\"\n[relay]\ntimeout_ms = 100\nlisten_port = 4000\n",
        )
        .expect("parse");
        let cli = Cli::parse_from(["serialtalk", "-b", "115200", "-P", "/dev/ttyS0"]);

        // Act
        let config = cli.into_relay_config(&file).expect("config");

        // Assert
        assert_eq!(config.line.input_baud, 115_200);
        assert_eq!(config.line.parity, Parity::Even);
        assert_eq!(config.relay.timeout, Timeout::Millis(100));
        assert_eq!(config.peer, PeerMode::Listen(4000));
    }

    #[test]
    fn test_cli_one_shot_and_background_flags() {
        let config = config_from(&["-y", "-F", "-H", "-T", "-s", "-v", "/dev/ttyS0"]);
        assert!(config.send_interrupt);
        assert!(config.background);
        assert!(config.line.hangup_on_close);
        assert!(config.relay.trace_bytes);
        assert!(config.relay.show_state);
        assert!(config.verbose);
    }
}
