//! Optional TOML defaults file.
//!
//! `serialtalk --config <path>` reads line and relay defaults from a file so
//! a device's usual settings do not have to be repeated on every command
//! line.  Flags given on the command line still win.
//!
//! # Example file
//!
//! ```toml
//! [line]
//! baud = 115200
//! data_bits = 8
//! parity = "none"
//! set_lines = ["DTR", "RTS"]
//!
//! [relay]
//! timeout_ms = 100
//! wait_ms = 500
//! translation = { outbound = "crlf", inbound = "none" }
//! ```
//!
//! Every field is optional.  Fields annotated with
//! `#[serde(default = "some_fn")]` take `some_fn()` when absent, so an empty
//! file means "all built-in defaults".

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use serialtalk_core::{DataBits, LineConfig, ModemLines, Parity, TranslationPolicy};

/// Error type for configuration file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// A modem line name is not one of LE, DTR, RTS, ST, SR, CTS, CAR, RI, DSR.
    #[error("unknown modem line {0:?}")]
    UnknownLine(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level layout of the defaults file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    #[serde(default)]
    pub line: LineSection,
    #[serde(default)]
    pub relay: RelaySection,
}

/// `[line]`: serial line settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineSection {
    #[serde(default = "default_baud")]
    pub baud: u32,
    /// `0` means "same as `baud`".
    #[serde(default)]
    pub output_baud: u32,
    #[serde(default)]
    pub data_bits: DataBits,
    #[serde(default)]
    pub parity: Parity,
    #[serde(default)]
    pub hangup_on_close: bool,
    /// Modem line names to raise, e.g. `["DTR"]`.
    #[serde(default)]
    pub set_lines: Vec<String>,
    /// Modem line names to lower.
    #[serde(default)]
    pub clear_lines: Vec<String>,
}

/// `[relay]`: transfer loop and peer settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RelaySection {
    /// Per-wait timeout; negative waits forever, `0` is a single pass.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: i64,
    /// Idle window after the peer hangs up.
    #[serde(default)]
    pub wait_ms: u32,
    #[serde(default)]
    pub show_state: bool,
    #[serde(default)]
    pub trace: bool,
    #[serde(default)]
    pub translation: TranslationPolicy,
    /// Serve a TCP port instead of stdin/stdout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub listen_port: Option<u16>,
    #[serde(default)]
    pub stdin_noncanonical: bool,
    #[serde(default)]
    pub stdin_noecho: bool,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_baud() -> u32 {
    9600
}
fn default_timeout_ms() -> i64 {
    -1
}

impl Default for LineSection {
    fn default() -> Self {
        Self {
            baud: default_baud(),
            output_baud: 0,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            hangup_on_close: false,
            set_lines: Vec::new(),
            clear_lines: Vec::new(),
        }
    }
}

impl Default for RelaySection {
    fn default() -> Self {
        Self {
            timeout_ms: default_timeout_ms(),
            wait_ms: 0,
            show_state: false,
            trace: false,
            translation: TranslationPolicy::default(),
            listen_port: None,
            stdin_noncanonical: false,
            stdin_noecho: false,
        }
    }
}

fn parse_lines(names: &[String]) -> Result<ModemLines, ConfigError> {
    names.iter().try_fold(ModemLines::empty(), |acc, name| {
        ModemLines::bit_from_name(name)
            .map(|bit| acc.with(bit))
            .ok_or_else(|| ConfigError::UnknownLine(name.clone()))
    })
}

impl LineSection {
    /// Converts the section into a [`LineConfig`].
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownLine`] for an unrecognised line name.
    pub fn to_line_config(&self) -> Result<LineConfig, ConfigError> {
        Ok(LineConfig {
            input_baud: self.baud,
            output_baud: self.output_baud,
            data_bits: self.data_bits,
            parity: self.parity,
            hangup_on_close: self.hangup_on_close,
            set_lines: parse_lines(&self.set_lines)?,
            clear_lines: parse_lines(&self.clear_lines)?,
        })
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Parses a defaults file from TOML text.
///
/// # Errors
///
/// Returns [`ConfigError::Parse`] if the TOML is invalid.
pub fn parse_config(text: &str) -> Result<FileConfig, ConfigError> {
    Ok(toml::from_str(text)?)
}

/// Loads a defaults file from `path`.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] if the file cannot be read (including when it
/// does not exist) or [`ConfigError::Parse`] if the TOML is invalid.
pub fn load_config_from(path: &Path) -> Result<FileConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = parse_config(&text)?;
    debug!(path = %path.display(), "loaded config file");
    Ok(config)
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serialtalk_core::{OutboundNewline, Timeout};

    #[test]
    fn test_empty_file_gives_builtin_defaults() {
        // Arrange / Act
        let config = parse_config("").expect("parse");

        // Assert
        assert_eq!(config, FileConfig::default());
        assert_eq!(config.line.to_line_config().expect("line"), LineConfig::default());
        assert_eq!(Timeout::from_millis(config.relay.timeout_ms), Timeout::Forever);
    }

    #[test]
    fn test_partial_sections_keep_other_defaults() {
        let config = parse_config("[line]\nbaud = 115200\n[relay]\nwait_ms = 250\n").expect("parse");

        assert_eq!(config.line.baud, 115_200);
        assert_eq!(config.line.data_bits, DataBits::Eight);
        assert_eq!(config.relay.wait_ms, 250);
        assert_eq!(config.relay.timeout_ms, -1);
    }

    #[test]
    fn test_lines_and_translation_parse() {
        // Arrange
        let text = r#"
            [line]
            parity = "odd"
            data_bits = 7
            set_lines = ["dtr", "RTS"]
            clear_lines = ["ri"]

            [relay]
            translation = { outbound = "cr" }
            listen_port = 2000
        "#;

        // Act
        let config = parse_config(text).expect("parse");
        let line = config.line.to_line_config().expect("line");

        // Assert
        assert_eq!(line.parity, Parity::Odd);
        assert_eq!(line.data_bits, DataBits::Seven);
        assert_eq!(line.set_lines, ModemLines(ModemLines::DTR | ModemLines::RTS));
        assert_eq!(line.clear_lines, ModemLines(ModemLines::RNG));
        assert_eq!(config.relay.translation.outbound, OutboundNewline::Cr);
        assert_eq!(config.relay.listen_port, Some(2000));
    }

    #[test]
    fn test_unknown_line_name_is_rejected() {
        let config = parse_config("[line]\nset_lines = [\"XYZ\"]\n").expect("parse");
        let err = config.line.to_line_config().expect_err("must fail");
        assert!(matches!(err, ConfigError::UnknownLine(ref n) if n == "XYZ"));
    }

    #[test]
    fn test_invalid_data_bits_is_a_parse_error() {
        let result = parse_config("[line]\ndata_bits = 9\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let result = load_config_from(&dir.path().join("absent.toml"));
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_load_round_trips_through_disk() {
        // Arrange
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("serialtalk.toml");
        std::fs::write(&path, "[line]\nbaud = 57600\n").expect("write");

        // Act
        let config = load_config_from(&path).expect("load");

        // Assert
        assert_eq!(config.line.baud, 57_600);
    }
}
