//! Command-line argument parsing
//!
//! Standardized argument parsing with clap so the binary and the test
//! harness agree on defaults.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

use crate::cipher::KEY_SPACE_BITS;
use crate::driver::{Engine, Mode};
use crate::error::CrackError;

#[derive(Parser, Debug, Clone)]
#[command(
    name = "descrack",
    version,
    about = "Distributed brute-force search of the DES key space"
)]
pub struct Args {
    /// File containing the known plaintext (newline-delimited)
    pub plaintext: PathBuf,

    /// Encryption key used to manufacture the test ciphertext
    /// (decimal, or hex with 0x prefix)
    #[arg(value_parser = parse_u64)]
    pub key: u64,

    /// File containing the search phrase (newline-delimited)
    pub phrase: PathBuf,

    /// Number of workers (default: auto-detect)
    #[arg(short = 'w', long = "workers", value_name = "N")]
    pub workers: Option<usize>,

    /// Work distribution policy
    #[arg(long, value_enum, default_value_t = CliMode::Static)]
    pub mode: CliMode,

    /// Range scanning strategy inside each worker
    #[arg(long, value_enum, default_value_t = CliEngine::Scan)]
    pub engine: CliEngine,

    /// Adjacent keys decrypted per step of the sequential scan
    #[arg(long, default_value_t = 1)]
    pub batch: usize,

    /// Search only the first 2^BITS keys of the space (56 = full DES)
    #[arg(long = "space-bits", value_name = "BITS", default_value_t = KEY_SPACE_BITS)]
    pub space_bits: u32,

    /// Seconds between progress reports (0 = silent)
    #[arg(long = "report-interval", default_value_t = 2)]
    pub report_interval: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliMode {
    Static,
    Dynamic,
}

impl From<CliMode> for Mode {
    fn from(mode: CliMode) -> Self {
        match mode {
            CliMode::Static => Mode::Static,
            CliMode::Dynamic => Mode::Dynamic,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CliEngine {
    Scan,
    Team,
    Pipeline,
}

impl From<CliEngine> for Engine {
    fn from(engine: CliEngine) -> Self {
        match engine {
            CliEngine::Scan => Engine::Scan,
            CliEngine::Team => Engine::Team,
            CliEngine::Pipeline => Engine::Pipeline,
        }
    }
}

/// Parse u64 from string (supports hex with 0x prefix)
pub fn parse_u64(value: &str) -> Result<u64, CrackError> {
    if let Some(hex) = value.strip_prefix("0x").or_else(|| value.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
            .map_err(|e| CrackError::InvalidKey(value.to_string(), e.to_string()))
    } else {
        value
            .parse::<u64>()
            .map_err(|e| CrackError::InvalidKey(value.to_string(), e.to_string()))
    }
}

/// Format number with thousands separator
pub fn format_number(n: u64) -> String {
    let digits = n.to_string();
    let mut result = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            result.push(',');
        }
        result.push(c);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_u64_accepts_decimal_and_hex() {
        assert_eq!(parse_u64("123456").unwrap(), 123_456);
        assert_eq!(parse_u64("0x1E240").unwrap(), 123_456);
        assert_eq!(parse_u64("0X1e240").unwrap(), 123_456);
        assert!(parse_u64("not a key").is_err());
        assert!(parse_u64("0xzz").is_err());
    }

    #[test]
    fn format_number_inserts_thousands_separators() {
        assert_eq!(format_number(0), "0");
        assert_eq!(format_number(999), "999");
        assert_eq!(format_number(1_000), "1,000");
        assert_eq!(format_number(56_000_000), "56,000,000");
    }

    #[test]
    fn args_parse_with_defaults() {
        let args =
            Args::try_parse_from(["descrack", "plain.txt", "123456", "phrase.txt"]).unwrap();
        assert_eq!(args.key, 123_456);
        assert_eq!(args.mode, CliMode::Static);
        assert_eq!(args.engine, CliEngine::Scan);
        assert_eq!(args.space_bits, 56);
        assert_eq!(args.workers, None);
    }

    #[test]
    fn args_parse_full_invocation() {
        let args = Args::try_parse_from([
            "descrack",
            "plain.txt",
            "0x1E240",
            "phrase.txt",
            "--workers",
            "8",
            "--mode",
            "dynamic",
            "--engine",
            "pipeline",
            "--space-bits",
            "24",
        ])
        .unwrap();
        assert_eq!(args.key, 123_456);
        assert_eq!(args.workers, Some(8));
        assert_eq!(args.mode, CliMode::Dynamic);
        assert_eq!(args.engine, CliEngine::Pipeline);
        assert_eq!(args.space_bits, 24);
    }
}
