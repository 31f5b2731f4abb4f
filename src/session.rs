//! Search session: setup, run, report
//!
//! The session owns the one-time setup step that manufactures the test
//! ciphertext from the known plaintext and key, drives the distributed
//! search, and turns the outcome into the single user-visible report.
//! Setup failures abort the whole run before any search begins; once the
//! search is running the only terminal outcomes are "found" and
//! "not found".

use std::time::Duration;

use crate::cipher::{BlockCipher, DesCipher, KEY_SPACE_END};
use crate::driver::{self, DriverConfig};
use crate::error::{CrackError, Result};
use crate::text::{pad_blocks, recovered_string};

#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Normalized plaintext used to manufacture the ciphertext.
    pub plaintext: String,
    /// Normalized phrase to look for in candidate decryptions.
    pub phrase: String,
    /// The key the ciphertext is encrypted under.
    pub key: u64,
    pub driver: DriverConfig,
}

/// The single report produced per run.
#[derive(Debug, Clone)]
pub struct SearchReport {
    pub found: Option<FoundKey>,
    pub elapsed: Duration,
    pub keys_tried: u64,
}

#[derive(Debug, Clone)]
pub struct FoundKey {
    pub key: u64,
    pub decrypted: String,
}

/// Validate inputs, encrypt the plaintext, and run the search.
pub fn run(cfg: &SessionConfig) -> Result<SearchReport> {
    if cfg.plaintext.is_empty() {
        return Err(CrackError::EmptyPlaintext);
    }
    if cfg.phrase.is_empty() {
        return Err(CrackError::EmptyPhrase);
    }
    if cfg.key >= KEY_SPACE_END {
        return Err(CrackError::KeyOutOfRange(cfg.key));
    }
    let space = cfg.driver.space;
    if space.start >= space.end || space.end > KEY_SPACE_END {
        return Err(CrackError::EmptyKeySpace {
            start: space.start,
            end: space.end,
        });
    }

    let cipher = DesCipher;

    // One-time setup: manufacture the ciphertext under test. A weak
    // encryption key is fatal here, unlike during the search itself.
    let mut ciphertext = pad_blocks(&cfg.plaintext);
    cipher.encrypt(cfg.key, &mut ciphertext)?;

    let outcome = driver::run(&cipher, &ciphertext, cfg.phrase.as_bytes(), &cfg.driver);

    let found = match outcome.found {
        Some(key) => {
            let mut decrypted = vec![0u8; ciphertext.len()];
            cipher.decrypt(key, &ciphertext, &mut decrypted)?;
            Some(FoundKey {
                key,
                decrypted: recovered_string(&decrypted),
            })
        }
        None => None,
    };

    Ok(SearchReport {
        found,
        elapsed: outcome.elapsed,
        keys_tried: outcome.keys_tried,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::partition::KeyRange;

    fn small_session(key: u64, phrase: &str) -> SessionConfig {
        SessionConfig {
            plaintext: "the quick brown fox".to_string(),
            phrase: phrase.to_string(),
            key,
            driver: DriverConfig {
                workers: 2,
                space: KeyRange::new(0, 1 << 14),
                ..DriverConfig::default()
            },
        }
    }

    #[test]
    fn empty_plaintext_is_fatal() {
        let mut cfg = small_session(123, "the");
        cfg.plaintext.clear();
        assert!(matches!(run(&cfg), Err(CrackError::EmptyPlaintext)));
    }

    #[test]
    fn empty_phrase_is_fatal() {
        let mut cfg = small_session(123, "the");
        cfg.phrase.clear();
        assert!(matches!(run(&cfg), Err(CrackError::EmptyPhrase)));
    }

    #[test]
    fn weak_setup_key_is_fatal() {
        let cfg = small_session(0, "the");
        assert!(matches!(run(&cfg), Err(CrackError::WeakKey(0))));
    }

    #[test]
    fn out_of_range_key_is_fatal() {
        let cfg = small_session(KEY_SPACE_END, "the");
        assert!(matches!(run(&cfg), Err(CrackError::KeyOutOfRange(_))));
    }

    #[test]
    fn found_report_carries_the_decrypted_text() {
        let cfg = small_session(9_999, "quick");
        let report = run(&cfg).unwrap();
        let found = report.found.expect("key should be found");
        assert_eq!(found.key, 9_999);
        assert_eq!(found.decrypted, "the quick brown fox");
        assert!(report.keys_tried > 0);
    }
}
