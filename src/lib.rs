//! descrack: distributed brute-force search of the DES key space
//!
//! Recovers the key that decrypts a known ciphertext into text containing
//! a known search phrase:
//! - `cipher`: the block-cipher capability and the DES oracle
//! - `text`: input normalization and candidate recovery
//! - `search`: decrypt-and-match range testing with early exit
//! - `pipeline`: the three-stage generate/decrypt/compare variant
//! - `partition`: static splits and the dynamic work reservoir
//! - `driver`: worker state machines, found-key fan-out, coordinator
//! - `session`: setup, run, and the final report

pub mod cipher;
pub mod cli;
pub mod driver;
pub mod error;
pub mod partition;
pub mod pipeline;
pub mod search;
pub mod session;
pub mod text;

pub use cipher::{BlockCipher, DesCipher, KEY_SPACE_BITS, KEY_SPACE_END};
pub use error::{CrackError, Result};
pub use partition::{KeyRange, WorkReservoir};
pub use search::{FoundSlot, SearchOutcome};
pub use session::{SearchReport, SessionConfig};
