use thiserror::Error;

#[derive(Error, Debug)]
pub enum CrackError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid encryption key '{0}': {1}")]
    InvalidKey(String, String),

    #[error("encryption key {0} is outside the 56-bit key space")]
    KeyOutOfRange(u64),

    #[error("DES rejects key {0:#018x} (weak or semi-weak key schedule)")]
    WeakKey(u64),

    #[error("plaintext is empty after normalization")]
    EmptyPlaintext,

    #[error("search phrase is empty after normalization")]
    EmptyPhrase,

    #[error("invalid key range: start {start:#x} >= end {end:#x}")]
    EmptyKeySpace { start: u64, end: u64 },
}

pub type Result<T> = std::result::Result<T, CrackError>;
