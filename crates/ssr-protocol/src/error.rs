//! Error kinds for the cryptographic transport core.
//!
//! These map onto `spec.md` §7: `UnsupportedCipher`, `ShortPacket` /
//! `ShortBuffer`, `DecryptFailure`, and the transient `NeedsMoreInput`
//! (the Rust replacement for the Go source's substring match on
//! `"buf is too short"`, see Design Notes "Transient errors by string
//! matching").

use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("unsupported cipher method: {0}")]
    UnsupportedCipher(String),

    #[error("short packet: need at least {need} bytes, got {got}")]
    ShortPacket { need: usize, got: usize },

    #[error("caller buffer too short: need {need} bytes, got {got}")]
    ShortBuffer { need: usize, got: usize },

    #[error("AEAD tag verification failed")]
    DecryptFailure,

    /// Not a failure: the codec has buffered the input and needs more
    /// bytes from the socket before it can produce plaintext.
    #[error("needs more input")]
    NeedsMoreInput,

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, CryptoError>;
