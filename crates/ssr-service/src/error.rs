//! Error kinds for obfuscation/sub-protocol plugins and the decorator
//! that composes them (`spec.md` §7).

use std::io;

use ssr_protocol::CryptoError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecorateError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error("obfuscation handshake rejected: {0}")]
    ObfsHandshakeFailure(String),

    #[error("sub-protocol handshake rejected: {0}")]
    ProtocolHandshakeFailure(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

pub type Result<T> = std::result::Result<T, DecorateError>;
