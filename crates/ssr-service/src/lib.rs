//! Obfuscation/sub-protocol plugins, the SSR decorator that composes
//! them with encryption, the full-duplex copy engine, and the ambient
//! rule/traffic/config/NAT surface around them.
//!
//! See `examples/original_source/common/network/decorate.go` for the
//! composition this crate's [`decorator`] module is grounded on.

pub mod config;
pub mod copy;
pub mod decorator;
pub mod error;
pub mod nat;
pub mod obfs;
pub mod protocol;
pub mod rule;
pub mod server_info;
pub mod traffic;

pub use decorator::{Decorator, EncryptionCodec};
pub use error::{DecorateError, Result};
pub use server_info::{ServerInfo, ServerInfoInner};
