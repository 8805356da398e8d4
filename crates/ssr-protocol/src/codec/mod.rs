//! Wire codecs (`spec.md` §4.3–§4.5): buffer-transform objects, not
//! `AsyncRead`/`AsyncWrite` pulls. Each codec owns its own `{uninitialized,
//! ready}` state per direction and exposes `encrypt`/`decrypt` methods
//! that take and return byte buffers, mirroring the Go original's
//! `encryption.Encrypt(buf) -> []byte` / `Decrypt` call shape from
//! `examples/original_source/common/network/decorate.go`, while the
//! per-cipher keystream/AEAD state machinery is the RustCrypto-backed
//! `crate::cipher` module.

pub mod aead;
pub mod packet;
pub mod stream;
