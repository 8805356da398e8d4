//! Key derivation: the legacy Shadowsocks `EVP_BytesToKey` replacement
//! (`spec.md` §4.1) and the AEAD subkey HKDF.
//!
//! Grounded on `examples/original_source/common/ciphers/stream/cipher_conn.go`
//! (`evpBytesToKey`) and `common/ciphers/aead/aes_gcm.go`
//! (`shadowsocksx.HKDF_SHA1`).

use hkdf::Hkdf;
use md5::{Digest, Md5};
use sha1::Sha1;

/// Derive the master key from a password. Deterministic, no salt: repeatedly
/// MD5 the concatenation of the previous digest and the password until there
/// are enough bytes, then truncate to `key_len`.
pub fn derive_master_key(password: &str, key_len: usize) -> Vec<u8> {
    let password = password.as_bytes();
    let mut key = Vec::with_capacity(key_len + Md5::output_size());
    let mut prev: Vec<u8> = Vec::new();

    while key.len() < key_len {
        let mut hasher = Md5::new();
        hasher.update(&prev);
        hasher.update(password);
        prev = hasher.finalize().to_vec();
        key.extend_from_slice(&prev);
    }

    key.truncate(key_len);
    key
}

/// Derive a per-session AEAD subkey: `HKDF_SHA1(master_key, salt, "ss-subkey", key_len)`.
pub fn derive_aead_subkey(master_key: &[u8], salt: &[u8], key_len: usize) -> Vec<u8> {
    let hk = Hkdf::<Sha1>::new(Some(salt), master_key);
    let mut subkey = vec![0u8; key_len];
    hk.expand(b"ss-subkey", &mut subkey)
        .expect("key_len is within HKDF-SHA1's 255*20 byte limit");
    subkey
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Pinned against the legacy `EVP_BytesToKey(MD5, no salt)` vector for
    /// password "foobar", 32-byte key (`spec.md` §8 "Key derivation stability").
    #[test]
    fn master_key_is_bit_identical_to_evp_bytes_to_key() {
        let key = derive_master_key("foobar", 32);
        assert_eq!(to_hex(&key), "3858f62230ac3c915f300c664312c63f568378529614d22ddb49237d2f60bfdf");
    }

    #[test]
    fn master_key_has_requested_length() {
        for len in [16usize, 24, 32] {
            assert_eq!(derive_master_key("hunter2", len).len(), len);
        }
    }

    #[test]
    fn master_key_is_deterministic() {
        assert_eq!(derive_master_key("test", 32), derive_master_key("test", 32));
    }

    #[test]
    fn subkey_has_requested_length_and_varies_with_salt() {
        let master = derive_master_key("test", 32);
        let a = derive_aead_subkey(&master, b"salt-a-salt-a-salt-a-salt-a-salt", 32);
        let b = derive_aead_subkey(&master, b"salt-b-salt-b-salt-b-salt-b-salt", 32);
        assert_eq!(a.len(), 32);
        assert_ne!(a, b);
    }

    fn to_hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{:02x}", b)).collect()
    }
}
