//! `http_simple` obfuscation (`spec.md` §4.6, §8 scenario 3): disguises the
//! first outbound/inbound exchange as an HTTP request/response.
//!
//! Simplification (recorded in `DESIGN.md`): the real `http_simple` plugin
//! parses a random subset of HTTP headers and varies the response per
//! `obfs_param`. This implementation recognizes a `GET `/`POST` request
//! line, treats everything up to the first `\r\n\r\n` as the disguised
//! handshake, and replies with a minimal `HTTP/1.1 200 OK` response — the
//! wire-visible shape the testable property requires, without the full
//! header-randomization surface.

use crate::error::Result;
use crate::obfs::ObfsDecodeResult;
use crate::server_info::ServerInfo;

const HEADER_TERMINATOR: &[u8] = b"\r\n\r\n";

pub struct HttpSimpleObfs {
    #[allow(dead_code)]
    server_info: ServerInfo,
    handshaked: bool,
    reply_sent: bool,
    pending_tail: Vec<u8>,
}

impl HttpSimpleObfs {
    pub fn new(server_info: ServerInfo) -> HttpSimpleObfs {
        HttpSimpleObfs {
            server_info,
            handshaked: false,
            reply_sent: false,
            pending_tail: Vec::new(),
        }
    }

    fn looks_like_http_request(data: &[u8]) -> bool {
        data.starts_with(b"GET ") || data.starts_with(b"POST")
    }

    pub fn server_decode(&mut self, data: &[u8]) -> Result<ObfsDecodeResult> {
        if !self.handshaked {
            if data.len() < 3 || !Self::looks_like_http_request(data) {
                // Too little data to recognize the preamble, or the client
                // isn't actually speaking http_simple: pass through as-is.
                return Ok(ObfsDecodeResult {
                    data: data.to_vec(),
                    need_decrypt: true,
                    need_send_back: false,
                });
            }

            self.handshaked = true;
            if let Some(pos) = find_subslice(data, HEADER_TERMINATOR) {
                self.pending_tail = data[pos + HEADER_TERMINATOR.len()..].to_vec();
            }
            return Ok(ObfsDecodeResult {
                data: Vec::new(),
                need_decrypt: false,
                need_send_back: true,
            });
        }

        let mut combined = std::mem::take(&mut self.pending_tail);
        combined.extend_from_slice(data);
        Ok(ObfsDecodeResult {
            data: combined,
            need_decrypt: true,
            need_send_back: false,
        })
    }

    pub fn server_encode(&mut self, data: &[u8]) -> Vec<u8> {
        if !self.reply_sent {
            self.reply_sent = true;
            let mut out = Vec::new();
            out.extend_from_slice(b"HTTP/1.1 200 OK\r\nConnection: keep-alive\r\nContent-Length: 0\r\n\r\n");
            out.extend_from_slice(data);
            return out;
        }
        data.to_vec()
    }

    pub fn get_overhead(&self, _is_local: bool) -> usize {
        crate::server_info::DEFAULT_HEAD_LEN
    }
}

fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|window| window == needle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server_info::ServerInfoInner;

    fn plugin() -> HttpSimpleObfs {
        HttpSimpleObfs::new(ServerInfo::new(ServerInfoInner::default()))
    }

    #[test]
    fn http_preamble_triggers_send_back_before_any_plaintext() {
        let mut obfs = plugin();
        let request = b"GET / HTTP/1.1\r\nHost: example.com\r\n\r\n";
        let result = obfs.server_decode(request).unwrap();
        assert!(result.need_send_back);
        assert!(!result.need_decrypt);
        assert!(result.data.is_empty());
    }

    #[test]
    fn reply_is_http_shaped() {
        let mut obfs = plugin();
        obfs.server_decode(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let reply = obfs.server_encode(&[]);
        assert!(reply.starts_with(b"HTTP/1.1 200"));
    }

    #[test]
    fn second_encode_call_does_not_repeat_the_header() {
        let mut obfs = plugin();
        obfs.server_decode(b"GET / HTTP/1.1\r\n\r\n").unwrap();
        let _ = obfs.server_encode(&[]);
        let second = obfs.server_encode(b"plain bytes");
        assert_eq!(second, b"plain bytes");
    }

    #[test]
    fn bytes_after_header_terminator_surface_on_the_next_decode() {
        let mut obfs = plugin();
        let mut request = b"POST / HTTP/1.1\r\n\r\n".to_vec();
        request.extend_from_slice(b"leftover-ciphertext");
        let first = obfs.server_decode(&request).unwrap();
        assert!(first.data.is_empty());

        let second = obfs.server_decode(b"more-ciphertext").unwrap();
        assert_eq!(second.data, b"leftover-ciphertextmore-ciphertext");
        assert!(second.need_decrypt);
    }

    #[test]
    fn non_http_client_passes_straight_through() {
        let mut obfs = plugin();
        let result = obfs.server_decode(b"\x01\x02\x03ordinary bytes").unwrap();
        assert!(!result.need_send_back);
        assert!(result.need_decrypt);
        assert_eq!(result.data, b"\x01\x02\x03ordinary bytes");
    }
}
