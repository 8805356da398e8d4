//! SOCKS5-style address header (`SPEC_FULL.md` §4.9a): UDP packet payloads
//! and sub-protocol target addresses begin with an ATYP/address/port
//! header. Grounded on `examples/original_source/utils/addrx/addrx.go`
//! and `utils/netx/netx.go`'s use of `socksproxy.ParseAddr`.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ByteOrder};

use crate::error::{CryptoError, Result};

const ATYP_IPV4: u8 = 0x01;
const ATYP_DOMAIN: u8 = 0x03;
const ATYP_IPV6: u8 = 0x04;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Address {
    SocketAddr(SocketAddr),
    DomainNameAddr(String, u16),
}

impl Address {
    /// Parse a SOCKS address header from the front of `buf`, returning the
    /// address and the number of bytes consumed.
    pub fn parse(buf: &[u8]) -> Result<(Address, usize)> {
        if buf.is_empty() {
            return Err(CryptoError::ShortPacket { need: 1, got: 0 });
        }

        match buf[0] {
            ATYP_IPV4 => {
                let need = 1 + 4 + 2;
                if buf.len() < need {
                    return Err(CryptoError::ShortPacket { need, got: buf.len() });
                }
                let ip = Ipv4Addr::new(buf[1], buf[2], buf[3], buf[4]);
                let port = BigEndian::read_u16(&buf[5..7]);
                Ok((Address::SocketAddr(SocketAddr::new(IpAddr::V4(ip), port)), need))
            }
            ATYP_DOMAIN => {
                if buf.len() < 2 {
                    return Err(CryptoError::ShortPacket { need: 2, got: buf.len() });
                }
                let domain_len = buf[1] as usize;
                let need = 1 + 1 + domain_len + 2;
                if buf.len() < need {
                    return Err(CryptoError::ShortPacket { need, got: buf.len() });
                }
                let domain = String::from_utf8_lossy(&buf[2..2 + domain_len]).into_owned();
                let port = BigEndian::read_u16(&buf[2 + domain_len..need]);
                Ok((Address::DomainNameAddr(domain, port), need))
            }
            ATYP_IPV6 => {
                let need = 1 + 16 + 2;
                if buf.len() < need {
                    return Err(CryptoError::ShortPacket { need, got: buf.len() });
                }
                let mut octets = [0u8; 16];
                octets.copy_from_slice(&buf[1..17]);
                let ip = Ipv6Addr::from(octets);
                let port = BigEndian::read_u16(&buf[17..19]);
                Ok((Address::SocketAddr(SocketAddr::new(IpAddr::V6(ip), port)), need))
            }
            other => Err(CryptoError::UnsupportedCipher(format!("unknown SOCKS address type {other:#x}"))),
        }
    }

    /// Serialize into the wire header format, appending to `buf`.
    pub fn write_to(&self, buf: &mut Vec<u8>) {
        match self {
            Address::SocketAddr(SocketAddr::V4(addr)) => {
                buf.push(ATYP_IPV4);
                buf.extend_from_slice(&addr.ip().octets());
                let mut port_buf = [0u8; 2];
                BigEndian::write_u16(&mut port_buf, addr.port());
                buf.extend_from_slice(&port_buf);
            }
            Address::SocketAddr(SocketAddr::V6(addr)) => {
                buf.push(ATYP_IPV6);
                buf.extend_from_slice(&addr.ip().octets());
                let mut port_buf = [0u8; 2];
                BigEndian::write_u16(&mut port_buf, addr.port());
                buf.extend_from_slice(&port_buf);
            }
            Address::DomainNameAddr(domain, port) => {
                buf.push(ATYP_DOMAIN);
                buf.push(domain.len() as u8);
                buf.extend_from_slice(domain.as_bytes());
                let mut port_buf = [0u8; 2];
                BigEndian::write_u16(&mut port_buf, *port);
                buf.extend_from_slice(&port_buf);
            }
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::SocketAddr(addr) => write!(f, "{addr}"),
            Address::DomainNameAddr(domain, port) => write!(f, "{domain}:{port}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ipv4_roundtrips() {
        let addr = Address::SocketAddr("8.8.8.8:53".parse().unwrap());
        let mut buf = Vec::new();
        addr.write_to(&mut buf);
        let (parsed, used) = Address::parse(&buf).unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn ipv6_roundtrips() {
        let addr = Address::SocketAddr("[2001:db8::1]:443".parse().unwrap());
        let mut buf = Vec::new();
        addr.write_to(&mut buf);
        let (parsed, used) = Address::parse(&buf).unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn domain_roundtrips() {
        let addr = Address::DomainNameAddr("example.com".to_owned(), 443);
        let mut buf = Vec::new();
        addr.write_to(&mut buf);
        let (parsed, used) = Address::parse(&buf).unwrap();
        assert_eq!(parsed, addr);
        assert_eq!(used, buf.len());
    }

    #[test]
    fn truncated_header_is_short_packet() {
        let buf = [ATYP_IPV4, 1, 2];
        assert!(matches!(Address::parse(&buf), Err(CryptoError::ShortPacket { .. })));
    }

    #[test]
    fn trailing_bytes_after_header_are_not_consumed() {
        let mut buf = Vec::new();
        Address::SocketAddr("1.2.3.4:80".parse().unwrap()).write_to(&mut buf);
        buf.extend_from_slice(b"payload");
        let (_, used) = Address::parse(&buf).unwrap();
        assert_eq!(&buf[used..], b"payload");
    }
}
