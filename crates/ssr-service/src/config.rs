//! Configuration surface (`spec.md` §6, `SPEC_FULL.md` §2 ambient
//! "Configuration"): the options an external collaborator supplies to
//! construct a decorator, plus the listen addresses and NAT timeout
//! needed to actually run a server. Parsed with `serde` + `json5`,
//! matching the teacher's own config crate's choice of a
//! comments-and-trailing-commas-tolerant format for human-edited files.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

fn default_udp_nat_timeout_secs() -> u64 {
    300
}

fn default_tcp_listen() -> String {
    "0.0.0.0:8388".to_owned()
}

fn default_udp_listen() -> String {
    "0.0.0.0:8388".to_owned()
}

/// Mirrors `spec.md` §6 "Configuration surface consumed by the core".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Selects cipher from the registry, e.g. `"aes-256-gcm"`.
    pub method: String,
    /// Input to key derivation.
    pub password: String,

    #[serde(default = "default_obfs_method")]
    pub obfs_method: String,
    #[serde(default)]
    pub obfs_param: String,

    #[serde(default = "default_protocol_method")]
    pub protocol_method: String,
    #[serde(default)]
    pub protocol_param: String,

    /// `true` = single-user (UID learned from first decrypted packet).
    /// `false` = multi-user, keyed by `users`.
    #[serde(default)]
    pub single: bool,

    /// Mapping from user-key string to password, consulted by the
    /// sub-protocol plugin in multi-user mode.
    #[serde(default)]
    pub users: HashMap<String, String>,

    #[serde(default)]
    pub host: String,
    #[serde(default)]
    pub port: u16,

    #[serde(default = "default_tcp_listen")]
    pub tcp_listen: String,
    #[serde(default = "default_udp_listen")]
    pub udp_listen: String,

    #[serde(default = "default_udp_nat_timeout_secs")]
    pub udp_nat_timeout_secs: u64,
}

fn default_obfs_method() -> String {
    "plain".to_owned()
}

fn default_protocol_method() -> String {
    "origin".to_owned()
}

impl Config {
    pub fn from_json5(text: &str) -> Result<Config, json5::Error> {
        json5::from_str(text)
    }

    pub fn udp_nat_timeout(&self) -> Duration {
        Duration::from_secs(self.udp_nat_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minimal_config_with_defaults() {
        let config = Config::from_json5(
            r#"{
                method: "aes-256-gcm",
                password: "hunter2",
            }"#,
        )
        .unwrap();

        assert_eq!(config.method, "aes-256-gcm");
        assert_eq!(config.obfs_method, "plain");
        assert_eq!(config.protocol_method, "origin");
        assert!(!config.single);
        assert_eq!(config.udp_nat_timeout_secs, 300);
    }

    #[test]
    fn parses_multi_user_config() {
        let config = Config::from_json5(
            r#"{
                method: "aes-128-cfb",
                password: "unused-in-multi-user-mode",
                single: false,
                users: { "user-a": "pw-a", "user-b": "pw-b" },
            }"#,
        )
        .unwrap();

        assert_eq!(config.users.len(), 2);
        assert_eq!(config.users.get("user-a"), Some(&"pw-a".to_owned()));
    }
}
