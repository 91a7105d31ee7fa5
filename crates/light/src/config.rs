use std::net::SocketAddr;
use std::time::Duration;

use clap::Parser;
use tracing::Level;
use wifirgb_web::{BasicAuth, DEFAULT_BACKLOG};

/// Addressable LED lamp with an HTTP control API
#[derive(Parser, Debug, Clone)]
#[command(name = "wifirgb", author, version, about, long_about = None)]
pub struct Config {
    /// Address to listen on
    #[arg(long, value_name = "ADDR", default_value = "0.0.0.0:80")]
    pub address: SocketAddr,

    /// Pending connections the listener queues before refusing more
    #[arg(long, value_name = "N", default_value_t = DEFAULT_BACKLOG, value_parser = clap::value_parser!(u32).range(1..))]
    pub backlog: u32,

    /// Seconds a client gets to send a complete request
    #[arg(long = "read-timeout", value_name = "SECONDS", default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub read_timeout_secs: u64,

    /// Number of LEDs on the strip
    #[arg(long, value_name = "N", default_value_t = 30)]
    pub leds: usize,

    /// Basic authentication user name, requires --password
    #[arg(long, requires = "password")]
    pub username: Option<String>,

    /// Basic authentication password, requires --username
    #[arg(long, requires = "username")]
    pub password: Option<String>,

    /// Name reported in the Server header
    #[arg(long, default_value = "wifirgb")]
    pub hostname: String,

    /// Most verbose level logged (trace, debug, info, warn, error)
    #[arg(long = "log-level", value_name = "LEVEL", default_value_t = Level::INFO)]
    pub log_level: Level,
}

impl Config {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    /// The authentication gate, present when both credentials were given.
    pub fn basic_auth(&self) -> Option<BasicAuth> {
        match (&self.username, &self.password) {
            (Some(username), Some(password)) => Some(BasicAuth::new(username.as_str(), password.as_str())),
            _ => None,
        }
    }

    pub fn server_name(&self) -> String {
        format!("{} wifirgb/{}", self.hostname, env!("CARGO_PKG_VERSION"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = Config::try_parse_from(["wifirgb"]).unwrap();

        assert_eq!(config.address, "0.0.0.0:80".parse().unwrap());
        assert_eq!(config.backlog, 3);
        assert_eq!(config.read_timeout(), Duration::from_secs(10));
        assert_eq!(config.leds, 30);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.basic_auth().is_none());
        assert_eq!(config.server_name(), concat!("wifirgb wifirgb/", env!("CARGO_PKG_VERSION")));
    }

    #[test]
    fn credentials_come_in_pairs() {
        let config = Config::try_parse_from(["wifirgb", "--username", "admin", "--password", "secret"]).unwrap();
        let auth = config.basic_auth().unwrap();
        assert_eq!(auth.username(), "admin");

        assert!(Config::try_parse_from(["wifirgb", "--username", "admin"]).is_err());
        assert!(Config::try_parse_from(["wifirgb", "--password", "secret"]).is_err());
    }

    #[test]
    fn rejects_a_zero_backlog() {
        assert!(Config::try_parse_from(["wifirgb", "--backlog", "0"]).is_err());
    }

    #[test]
    fn parses_overrides() {
        let config = Config::try_parse_from([
            "wifirgb",
            "--address",
            "127.0.0.1:8080",
            "--leds",
            "60",
            "--hostname",
            "desk-lamp",
            "--log-level",
            "debug",
        ])
        .unwrap();

        assert_eq!(config.address.port(), 8080);
        assert_eq!(config.leds, 60);
        assert_eq!(config.log_level, Level::DEBUG);
        assert!(config.server_name().starts_with("desk-lamp wifirgb/"));
    }
}
