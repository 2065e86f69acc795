//! Gateway configuration.
//!
//! Plain serde-derivable data. Every field except `identity` has a
//! default, so a config file only needs to name the station.

use std::path::PathBuf;
use std::time::Duration;

use aprsbbs_protocol::{Identity, default_filter, passcode};
use aprsbbs_session::AckConfig;
use serde::{Deserialize, Serialize};

/// Default APRS-IS server rotation.
pub const DEFAULT_HOST: &str = "rotate.aprs2.net";

/// User-defined-filter port of the APRS-IS network.
pub const DEFAULT_PORT: u16 = 14580;

/// Software name sent in the login line.
pub const DEFAULT_SOFTWARE: &str = "APRSBBS";

/// Everything a [`Gateway`](crate::Gateway) needs to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// The BBS's own call-sign. Only messages addressed to it are handled.
    pub identity: Identity,

    /// APRS-IS passcode. Computed from `identity` when absent.
    #[serde(default)]
    pub passcode: Option<i32>,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Server-side filter. Defaults to `m/<identity>`.
    #[serde(default)]
    pub filter: Option<String>,

    #[serde(default = "default_software")]
    pub software: String,

    #[serde(default = "default_version")]
    pub version: String,

    /// SQLite file for the mailbox. Messages live in memory only when
    /// this is absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    #[serde(default)]
    pub ack: AckConfig,

    /// Periodic object report. No beacon when absent.
    #[serde(default)]
    pub beacon: Option<BeaconConfig>,

    /// How long a `(sender, message number)` pair is remembered for
    /// duplicate suppression. `0` disables the filter.
    ///
    /// Default: 1800 seconds.
    #[serde(default = "default_duplicate_window")]
    pub duplicate_window_secs: u64,
}

impl GatewayConfig {
    /// A config with every default filled in.
    pub fn new(identity: Identity) -> Self {
        Self {
            identity,
            passcode: None,
            host: default_host(),
            port: default_port(),
            filter: None,
            software: default_software(),
            version: default_version(),
            database_path: None,
            ack: AckConfig::default(),
            beacon: None,
            duplicate_window_secs: default_duplicate_window(),
        }
    }

    /// The configured passcode, or the one derived from the call-sign.
    pub fn effective_passcode(&self) -> i32 {
        self.passcode
            .unwrap_or_else(|| passcode(self.identity.as_str()))
    }

    pub fn effective_filter(&self) -> String {
        self.filter
            .clone()
            .unwrap_or_else(|| default_filter(&self.identity))
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_secs(self.duplicate_window_secs)
    }
}

/// Object report broadcast on a fixed interval while logged in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeaconConfig {
    /// Object name, up to 9 characters.
    pub name: String,
    /// Decimal degrees, north positive.
    pub latitude: f64,
    /// Decimal degrees, east positive.
    pub longitude: f64,
    #[serde(default = "default_symbol_table")]
    pub symbol_table: char,
    #[serde(default = "default_symbol_code")]
    pub symbol_code: char,
    #[serde(default)]
    pub comment: String,
    /// Default: 1800 seconds.
    #[serde(default = "default_beacon_interval")]
    pub interval_secs: u64,
}

impl BeaconConfig {
    /// Never shorter than one second.
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }
}

fn default_host() -> String {
    DEFAULT_HOST.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_software() -> String {
    DEFAULT_SOFTWARE.to_string()
}

fn default_version() -> String {
    env!("CARGO_PKG_VERSION").to_string()
}

fn default_duplicate_window() -> u64 {
    30 * 60
}

fn default_symbol_table() -> char {
    '/'
}

fn default_symbol_code() -> char {
    '$'
}

fn default_beacon_interval() -> u64 {
    30 * 60
}
