//! Configuration management

use crate::{topology, Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

/// Relay configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Relay-wide settings
    #[serde(default)]
    pub relay: RelaySettings,
    /// One entry per chat network, in ring order
    #[serde(default)]
    pub networks: Vec<NetworkConfig>,
}

/// Settings shared by every session
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RelaySettings {
    /// How `Delivery::Relay` decides whether text still needs a network tag
    #[serde(default)]
    pub loop_guard: LoopGuard,
}

/// Tagging rule for locally originated messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopGuard {
    /// Text starting with `[` is assumed to be tagged already
    #[default]
    Tag,
    /// Always tag; the hop limit comes from the delivery mode alone
    Envelope,
}

/// What causes the session to send its JOIN
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinTrigger {
    /// Numeric 001 (RPL_WELCOME)
    #[default]
    Welcome,
    /// First PING received from the server
    FirstPing,
    /// Immediately after NICK/USER are written
    Connect,
}

/// Which INVITEs the session follows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitePolicy {
    /// Follow an invite to any channel
    #[default]
    Any,
    /// Only accept invites back into the configured channel
    Configured,
}

/// One chat network the relay connects to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Server hostname
    pub server: String,
    /// Server port
    pub port: u16,
    /// Nickname to register with
    pub nickname: String,
    /// Channel to join and relay
    pub channel: String,
    /// Short tag shown in front of relayed lines, e.g. `R`
    #[serde(alias = "identifier")]
    pub network_identifier: String,
    /// Whether to use TLS
    #[serde(default = "default_tls")]
    pub tls: bool,
    /// Senders whose messages are never relayed
    #[serde(default)]
    pub ignored_users: Vec<String>,
    /// Identifier of the network to forward to; the next entry when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relay_to: Option<String>,
    #[serde(default)]
    pub join_on: JoinTrigger,
    #[serde(default)]
    pub invite_policy: InvitePolicy,
    /// Give up on the connection after this many seconds without a line
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_secs: Option<u64>,
    /// Longest inbound line in bytes, terminator included; longer lines are
    /// discarded
    #[serde(default = "default_max_line_length")]
    pub max_line_length: usize,
}

fn default_tls() -> bool {
    true
}

fn default_max_line_length() -> usize {
    512
}

/// Smallest accepted `max_line_length`
pub const MIN_LINE_LENGTH: usize = 64;

impl NetworkConfig {
    /// Create a network entry with default options
    pub fn new(
        server: impl Into<String>,
        port: u16,
        nickname: impl Into<String>,
        channel: impl Into<String>,
        network_identifier: impl Into<String>,
    ) -> Self {
        Self {
            server: server.into(),
            port,
            nickname: nickname.into(),
            channel: channel.into(),
            network_identifier: network_identifier.into(),
            tls: default_tls(),
            ignored_users: Vec::new(),
            relay_to: None,
            join_on: JoinTrigger::default(),
            invite_policy: InvitePolicy::default(),
            idle_timeout_secs: None,
            max_line_length: default_max_line_length(),
        }
    }

    /// `server:port` for socket connection and logging
    pub fn address(&self) -> String {
        format!("{}:{}", self.server, self.port)
    }

    /// Whether `nick` is on the ignore list (ASCII case-insensitive)
    pub fn is_ignored(&self, nick: &str) -> bool {
        self.ignored_users.iter().any(|u| u.eq_ignore_ascii_case(nick))
    }
}

impl Config {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| Error::Config(format!("Failed to read config file: {}", e)))?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Save configuration to file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)?;

        std::fs::write(path, content)
            .map_err(|e| Error::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.networks.is_empty() {
            return Err("At least one network must be configured".into());
        }

        let mut seen = HashSet::new();
        for network in &self.networks {
            let id = &network.network_identifier;
            if id.is_empty() {
                return Err(format!("Network {} has an empty identifier", network.address()).into());
            }
            if !seen.insert(id.as_str()) {
                return Err(format!("Duplicate network identifier: {}", id).into());
            }
            if network.server.is_empty() {
                return Err(format!("Network [{}]: server cannot be empty", id).into());
            }
            if network.port == 0 {
                return Err(format!("Network [{}]: port cannot be 0", id).into());
            }
            if network.nickname.is_empty() {
                return Err(format!("Network [{}]: nickname cannot be empty", id).into());
            }
            if network.channel.is_empty() {
                return Err(format!("Network [{}]: channel cannot be empty", id).into());
            }
            if network.max_line_length < MIN_LINE_LENGTH {
                return Err(format!(
                    "Network [{}]: max_line_length must be at least {}",
                    id, MIN_LINE_LENGTH
                )
                .into());
            }
        }

        topology::resolve_targets(&self.networks)?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            relay: RelaySettings::default(),
            networks: vec![
                NetworkConfig::new("irc.rizon.net", 6697, "ii", "#computertech", "R"),
                NetworkConfig::new("irc.technet.chat", 6697, "ii", "#computertech", "T"),
                NetworkConfig::new("irc.swiftirc.net", 6697, "ii", "#computertech", "S"),
            ],
        }
    }
}
