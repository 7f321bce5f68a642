//! Integration tests for building and running a whole relay

use ircrelay_core::*;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream};

type Server = BufReader<DuplexStream>;

/// Hands out pre-made in-memory streams keyed by network identifier
struct MemoryConnector {
    streams: Mutex<HashMap<String, DuplexStream>>,
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn open(&self, network: &NetworkConfig) -> Result<BoxedStream> {
        self.streams
            .lock()
            .remove(&network.network_identifier)
            .map(|stream| Box::new(stream) as BoxedStream)
            .ok_or_else(|| Error::Connection(format!("Failed to connect to {}", network.address())))
    }
}

fn config(ids: &[&str]) -> Config {
    let networks = ids
        .iter()
        .map(|id| {
            let mut network = NetworkConfig::new(
                format!("irc.{}.example", id.to_lowercase()),
                6667,
                "relay",
                "#lobby",
                *id,
            );
            network.tls = false;
            network
        })
        .collect();
    Config { relay: RelaySettings::default(), networks }
}

/// Connector with streams for `reachable`, plus the server ends
fn connector(reachable: &[&str]) -> (Arc<MemoryConnector>, HashMap<String, Server>) {
    let mut streams = HashMap::new();
    let mut servers = HashMap::new();
    for id in reachable {
        let (ours, theirs) = tokio::io::duplex(8192);
        streams.insert(id.to_string(), ours);
        servers.insert(id.to_string(), BufReader::new(theirs));
    }
    (Arc::new(MemoryConnector { streams: Mutex::new(streams) }), servers)
}

async fn next_line(server: &mut Server) -> Option<String> {
    let mut line = String::new();
    let read = tokio::time::timeout(Duration::from_millis(500), server.read_line(&mut line)).await;
    match read {
        Ok(Ok(n)) if n > 0 => Some(line.trim_end_matches(&['\r', '\n'][..]).to_string()),
        _ => None,
    }
}

async fn send(server: &mut Server, line: &str) {
    server.get_mut().write_all(format!("{}\r\n", line).as_bytes()).await.unwrap();
}

/// Drain registration and complete the welcome/join exchange
async fn welcome(server: &mut Server) {
    assert_eq!(next_line(server).await.as_deref(), Some("NICK relay"));
    assert_eq!(next_line(server).await.as_deref(), Some("USER relay 0 * :relay"));
    send(server, ":irc.example 001 relay :Welcome").await;
    assert_eq!(next_line(server).await.as_deref(), Some("JOIN #lobby"));
}

#[tokio::test]
async fn test_three_network_ring() {
    let (connector, mut servers) = connector(&["R", "T", "S"]);
    let relay = Relay::new(&config(&["R", "T", "S"]), connector).unwrap();
    let run = tokio::spawn(relay.run());

    for id in ["R", "T", "S"] {
        welcome(servers.get_mut(id).unwrap()).await;
    }

    send(servers.get_mut("T").unwrap(), ":dave!d@host PRIVMSG #lobby :hello rizon?").await;
    let expected = format!("PRIVMSG #lobby :[T] <{}> hello rizon?", colorize("dave"));
    assert_eq!(next_line(servers.get_mut("S").unwrap()).await, Some(expected));
    assert_eq!(next_line(servers.get_mut("R").unwrap()).await, None);

    // Closing every server ends every session cleanly
    servers.clear();
    let reports = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
    assert_eq!(reports.len(), 3);
    assert!(reports.iter().all(SessionReport::is_clean));
}

#[tokio::test]
async fn test_failed_connection_isolated() {
    let (connector, mut servers) = connector(&["A", "B"]);
    let relay = Relay::new(&config(&["A", "B", "C"]), connector).unwrap();
    let run = tokio::spawn(relay.run());

    welcome(servers.get_mut("A").unwrap()).await;
    welcome(servers.get_mut("B").unwrap()).await;

    // A -> B still works
    send(servers.get_mut("A").unwrap(), ":erin!e@host PRIVMSG #lobby :ping?").await;
    let expected = format!("PRIVMSG #lobby :[A] <{}> ping?", colorize("erin"));
    assert_eq!(next_line(servers.get_mut("B").unwrap()).await, Some(expected));

    // B -> C has no live target; B keeps answering the server
    send(servers.get_mut("B").unwrap(), ":fred!f@host PRIVMSG #lobby :lost").await;
    send(servers.get_mut("B").unwrap(), "PING :b").await;
    assert_eq!(next_line(servers.get_mut("B").unwrap()).await.as_deref(), Some("PONG :b"));

    servers.clear();
    let reports = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
    let failed: Vec<_> = reports.iter().filter(|r| !r.is_clean()).collect();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].network, "C");
    assert!(matches!(failed[0].outcome, SessionOutcome::ConnectFailed(Error::Connection(_))));
}

#[tokio::test]
async fn test_idle_timeout_ends_session() {
    let mut config = config(&["A", "B"]);
    config.networks[0].idle_timeout_secs = Some(1);
    let (connector, mut servers) = connector(&["A", "B"]);
    let relay = Relay::new(&config, connector).unwrap();
    let run = tokio::spawn(relay.run());

    welcome(servers.get_mut("B").unwrap()).await;
    tokio::time::sleep(Duration::from_millis(1500)).await;
    servers.remove("B");

    let reports = tokio::time::timeout(Duration::from_secs(5), run).await.unwrap().unwrap();
    let a = reports.iter().find(|r| r.network == "A").unwrap();
    assert!(matches!(a.outcome, SessionOutcome::Failed(Error::IdleTimeout { seconds: 1, .. })));
    let b = reports.iter().find(|r| r.network == "B").unwrap();
    assert!(b.is_clean());
    drop(servers);
}

#[tokio::test]
async fn test_invalid_config_rejected() {
    let mut config = config(&["A", "B"]);
    config.networks[1].relay_to = Some("B".to_string());
    let (connector, _servers) = connector(&["A", "B"]);
    assert!(matches!(Relay::new(&config, connector), Err(Error::Config(_))));
}

#[test]
fn test_config_file_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("relay.toml");

    Config::default().to_file(&path).unwrap();
    let loaded = Config::from_file(&path).unwrap();
    assert_eq!(loaded.networks, Config::default().networks);
    assert!(loaded.validate().is_ok());
}

#[test]
fn test_config_file_explicit_topology() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r##"
[[networks]]
server = "irc.hub.example"
port = 6697
nickname = "relay"
channel = "#lobby"
network_identifier = "H"
relay_to = "L"

[[networks]]
server = "irc.leaf.example"
port = 6697
nickname = "relay"
channel = "#lobby"
network_identifier = "L"
relay_to = "H"
ignored_users = ["ChanServ"]
"##
    )
    .unwrap();

    let config = Config::from_file(file.path()).unwrap();
    assert!(config.validate().is_ok());
    assert_eq!(config.networks[0].relay_to.as_deref(), Some("L"));
    assert!(config.networks[1].is_ignored("chanserv"));
}

#[test]
fn test_missing_config_file() {
    assert!(matches!(Config::from_file("/nonexistent/relay.toml"), Err(Error::Config(_))));
}
