//! Per-network session
//!
//! A [`Session`] owns one network connection. Its read loop runs on a
//! single task and is the only code that touches the joined flag or changes
//! the current channel. Other sessions reach it through a [`SessionHandle`]
//! to relay lines into its channel; every write holds the session's writer
//! lock for exactly one line, so lines from different senders never
//! interleave.

use crate::{
    config::{InvitePolicy, JoinTrigger, LoopGuard, NetworkConfig},
    format,
    message::{Command, Message},
    transport::{BoxedStream, Connector},
    Error, Result,
};
use parking_lot::RwLock;
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;
use tokio::{
    io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader, ReadHalf, WriteHalf},
    sync::Mutex,
};
use tracing::{debug, info, warn};

type LineReader = BufReader<ReadHalf<BoxedStream>>;
type LineWriter = WriteHalf<BoxedStream>;

/// Whether a sent message continues to the relay target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Send here, then forward one hop to the relay target
    Relay,
    /// Send here only
    Local,
}

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No stream yet
    Connecting,
    /// NICK/USER written
    Registered,
    /// JOIN written for the current channel
    Joined,
    /// Stream ended; terminal
    Closed,
}

/// State reachable from other sessions
struct Link {
    network: NetworkConfig,
    loop_guard: LoopGuard,
    channel: RwLock<String>,
    writer: Mutex<Option<LineWriter>>,
    target: OnceLock<Weak<Link>>,
}

impl Link {
    fn id(&self) -> &str {
        &self.network.network_identifier
    }

    fn channel(&self) -> String {
        self.channel.read().clone()
    }

    fn target(&self) -> Option<Arc<Link>> {
        self.target.get().and_then(Weak::upgrade)
    }

    async fn write_lines(&self, messages: &[Message]) -> Result<()> {
        let mut guard = self.writer.lock().await;
        let writer = guard
            .as_mut()
            .ok_or_else(|| Error::NotConnected(self.id().to_string()))?;

        for message in messages {
            writer.write_all(message.to_line().as_bytes()).await?;
        }
        writer.flush().await?;
        Ok(())
    }

    async fn privmsg(&self, text: &str) -> Result<()> {
        let message = Message::with_trailing(Command::PrivMsg, vec![self.channel()], text);
        self.write_lines(&[message]).await?;
        debug!("[{}] Sent message: {}", self.id(), text);
        Ok(())
    }

    /// Write `text` into the relay target's channel. Never continues past
    /// the target. Returns false when there is no live target.
    async fn forward(&self, text: &str) -> Result<bool> {
        let Some(target) = self.target() else {
            return Ok(false);
        };

        target.privmsg(text).await.map_err(|e| Error::PeerWrite {
            network: target.id().to_string(),
            source: Box::new(e),
        })?;
        Ok(true)
    }

    async fn send_message(&self, text: &str, delivery: Delivery) -> Result<()> {
        self.privmsg(text).await?;

        if delivery == Delivery::Local {
            return Ok(());
        }

        let tagged = match self.loop_guard {
            LoopGuard::Tag if text.starts_with('[') => text.to_string(),
            _ => format::tag(self.id(), text),
        };
        self.forward(&tagged).await?;
        Ok(())
    }

    async fn close(&self) {
        if let Some(mut writer) = self.writer.lock().await.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("[{}] Error shutting down stream: {}", self.id(), e);
            }
        }
    }
}

/// Cloneable handle used to wire relay targets and send from outside the
/// session's own task
#[derive(Clone)]
pub struct SessionHandle {
    link: Arc<Link>,
}

impl SessionHandle {
    /// Network identifier
    pub fn id(&self) -> &str {
        self.link.id()
    }

    /// Channel the session currently relays
    pub fn channel(&self) -> String {
        self.link.channel()
    }

    /// Send `text` to this session's channel, forwarding one hop when
    /// `delivery` is [`Delivery::Relay`]
    pub async fn send_message(&self, text: &str, delivery: Delivery) -> Result<()> {
        self.link.send_message(text, delivery).await
    }
}

/// One network connection
pub struct Session {
    link: Arc<Link>,
    reader: Option<LineReader>,
    joined: bool,
    state: SessionState,
}

impl Session {
    /// Create an unconnected session
    pub fn new(network: NetworkConfig, loop_guard: LoopGuard) -> Self {
        let channel = RwLock::new(network.channel.clone());
        Self {
            link: Arc::new(Link {
                network,
                loop_guard,
                channel,
                writer: Mutex::new(None),
                target: OnceLock::new(),
            }),
            reader: None,
            joined: false,
            state: SessionState::Connecting,
        }
    }

    pub fn id(&self) -> &str {
        self.link.id()
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.link.network
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn channel(&self) -> String {
        self.link.channel()
    }

    pub fn is_joined(&self) -> bool {
        self.joined
    }

    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            link: Arc::clone(&self.link),
        }
    }

    /// Fix the session this one forwards to. The reference is weak: the
    /// target may close and drop independently, after which forwarding is
    /// skipped.
    pub fn set_relay_target(&self, target: &SessionHandle) -> Result<()> {
        if Arc::ptr_eq(&self.link, &target.link) {
            return Err(Error::Config(format!("Network [{}] cannot relay to itself", self.id())));
        }

        self.link
            .target
            .set(Arc::downgrade(&target.link))
            .map_err(|_| Error::Config(format!("Network [{}] already has a relay target", self.id())))
    }

    /// Identifier of the live relay target, if any
    pub fn relay_target(&self) -> Option<String> {
        self.link.target().map(|t| t.id().to_string())
    }

    /// Open the stream through `connector` and register
    pub async fn connect(&mut self, connector: &dyn Connector) -> Result<()> {
        let stream = connector.open(&self.link.network).await?;
        self.attach(stream).await?;

        info!(
            "Connected to {} as {}",
            self.link.network.address(),
            self.link.network.nickname
        );
        if let Some(target) = self.link.target() {
            info!("[{}] Relaying to: {}", self.id(), target.network.server);
        }
        Ok(())
    }

    /// Take over an already-open stream and register on it
    pub async fn attach(&mut self, stream: BoxedStream) -> Result<()> {
        let (read_half, write_half) = tokio::io::split(stream);
        self.reader = Some(BufReader::new(read_half));
        *self.link.writer.lock().await = Some(write_half);
        self.joined = false;

        let nick = &self.link.network.nickname;
        self.link
            .write_lines(&[
                Message::new(Command::Nick, vec![nick.clone()]),
                Message::with_trailing(
                    Command::User,
                    vec![nick.clone(), "0".to_string(), "*".to_string()],
                    nick.clone(),
                ),
            ])
            .await?;
        self.state = SessionState::Registered;

        if self.link.network.join_on == JoinTrigger::Connect {
            self.join_channel().await?;
        }
        Ok(())
    }

    /// Send JOIN for the current channel
    pub async fn join_channel(&mut self) -> Result<()> {
        let channel = self.link.channel();
        self.link
            .write_lines(&[Message::new(Command::Join, vec![channel.clone()])])
            .await?;
        self.joined = true;
        self.state = SessionState::Joined;
        info!("[{}] Joined channel {}", self.id(), channel);
        Ok(())
    }

    /// Send `text` to the current channel, forwarding one hop when
    /// `delivery` is [`Delivery::Relay`]
    pub async fn send_message(&self, text: &str, delivery: Delivery) -> Result<()> {
        self.link.send_message(text, delivery).await
    }

    /// Read and dispatch lines until the server closes the stream.
    ///
    /// End of stream returns `Ok(())`. Read and local write failures end
    /// this session only; failures writing to the relay target are logged
    /// and the loop continues.
    pub async fn listen(&mut self) -> Result<()> {
        let mut reader = self
            .reader
            .take()
            .ok_or_else(|| Error::NotConnected(self.id().to_string()))?;

        let result = self.read_loop(&mut reader).await;

        self.state = SessionState::Closed;
        self.link.close().await;
        result
    }

    async fn read_loop(&mut self, reader: &mut LineReader) -> Result<()> {
        let limit = self.link.network.max_line_length;
        let mut buf = Vec::with_capacity(limit);
        let mut oversized = false;
        loop {
            buf.clear();
            if self.read_line(reader, &mut buf).await? == 0 {
                info!("[{}] Connection closed by server", self.id());
                return Ok(());
            }

            // A full chunk without a terminator is the head of an overlong
            // line; drop it and everything up to the next newline
            if buf.len() >= limit && buf.last() != Some(&b'\n') {
                if !oversized {
                    warn!("[{}] Discarding line longer than {} bytes", self.id(), limit);
                    oversized = true;
                }
                continue;
            }
            if oversized {
                oversized = false;
                continue;
            }

            let line = String::from_utf8_lossy(&buf);
            let line = line.trim_end_matches(&['\r', '\n'][..]);
            debug!("[{}] Received message: {}", self.id(), line);

            if let Some(message) = Message::parse(line) {
                self.dispatch(message).await?;
            }
        }
    }

    /// Read at most `max_line_length` bytes, stopping after a newline
    async fn read_line(&mut self, reader: &mut LineReader, buf: &mut Vec<u8>) -> Result<usize> {
        let mut limited = (&mut *reader).take(self.link.network.max_line_length as u64);
        let read = limited.read_until(b'\n', buf);
        let n = match self.link.network.idle_timeout_secs {
            Some(seconds) => tokio::time::timeout(Duration::from_secs(seconds), read)
                .await
                .map_err(|_| Error::IdleTimeout {
                    network: self.id().to_string(),
                    seconds,
                })??,
            None => read.await?,
        };
        Ok(n)
    }

    async fn dispatch(&mut self, message: Message) -> Result<()> {
        match message.command {
            Command::Ping => self.on_ping(&message).await,
            Command::Numeric(1) => self.on_welcome().await,
            Command::PrivMsg => {
                self.on_privmsg(&message).await;
                Ok(())
            }
            Command::Invite => self.on_invite(&message).await,
            Command::Error => {
                warn!("[{}] Server error: {}", self.id(), message.args.join(" "));
                Ok(())
            }
            _ => Ok(()),
        }
    }

    async fn on_ping(&mut self, message: &Message) -> Result<()> {
        let Some(token) = message.arg(0) else {
            debug!("[{}] PING without token ignored", self.id());
            return Ok(());
        };

        self.link
            .write_lines(&[Message::with_trailing(Command::Pong, vec![], token)])
            .await?;
        debug!("[{}] Sent PONG response", self.id());

        if self.link.network.join_on == JoinTrigger::FirstPing && !self.joined {
            self.join_channel().await?;
        }
        Ok(())
    }

    async fn on_welcome(&mut self) -> Result<()> {
        if self.link.network.join_on == JoinTrigger::Welcome && !self.joined {
            self.join_channel().await?;
        }
        Ok(())
    }

    /// Relay a channel message one hop. The channel and the ignore list
    /// match ASCII case-insensitively, so `#Lobby` and `#lobby` are the same
    /// channel.
    async fn on_privmsg(&mut self, message: &Message) {
        let (Some(channel), Some(text)) = (message.arg(0), message.arg(1)) else {
            debug!("[{}] PRIVMSG without text ignored", self.id());
            return;
        };
        if !channel.eq_ignore_ascii_case(&self.link.channel()) {
            return;
        }
        let Some(nick) = message.source_nick() else {
            return;
        };
        if self.link.network.is_ignored(nick) {
            debug!("[{}] Ignoring message from {}", self.id(), nick);
            return;
        }

        let line = format::relay_line(self.id(), nick, text);
        match self.link.forward(&line).await {
            Ok(true) => {}
            Ok(false) => debug!("[{}] No relay target, message from {} dropped", self.id(), nick),
            Err(e) => warn!("[{}] {}", self.id(), e),
        }
    }

    async fn on_invite(&mut self, message: &Message) -> Result<()> {
        let (Some(nick), Some(channel)) = (message.arg(0), message.arg(1)) else {
            return Ok(());
        };
        if !nick.eq_ignore_ascii_case(&self.link.network.nickname) {
            return Ok(());
        }
        if self.link.network.invite_policy == InvitePolicy::Configured
            && !channel.eq_ignore_ascii_case(&self.link.network.channel)
        {
            info!("[{}] Declining invite to {}", self.id(), channel);
            return Ok(());
        }

        info!("[{}] Invited to {}", self.id(), channel);
        *self.link.channel.write() = channel.to_string();
        self.join_channel().await
    }
}
