//! IRC line parsing and serialization
//!
//! Lines follow the RFC 1459 shape: an optional `:source`, a command, then
//! positional arguments with an optional `:`-prefixed trailing argument.

use crate::utils::string::escape_message;
use std::fmt;

/// Commands the relay produces or reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick,
    User,
    Join,
    PrivMsg,
    Notice,
    Invite,
    Ping,
    Pong,
    Error,
    /// Three-digit server reply such as `001`
    Numeric(u16),
    /// Anything else; dispatch ignores it
    Other(String),
}

impl Command {
    /// RPL_WELCOME, sent once registration completes
    pub const WELCOME: Command = Command::Numeric(1);
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Command::Nick => "NICK",
            Command::User => "USER",
            Command::Join => "JOIN",
            Command::PrivMsg => "PRIVMSG",
            Command::Notice => "NOTICE",
            Command::Invite => "INVITE",
            Command::Ping => "PING",
            Command::Pong => "PONG",
            Command::Error => "ERROR",
            Command::Numeric(code) => return write!(f, "{:03}", code),
            Command::Other(cmd) => cmd,
        };
        write!(f, "{}", s)
    }
}

impl From<&str> for Command {
    fn from(s: &str) -> Self {
        if s.len() == 3 && s.bytes().all(|b| b.is_ascii_digit()) {
            if let Ok(code) = s.parse() {
                return Command::Numeric(code);
            }
        }

        match s.to_uppercase().as_str() {
            "NICK" => Command::Nick,
            "USER" => Command::User,
            "JOIN" => Command::Join,
            "PRIVMSG" => Command::PrivMsg,
            "NOTICE" => Command::Notice,
            "INVITE" => Command::Invite,
            "PING" => Command::Ping,
            "PONG" => Command::Pong,
            "ERROR" => Command::Error,
            _ => Command::Other(s.to_string()),
        }
    }
}

/// A single protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Prefix without the leading colon, typically `nick!user@host`
    pub source: Option<String>,
    pub command: Command,
    /// Positional arguments; the last one may contain spaces
    pub args: Vec<String>,
    /// Whether the last argument is written with a leading `:`
    pub trailing: bool,
}

impl Message {
    /// Create a message whose arguments are all positional
    pub fn new(command: Command, args: Vec<String>) -> Self {
        Self {
            source: None,
            command,
            args,
            trailing: false,
        }
    }

    /// Create a message whose last argument is a trailing argument
    pub fn with_trailing(command: Command, mut args: Vec<String>, trailing: impl Into<String>) -> Self {
        args.push(trailing.into());
        Self {
            source: None,
            command,
            args,
            trailing: true,
        }
    }

    /// Parse one line with its terminator already removed.
    ///
    /// Returns `None` for blank input or a bare source with no command.
    /// No command validation happens here; handlers check argument counts.
    pub fn parse(line: &str) -> Option<Self> {
        let parts = line.split_whitespace().collect::<Vec<_>>();
        let first = *parts.first()?;

        let (source, rest) = match first.strip_prefix(':') {
            Some(source) => (Some(source.to_string()), &parts[1..]),
            None => (None, &parts[..]),
        };
        let (command, params) = rest.split_first()?;

        let mut args = Vec::with_capacity(params.len());
        let mut trailing = false;
        for (i, part) in params.iter().enumerate() {
            if part.starts_with(':') {
                let last = params[i..].join(" ");
                args.push(last[1..].to_string());
                trailing = true;
                break;
            }
            args.push(part.to_string());
        }

        Some(Message {
            source,
            command: Command::from(*command),
            args,
            trailing,
        })
    }

    /// Nickname portion of the source (everything before `!`)
    pub fn source_nick(&self) -> Option<&str> {
        self.source
            .as_deref()
            .and_then(|s| s.split('!').next())
            .filter(|nick| !nick.is_empty())
    }

    /// Argument at `index`, if the line carried that many
    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    /// Serialize to a CRLF-terminated wire line
    pub fn to_line(&self) -> String {
        format!("{}\r\n", self)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ref source) = self.source {
            write!(f, ":{} ", source)?;
        }

        write!(f, "{}", self.command)?;

        // Arguments may carry peer-controlled text; CR, LF and NUL never
        // reach the wire so one message stays one line
        let last = self.args.len().saturating_sub(1);
        for (i, arg) in self.args.iter().enumerate() {
            let arg = escape_message(arg);
            if i == last && (self.trailing || arg.is_empty() || arg.contains(' ') || arg.starts_with(':')) {
                write!(f, " :{}", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}
