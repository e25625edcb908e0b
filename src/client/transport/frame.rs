//! # STOMP Frame Codec
//!
//! Text frames exchanged over the realtime WebSocket:
//!
//! ```text
//! COMMAND\n
//! key:value\n
//! ...
//! \n
//! body\0
//! ```
//!
//! Header keys and values use STOMP 1.2 escaping (`\\`, `\n`, `\r`, `\c`).
//! Decoding accepts `\r\n` line endings, leading heart-beat newlines and a
//! missing trailing NUL.

use std::fmt;

use thiserror::Error;

/// Frame decoding errors
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FrameError {
    #[error("frame has no command")]
    EmptyCommand,
    #[error("unknown command '{0}'")]
    UnknownCommand(String),
    #[error("header line without ':' ('{0}')")]
    MissingColon(String),
    #[error("invalid escape sequence in '{0}'")]
    InvalidEscape(String),
}

/// Frame commands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StompCommand {
    Connect,
    Connected,
    Subscribe,
    Unsubscribe,
    Send,
    Message,
    Receipt,
    Error,
    Disconnect,
}

impl StompCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "CONNECT",
            Self::Connected => "CONNECTED",
            Self::Subscribe => "SUBSCRIBE",
            Self::Unsubscribe => "UNSUBSCRIBE",
            Self::Send => "SEND",
            Self::Message => "MESSAGE",
            Self::Receipt => "RECEIPT",
            Self::Error => "ERROR",
            Self::Disconnect => "DISCONNECT",
        }
    }

    fn parse(line: &str) -> Result<Self, FrameError> {
        match line {
            "" => Err(FrameError::EmptyCommand),
            "CONNECT" | "STOMP" => Ok(Self::Connect),
            "CONNECTED" => Ok(Self::Connected),
            "SUBSCRIBE" => Ok(Self::Subscribe),
            "UNSUBSCRIBE" => Ok(Self::Unsubscribe),
            "SEND" => Ok(Self::Send),
            "MESSAGE" => Ok(Self::Message),
            "RECEIPT" => Ok(Self::Receipt),
            "ERROR" => Ok(Self::Error),
            "DISCONNECT" => Ok(Self::Disconnect),
            other => Err(FrameError::UnknownCommand(other.to_string())),
        }
    }
}

impl fmt::Display for StompCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single frame; headers keep their wire order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StompFrame {
    pub command: StompCommand,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl StompFrame {
    pub fn new(command: StompCommand) -> Self {
        Self {
            command,
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Append a header
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((key.into(), value.into()));
        self
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// First value of header `name`
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn destination(&self) -> Option<&str> {
        self.header("destination")
    }

    pub fn connect(host: &str) -> Self {
        Self::new(StompCommand::Connect)
            .with_header("accept-version", "1.2")
            .with_header("host", host)
            .with_header("heart-beat", "0,0")
    }

    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(StompCommand::Subscribe)
            .with_header("id", id)
            .with_header("destination", destination)
    }

    pub fn unsubscribe(id: &str) -> Self {
        Self::new(StompCommand::Unsubscribe).with_header("id", id)
    }

    /// SEND with a JSON body
    pub fn send(destination: &str, body: impl Into<String>) -> Self {
        Self::new(StompCommand::Send)
            .with_header("destination", destination)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn disconnect() -> Self {
        Self::new(StompCommand::Disconnect)
    }

    /// Wire text including the trailing NUL
    pub fn encode(&self) -> String {
        let mut out = String::with_capacity(self.body.len() + 64);
        out.push_str(self.command.as_str());
        out.push('\n');
        for (key, value) in &self.headers {
            escape_into(&mut out, key);
            out.push(':');
            escape_into(&mut out, value);
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }

    /// Parse one frame
    pub fn decode(text: &str) -> Result<Self, FrameError> {
        let text = text.trim_start_matches(is_eol);
        let text = match text.find('\0') {
            Some(end) => &text[..end],
            None => text,
        };

        let mut rest = text;
        let command = StompCommand::parse(next_line(&mut rest))?;

        let mut headers = Vec::new();
        while !rest.is_empty() {
            let line = next_line(&mut rest);
            if line.is_empty() {
                break;
            }
            let (key, value) = line
                .split_once(':')
                .ok_or_else(|| FrameError::MissingColon(line.to_string()))?;
            headers.push((unescape(key)?, unescape(value)?));
        }

        Ok(Self {
            command,
            headers,
            body: rest.to_string(),
        })
    }

    /// Parse every NUL-terminated frame of a payload; heart-beats are skipped
    pub fn decode_all(text: &str) -> Result<Vec<Self>, FrameError> {
        text.split('\0')
            .filter(|chunk| !chunk.trim_start_matches(is_eol).is_empty())
            .map(Self::decode)
            .collect()
    }
}

impl fmt::Display for StompFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.command)?;
        if let Some(destination) = self.destination() {
            write!(f, " {destination}")?;
        }
        Ok(())
    }
}

fn is_eol(ch: char) -> bool {
    ch == '\r' || ch == '\n'
}

fn next_line<'a>(rest: &mut &'a str) -> &'a str {
    let (line, remainder) = match rest.find('\n') {
        Some(i) => (&rest[..i], &rest[i + 1..]),
        None => (*rest, ""),
    };
    *rest = remainder;
    line.strip_suffix('\r').unwrap_or(line)
}

fn escape_into(out: &mut String, raw: &str) {
    for ch in raw.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            other => out.push(other),
        }
    }
}

fn unescape(raw: &str) -> Result<String, FrameError> {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            _ => return Err(FrameError::InvalidEscape(raw.to_string())),
        }
    }
    Ok(out)
}
