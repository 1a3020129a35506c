//! Tor control-port client.
//!
//! Every call opens its own TCP connection, authenticates, issues the signal
//! and closes the connection again, so concurrent callers never share a
//! control session.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::net::{TcpStream, lookup_host};
use tokio::time::timeout;

use crate::config::TorSettings;

/// Out-of-band channel able to request a fresh exit identity.
#[async_trait]
pub trait ControlChannel: Send + Sync {
    async fn signal_newnym(&self) -> Result<(), ControlError>;
}

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("could not resolve control host {0}")]
    Resolve(String),
    #[error("control connection failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("control exchange timed out after {0:?}")]
    Timeout(Duration),
    #[error("control command {command} rejected: {reply}")]
    Rejected { command: &'static str, reply: String },
}

/// Control-port client speaking the line-based Tor control protocol.
#[derive(Debug, Clone)]
pub struct TorControlClient {
    host: String,
    port: u16,
    password: Option<String>,
    timeout: Duration,
}

impl TorControlClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            password: None,
            timeout: Duration::from_secs(10),
        }
    }

    pub fn from_settings(settings: &TorSettings, timeout: Duration) -> Self {
        Self {
            host: settings.host.clone(),
            port: settings.control_port,
            password: settings.control_password.clone(),
            timeout,
        }
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn authenticate_line(&self) -> String {
        match self.password {
            Some(ref password) => {
                let escaped = password.replace('\\', "\\\\").replace('"', "\\\"");
                format!("AUTHENTICATE \"{escaped}\"\r\n")
            }
            None => "AUTHENTICATE\r\n".to_string(),
        }
    }

    async fn exchange(&self) -> Result<(), ControlError> {
        let addr = lookup_host((self.host.as_str(), self.port))
            .await
            .map_err(|_| ControlError::Resolve(self.host.clone()))?
            .next()
            .ok_or_else(|| ControlError::Resolve(self.host.clone()))?;
        log::info!("[TOR] connecting to control port {} ({addr})", self.host);

        let stream = TcpStream::connect(addr).await?;
        let (read_half, mut write_half) = stream.into_split();
        let mut reader = BufReader::new(read_half);

        send_command(&mut reader, &mut write_half, "AUTHENTICATE", &self.authenticate_line()).await?;
        send_command(&mut reader, &mut write_half, "SIGNAL NEWNYM", "SIGNAL NEWNYM\r\n").await?;
        send_command(&mut reader, &mut write_half, "QUIT", "QUIT\r\n").await?;
        write_half.shutdown().await?;
        Ok(())
    }
}

#[async_trait]
impl ControlChannel for TorControlClient {
    async fn signal_newnym(&self) -> Result<(), ControlError> {
        timeout(self.timeout, self.exchange())
            .await
            .map_err(|_| ControlError::Timeout(self.timeout))?
    }
}

async fn send_command<R, W>(
    reader: &mut BufReader<R>,
    writer: &mut W,
    command: &'static str,
    line: &str,
) -> Result<(), ControlError>
where
    R: tokio::io::AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    writer.write_all(line.as_bytes()).await?;
    writer.flush().await?;

    let reply = read_reply(reader).await?;
    if reply.starts_with("250") {
        Ok(())
    } else {
        Err(ControlError::Rejected { command, reply })
    }
}

/// Reads one (possibly multi-line) reply and returns its final line.
async fn read_reply<R>(reader: &mut BufReader<R>) -> Result<String, ControlError>
where
    R: tokio::io::AsyncRead + Unpin,
{
    loop {
        let mut line = String::new();
        let read = reader.read_line(&mut line).await?;
        if read == 0 {
            return Err(ControlError::Io(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                "control connection closed mid-reply",
            )));
        }
        let line = line.trim_end().to_string();
        // "250-" and "250+" continue a reply, "250 " ends it.
        if line.len() < 4 || line.as_bytes()[3] == b' ' {
            return Ok(line);
        }
    }
}
