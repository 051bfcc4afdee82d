//! Request/response plumbing between the console and the game server.
//!
//! Everything here is blocking; callers that must stay responsive run these
//! calls on a worker thread and hand the result back to their event loop.

use custodian_core::{CommandRequest, CommandResponse, LinkConfig, Snapshot};
use reqwest::blocking::Client;
use reqwest::header::ACCEPT;
use serde_json::Value;
use std::error::Error as StdError;
use std::io::{BufRead, BufReader};
use thiserror::Error;

mod boot;

pub use boot::{BootFeed, BootSource, FALLBACK_BOOT_LINES, SseDecoder, SseFrame};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    /// The request never produced a readable response.
    #[error("transport failure: {0}")]
    Transport(String),
    /// A response arrived but its body could not be decoded.
    #[error("undecodable response: {0}")]
    Decode(String),
}

pub trait ConsoleLink: Send + Sync {
    fn send_command(&self, request: &CommandRequest) -> Result<CommandResponse, LinkError>;

    fn fetch_snapshot(&self) -> Result<Snapshot, LinkError>;

    /// Open the server-push boot stream. The reader yields raw event-stream text.
    fn open_boot_stream(&self) -> Result<Box<dyn BufRead + Send>, LinkError>;
}

#[derive(Debug, Clone)]
pub struct HttpLink {
    cfg: LinkConfig,
    client: Client,
    stream_client: Client,
}

impl HttpLink {
    pub fn new(cfg: LinkConfig) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(cfg.timeout()).build()?;
        // The boot stream stays open for as long as the server keeps talking.
        let stream_client = Client::builder().timeout(None).build()?;
        Ok(Self {
            cfg,
            client,
            stream_client,
        })
    }

    fn read_json(&self, resp: reqwest::blocking::Response) -> Result<Value, LinkError> {
        let body = resp.text().map_err(|e| transport_error(&e))?;
        serde_json::from_str(&body).map_err(|e| LinkError::Decode(e.to_string()))
    }
}

impl ConsoleLink for HttpLink {
    fn send_command(&self, request: &CommandRequest) -> Result<CommandResponse, LinkError> {
        let resp = self
            .client
            .post(self.cfg.command_url())
            .json(request)
            .send()
            .map_err(|e| transport_error(&e))?;
        let value = self.read_json(resp)?;
        Ok(CommandResponse::from_value(&value))
    }

    fn fetch_snapshot(&self) -> Result<Snapshot, LinkError> {
        let resp = self
            .client
            .get(self.cfg.snapshot_url())
            .send()
            .map_err(|e| transport_error(&e))?;
        let value = self.read_json(resp)?;
        Snapshot::from_value(value).map_err(|e| LinkError::Decode(e.to_string()))
    }

    fn open_boot_stream(&self) -> Result<Box<dyn BufRead + Send>, LinkError> {
        let resp = self
            .stream_client
            .get(self.cfg.boot_stream_url())
            .header(ACCEPT, "text/event-stream")
            .send()
            .map_err(|e| transport_error(&e))?;
        if !resp.status().is_success() {
            return Err(LinkError::Transport(format!(
                "boot stream returned HTTP {}",
                resp.status().as_u16()
            )));
        }
        Ok(Box::new(BufReader::new(resp)))
    }
}

fn transport_error(err: &reqwest::Error) -> LinkError {
    if err.is_timeout() {
        return LinkError::Transport("request timed out".to_string());
    }
    if err.is_connect() {
        let detail = err.source().map(|e| e.to_string()).unwrap_or_default();
        return LinkError::Transport(format!("could not reach server {detail}").trim().to_string());
    }
    LinkError::Transport(err.to_string())
}
