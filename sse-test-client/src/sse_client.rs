use anyhow::Result;
use eventsource_client::{self as es, Client};
use futures_util::stream::StreamExt;
use log::*;
use serde_json::Value;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;

/// Event type reported for frames sent without an `event:` line.
pub const UNNAMED_EVENT: &str = "message";

#[derive(Debug, Clone)]
pub struct Event {
    pub event_type: String,
    pub data: Value,
}

pub struct Connection {
    pub user_label: String,
    event_rx: mpsc::UnboundedReceiver<Event>,
    _handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    /// Opens `GET {base_url}/sse` as `user_id`, passing the id in `identity_header`.
    pub async fn establish(
        base_url: &str,
        identity_header: &str,
        user_id: &str,
        user_label: String,
    ) -> Result<Self> {
        let url = format!("{}/sse", base_url);
        let (tx, rx) = mpsc::unbounded_channel();

        let client = es::ClientBuilder::for_url(&url)?
            .header(identity_header, user_id)?
            .reconnect(es::ReconnectOptions::reconnect(false).build())
            .build();

        let label = user_label.clone();
        let handle = tokio::spawn(async move {
            let mut stream = client.stream();

            loop {
                match stream.next().await {
                    Some(Ok(es::SSE::Event(event))) => {
                        let data = serde_json::from_str(&event.data)
                            .unwrap_or(Value::String(event.data.clone()));
                        let sse_event = Event {
                            event_type: event.event_type,
                            data,
                        };

                        if tx.send(sse_event).is_err() {
                            debug!("SSE receiver dropped for {}", label);
                            break;
                        }
                    }
                    Some(Ok(es::SSE::Comment(comment))) => {
                        trace!("SSE comment for {}: {}", label, comment);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!("SSE error for {}: {}", label, e);
                        break;
                    }
                    None => {
                        debug!("SSE stream ended for {}", label);
                        break;
                    }
                }
            }
        });

        Ok(Self {
            user_label,
            event_rx: rx,
            _handle: handle,
        })
    }

    pub async fn wait_for_event(&mut self, event_type: &str, timeout: Duration) -> Result<Event> {
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                anyhow::bail!("Timeout waiting for event: {}", event_type);
            }

            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(event)) if event.event_type == event_type => {
                    return Ok(event);
                }
                Ok(Some(_)) => {
                    // Wrong event type, keep waiting
                    continue;
                }
                Ok(None) => {
                    anyhow::bail!("SSE connection closed");
                }
                Err(_) => {
                    anyhow::bail!("Timeout waiting for event: {}", event_type);
                }
            }
        }
    }

    /// Succeeds if no `event_type` event arrives within `window`.
    pub async fn expect_no_event(&mut self, event_type: &str, window: Duration) -> Result<()> {
        match self.wait_for_event(event_type, window).await {
            Ok(event) => anyhow::bail!(
                "{} unexpectedly received {} event: {}",
                self.user_label,
                event_type,
                event.data
            ),
            Err(_) => Ok(()),
        }
    }

    /// Waits for the server to end the stream, e.g. after a newer connection
    /// for the same user replaced this one.
    pub async fn wait_for_close(&mut self, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match tokio::time::timeout(remaining, self.event_rx.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return Ok(()),
                Err(_) => anyhow::bail!("{} stream still open", self.user_label),
            }
        }
    }
}
