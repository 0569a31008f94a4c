//! NATS integration for the simulation event feed.
//!
//! The simulation publishes one JSON snapshot per message on the configured
//! feed subject (`{ "tick": N, "objects": { room: { id: fields } } }`). The
//! runner subscribes before resuming the simulation so no early tick is
//! missed, and turns the subscription into a stream of [`TickEvent`]s.
//! Payloads that do not decode are logged and dropped.

use futures::stream::BoxStream;
use futures::{StreamExt, future};
use milestone_types::TickEvent;
use tracing::{debug, info, warn};

use crate::error::RunnerError;

/// NATS client wrapper for the milestone runner.
pub struct NatsClient {
    client: async_nats::Client,
}

impl NatsClient {
    /// Connect to a NATS server.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if the connection cannot be established.
    pub async fn connect(url: &str) -> Result<Self, RunnerError> {
        info!(url = url, "connecting to NATS server");
        let client = async_nats::connect(url)
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to connect to {url}: {e}")))?;
        info!("NATS connection established");
        Ok(Self { client })
    }

    /// Subscribe to the snapshot feed and decode it into tick events.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Nats`] if the subscription fails.
    pub async fn subscribe_feed(
        &self,
        subject: &str,
    ) -> Result<BoxStream<'static, TickEvent>, RunnerError> {
        debug!(subject = subject, "subscribing to event feed");
        let subscriber = self
            .client
            .subscribe(subject.to_owned())
            .await
            .map_err(|e| RunnerError::Nats(format!("failed to subscribe to {subject}: {e}")))?;
        info!(subject = subject, "subscribed to event feed");

        let events = subscriber.filter_map(|message| {
            let event = match Self::decode_event(&message.payload) {
                Ok(event) => {
                    debug!(
                        tick = event.tick,
                        rooms = event.objects.len(),
                        payload_size = message.payload.len(),
                        "received snapshot"
                    );
                    Some(event)
                }
                Err(e) => {
                    warn!(
                        subject = %message.subject,
                        error = %e,
                        "failed to decode snapshot, skipping"
                    );
                    None
                }
            };
            future::ready(event)
        });
        Ok(events.boxed())
    }

    /// Deserialize a feed payload into a [`TickEvent`].
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Decode`] if deserialization fails.
    pub fn decode_event(data: &[u8]) -> Result<TickEvent, RunnerError> {
        serde_json::from_slice(data)
            .map_err(|e| RunnerError::Decode(format!("failed to deserialize snapshot: {e}")))
    }
}

impl std::fmt::Debug for NatsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NatsClient")
            .field("connected", &true)
            .finish()
    }
}
