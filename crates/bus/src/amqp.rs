//! AMQP implementation of [`EventPublisher`] on top of `lapin`.
//!
//! One connection, one channel, one durable topic exchange. Connection
//! loss is detected out-of-band through lapin's error callback, which
//! flips a degraded flag. A publish attempt on a dead channel reconnects
//! once and retries once; a second failure returns `Transient`. The whole
//! publish runs under the configured deadline, so a degraded broker never
//! stalls a request for long.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ExchangeDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use serde_json::Value;
use tokio::sync::Mutex;

use na_domain::config::BusConfig;
use na_domain::error::{Error, Result};

use crate::EventPublisher;

struct Inner {
    conn: Connection,
    channel: Channel,
}

pub struct AmqpPublisher {
    cfg: BusConfig,
    inner: Mutex<Option<Inner>>,
    degraded: Arc<AtomicBool>,
}

impl AmqpPublisher {
    /// Connect to the broker. A failure here does not abort startup: the
    /// publisher starts degraded and reconnects on the first publish.
    pub async fn connect(cfg: BusConfig) -> Self {
        let degraded = Arc::new(AtomicBool::new(false));
        let inner = match Self::establish(&cfg, &degraded).await {
            Ok(inner) => {
                tracing::info!(exchange = %cfg.exchange, "bus publisher connected");
                Some(inner)
            }
            Err(e) => {
                tracing::warn!(error = %e, "bus unreachable at startup; publisher starts degraded");
                degraded.store(true, Ordering::SeqCst);
                None
            }
        };
        Self {
            cfg,
            inner: Mutex::new(inner),
            degraded,
        }
    }

    async fn establish(cfg: &BusConfig, degraded: &Arc<AtomicBool>) -> Result<Inner> {
        let conn = Connection::connect(&cfg.url, ConnectionProperties::default())
            .await
            .map_err(|e| Error::Transient(format!("bus connect: {e}")))?;

        // Out-of-band liveness: lapin invokes this when the connection
        // dies between publishes.
        let flag = degraded.clone();
        conn.on_error(move |e| {
            tracing::warn!(error = %e, "bus connection error; publisher degraded");
            flag.store(true, Ordering::SeqCst);
        });

        let channel = conn
            .create_channel()
            .await
            .map_err(|e| Error::Transient(format!("bus channel: {e}")))?;
        channel
            .exchange_declare(
                &cfg.exchange,
                ExchangeKind::Topic,
                ExchangeDeclareOptions {
                    durable: true,
                    ..ExchangeDeclareOptions::default()
                },
                FieldTable::default(),
            )
            .await
            .map_err(|e| Error::Transient(format!("bus exchange declare: {e}")))?;

        degraded.store(false, Ordering::SeqCst);
        Ok(Inner { conn, channel })
    }

    async fn send(&self, channel: &Channel, topic: &str, body: &[u8]) -> Result<()> {
        channel
            .basic_publish(
                &self.cfg.exchange,
                topic,
                BasicPublishOptions::default(),
                body,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await
            .map_err(|e| Error::Transient(format!("bus publish: {e}")))?
            .await
            .map_err(|e| Error::Transient(format!("bus confirm: {e}")))?;
        Ok(())
    }

    /// One reconnect, one retry; the second failure is final.
    async fn publish_inner(&self, topic: &str, body: &[u8]) -> Result<()> {
        let mut guard = self.inner.lock().await;

        if guard.is_none() || self.degraded.load(Ordering::SeqCst) {
            *guard = Some(Self::establish(&self.cfg, &self.degraded).await?);
        }
        let inner = guard.as_ref().ok_or_else(|| Error::Transient("bus not connected".into()))?;

        match self.send(&inner.channel, topic, body).await {
            Ok(()) => Ok(()),
            Err(first) => {
                tracing::warn!(topic, error = %first, "publish failed; reconnecting once");
                *guard = Some(Self::establish(&self.cfg, &self.degraded).await?);
                let inner = guard.as_ref().ok_or_else(|| Error::Transient("bus not connected".into()))?;
                match self.send(&inner.channel, topic, body).await {
                    Ok(()) => Ok(()),
                    Err(second) => {
                        self.degraded.store(true, Ordering::SeqCst);
                        Err(second)
                    }
                }
            }
        }
    }
}

#[async_trait]
impl EventPublisher for AmqpPublisher {
    async fn publish(&self, topic: &str, payload: &Value) -> Result<()> {
        let body = serde_json::to_vec(payload)?;
        match tokio::time::timeout(self.cfg.publish_timeout(), self.publish_inner(topic, &body))
            .await
        {
            Ok(result) => result,
            Err(_) => {
                self.degraded.store(true, Ordering::SeqCst);
                Err(Error::Transient(format!(
                    "bus publish to \"{topic}\" timed out after {}ms",
                    self.cfg.publish_timeout_ms
                )))
            }
        }
    }

    async fn close(&self) {
        let Some(inner) = self.inner.lock().await.take() else {
            return;
        };
        let drain = async {
            if let Err(e) = inner.channel.close(200, "shutting down").await {
                tracing::debug!(error = %e, "bus channel close");
            }
            if let Err(e) = inner.conn.close(200, "shutting down").await {
                tracing::debug!(error = %e, "bus connection close");
            }
        };
        if tokio::time::timeout(self.cfg.close_timeout(), drain).await.is_err() {
            tracing::warn!(
                timeout_ms = self.cfg.close_timeout_ms,
                "bus close timed out; dropping connection"
            );
        } else {
            tracing::info!("bus publisher closed");
        }
    }
}
