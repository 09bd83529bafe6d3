//! Network reachability checks
//!
//! Every network-dependent stage of a turn asks the transport whether it is
//! online and allows one reconnect attempt before the turn aborts. Failures
//! surface as absence, never as a crash.

use std::time::Duration;

use async_trait::async_trait;

use crate::{Error, Result};

/// Named connectivity session used by every remote call
#[async_trait]
pub trait NetworkTransport: Send + Sync {
    /// Whether the network currently looks reachable
    async fn is_online(&self) -> bool;

    /// Try once to re-establish connectivity
    ///
    /// # Errors
    ///
    /// Returns error if the network is still unreachable afterwards
    async fn reconnect(&self) -> Result<()>;
}

/// Check connectivity, allowing a single reconnect attempt.
///
/// Returns false when the network is down and the reconnect failed; the
/// caller aborts its turn without contacting any remote service.
pub async fn ensure_online(net: &dyn NetworkTransport) -> bool {
    if net.is_online().await {
        return true;
    }

    tracing::warn!("network unreachable, attempting reconnect");
    match net.reconnect().await {
        Ok(()) => {
            tracing::info!("reconnected");
            true
        }
        Err(e) => {
            tracing::warn!(error = %e, "reconnect failed, aborting turn");
            false
        }
    }
}

/// Reachability probe against a lightweight HTTP endpoint
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Create a probe with a short per-request timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(url: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(3))
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl NetworkTransport for HttpProbe {
    async fn is_online(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                tracing::trace!(status = %response.status(), "probe ok");
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "probe failed");
                false
            }
        }
    }

    async fn reconnect(&self) -> Result<()> {
        // The OS owns the link; give it a moment and probe again
        tokio::time::sleep(Duration::from_millis(500)).await;

        if self.is_online().await {
            Ok(())
        } else {
            Err(Error::Network(format!("still unreachable: {}", self.url)))
        }
    }
}
