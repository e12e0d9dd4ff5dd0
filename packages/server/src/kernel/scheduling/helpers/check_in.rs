//! Heartbeat helper.
//!
//! Internal, `boot_run` helper that pings an uptime-monitoring endpoint on
//! every firing. Its catalogue entry is registered by [`super::definitions`];
//! this module only carries the `run` behaviour.

use async_trait::async_trait;
use tracing::info;

use crate::kernel::scheduling::helper::{Helper, HelperContext};

pub const CHECK_IN_ID: &str = "checkIn";

pub struct CheckInHelper {
    client: reqwest::Client,
    heartbeat_url: Option<String>,
}

impl CheckInHelper {
    pub fn new(heartbeat_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            heartbeat_url,
        }
    }
}

#[async_trait]
impl Helper for CheckInHelper {
    fn id(&self) -> &str {
        CHECK_IN_ID
    }

    async fn run(&self, _ctx: HelperContext) -> anyhow::Result<()> {
        let Some(url) = &self.heartbeat_url else {
            info!("checkIn: no heartbeat URL configured, skipping ping");
            return Ok(());
        };
        info!("checkIn: sending heartbeat");
        let response = self.client.get(url).send().await?;
        info!(status = %response.status(), "checkIn: heartbeat sent");
        Ok(())
    }
}
