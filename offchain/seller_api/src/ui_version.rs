use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use decrease_engine::validation::has_outdated_ui;

use crate::controller::PositionSeller;
use crate::submitter::OrderSubmitter;

/// Polls the server for the minimum client version and keeps the seller's outdated flag current.
pub struct UiVersionPoller {
    client: reqwest::Client,
    url: String,
    local_version: String,
}

impl UiVersionPoller {
    pub fn new(url: String, local_version: String) -> Self {
        Self { client: reqwest::Client::new(), url, local_version }
    }

    pub fn request_url(&self, active: bool) -> String {
        let sep = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}client_version={}&active={}", self.url, sep, self.local_version, active)
    }

    pub async fn fetch(&self, active: bool) -> Result<bool, reqwest::Error> {
        let body = self
            .client
            .get(self.request_url(active))
            .send()
            .await?
            .error_for_status()?
            .text()
            .await?;
        Ok(has_outdated_ui(Some(&body), &self.local_version))
    }

    /// Runs forever; a failed fetch leaves the flag as it was.
    pub async fn run<S: OrderSubmitter>(self, seller: Arc<PositionSeller<S>>, every: Duration) {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match self.fetch(seller.is_connected()).await {
                Ok(outdated) => {
                    debug!(target = "seller", outdated, "ui version checked");
                    seller.set_outdated_ui(outdated);
                }
                Err(e) => warn!(target = "seller", error = %e, "ui version check failed"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_url_carries_client_version() {
        let p = UiVersionPoller::new("https://example.org/ui_version".into(), "1.4".into());
        assert_eq!(p.request_url(true), "https://example.org/ui_version?client_version=1.4&active=true");
        let p = UiVersionPoller::new("https://example.org/ui_version?x=1".into(), "1.4".into());
        assert_eq!(p.request_url(false), "https://example.org/ui_version?x=1&client_version=1.4&active=false");
    }
}
