use crate::config::AcquirerConfig;
use crate::domain::ports::ConfirmationClient;
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;
use url::Url;

/// Legacy `notify_verify` over HTTP(S).
pub struct HttpConfirmationClient {
    client: Client,
    endpoint: Url,
    partner: String,
}

impl HttpConfirmationClient {
    pub fn new(endpoint: Url, partner: impl Into<String>, timeout: std::time::Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint,
            partner: partner.into(),
        })
    }

    pub fn from_config(config: &AcquirerConfig) -> Result<Self> {
        let partner = config.partner.clone().ok_or_else(|| {
            GatewayError::ConfigurationError("Confirmation requires `partner`".to_string())
        })?;
        Self::new(config.confirm_endpoint()?, partner, config.confirm_timeout())
    }

    fn confirm_url(&self, notify_id: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("partner", &self.partner)
            .append_pair("notify_id", notify_id);
        url
    }
}

#[async_trait]
impl ConfirmationClient for HttpConfirmationClient {
    async fn confirm(&self, notify_id: &str) -> Result<String> {
        let url = self.confirm_url(notify_id);
        debug!(endpoint = %self.endpoint, notify_id, "Confirming notification");

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::ConfirmationFailed(format!(
                "Acquirer answered with status {}",
                response.status()
            )));
        }

        Ok(response.text().await?.trim().to_string())
    }
}
