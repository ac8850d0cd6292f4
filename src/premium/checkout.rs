use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::config::PaymentConfig;

#[derive(Debug, Clone, Serialize)]
pub struct CheckoutRequest {
    pub reference: String,
    #[serde(rename = "amount")]
    pub amount_cents: i64,
    pub currency: String,
    pub phone_number: String,
    pub callback_url: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutSession {
    pub checkout_url: String,
    pub mock: bool,
}

/// Hosted-checkout provider. The provider later reports the outcome to the
/// webhook keyed by `reference`.
#[async_trait]
pub trait CheckoutProvider: Send + Sync {
    async fn create_checkout(&self, req: &CheckoutRequest) -> anyhow::Result<CheckoutSession>;
}

pub fn provider_from_config(cfg: &PaymentConfig) -> anyhow::Result<Arc<dyn CheckoutProvider>> {
    match cfg.api_key.as_deref() {
        Some(key) => Ok(Arc::new(HttpCheckoutProvider::new(&cfg.api_url, key)?)),
        None => {
            if cfg.enabled {
                warn!("PAYMENT_API_KEY not set; checkout returns mock URLs");
            }
            Ok(Arc::new(MockCheckoutProvider::new(&cfg.public_base_url)))
        }
    }
}

pub struct HttpCheckoutProvider {
    client: Client,
    api_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct ProviderReply {
    #[serde(alias = "url", alias = "authorization_url", alias = "redirect_url")]
    checkout_url: Option<String>,
    #[serde(default)]
    data: Option<Box<ProviderReply>>,
}

impl ProviderReply {
    fn url(self) -> Option<String> {
        self.checkout_url
            .or_else(|| self.data.and_then(|d| d.url()))
            .filter(|u| !u.trim().is_empty())
    }
}

impl HttpCheckoutProvider {
    pub fn new(api_url: &str, api_key: &str) -> anyhow::Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("build http client")?;
        Ok(Self {
            client,
            api_url: api_url.to_string(),
            api_key: api_key.to_string(),
        })
    }
}

#[async_trait]
impl CheckoutProvider for HttpCheckoutProvider {
    #[instrument(skip(self, req), fields(reference = %req.reference))]
    async fn create_checkout(&self, req: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        let resp = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(req)
            .send()
            .await
            .context("send checkout request")?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            anyhow::bail!("checkout provider returned {}: {}", status, body);
        }

        let reply: ProviderReply = resp.json().await.context("decode checkout reply")?;
        let checkout_url = reply.url().context("checkout reply has no url")?;
        info!("checkout session created");
        Ok(CheckoutSession { checkout_url, mock: false })
    }
}

/// Used when no provider credential is configured.
pub struct MockCheckoutProvider {
    base_url: String,
}

impl MockCheckoutProvider {
    pub fn new(base_url: &str) -> Self {
        Self { base_url: base_url.trim_end_matches('/').to_string() }
    }
}

#[async_trait]
impl CheckoutProvider for MockCheckoutProvider {
    async fn create_checkout(&self, req: &CheckoutRequest) -> anyhow::Result<CheckoutSession> {
        Ok(CheckoutSession {
            checkout_url: format!(
                "{}/premium/mock-checkout?reference={}",
                self.base_url, req.reference
            ),
            mock: true,
        })
    }
}
