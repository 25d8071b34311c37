use crate::response::{self, COST_HEADER};
use async_trait::async_trait;
use harvest_engine::backend::{FetchBackend, FetchFailure, FetchRequest, FetchResponse};
use harvest_engine::config::{ConfigError, ServiceConfig};
use harvest_engine::{CostToken, FetchError};
use std::time::Duration;
use tracing::debug;

/// Extra time allowed on top of the service-side timeout before the HTTP
/// client gives up on its own.
const CLIENT_GRACE: Duration = Duration::from_secs(30);

/// Fetch backend for a Scrapfly-style rendering/proxy scrape API.
pub struct FlyBackend {
    client: reqwest::Client,
    service: ServiceConfig,
    key: String,
}

impl FlyBackend {
    /// Fails when no credential is configured.
    pub fn new(service: &ServiceConfig) -> Result<Self, ConfigError> {
        let key = service.credential()?;
        Ok(Self::with_key(service, key))
    }

    pub fn with_key(service: &ServiceConfig, key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            service: service.clone(),
            key: key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.service.endpoint.trim_end_matches('/'), path)
    }

    /// Query parameters for one scrape call.
    pub fn scrape_params(&self, request: &FetchRequest) -> Vec<(&'static str, String)> {
        let effort = &request.effort;
        let mut params = vec![
            ("key", self.key.clone()),
            ("url", request.address.clone()),
            ("asp", self.service.asp.to_string()),
            ("render_js", self.service.render_js.to_string()),
            // The service rejects a custom timeout unless its own retries are off.
            ("retry", "false".to_string()),
            ("timeout", effort.timeout.as_millis().to_string()),
        ];

        if let Some(country) = &self.service.country {
            params.push(("country", country.clone()));
        }
        if let Some(pool) = &self.service.proxy_pool {
            params.push(("proxy_pool", pool.clone()));
        }
        if !self.service.lang.is_empty() {
            params.push(("lang", self.service.lang.join(",")));
        }
        if self.service.render_js {
            if !effort.render_wait.is_zero() {
                params.push(("rendering_wait", effort.render_wait.as_millis().to_string()));
            }
            if effort.auto_scroll {
                params.push(("auto_scroll", "true".to_string()));
            }
            if let Some(selector) = &effort.wait_for_selector {
                params.push(("wait_for_selector", selector.clone()));
            }
        }
        if let Some(budget) = effort.cost_budget {
            params.push(("cost_budget", budget.to_string()));
        }
        if let Some(session) = &effort.session {
            params.push(("session", session.clone()));
            params.push(("session_sticky_proxy", "true".to_string()));
        }
        params
    }

    fn map_transport(err: reqwest::Error, timeout: Duration) -> FetchError {
        if err.is_timeout() {
            FetchError::Timeout(timeout)
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

#[async_trait]
impl FetchBackend for FlyBackend {
    async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, FetchFailure> {
        let timeout = request.effort.timeout + CLIENT_GRACE;
        debug!(
            "scrape {} (tier={}, timeout={:?})",
            request.address, request.effort.tier, request.effort.timeout
        );

        let response = self
            .client
            .get(self.url("scrape"))
            .query(&self.scrape_params(request))
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_transport(e, timeout))?;

        let status = response.status().as_u16();
        let cost = response
            .headers()
            .get(COST_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(CostToken::new)
            .unwrap_or_default();
        let body = response
            .text()
            .await
            .map_err(|e| {
                FetchFailure::charged(Self::map_transport(e, timeout), cost.clone())
            })?;

        response::parse_scrape(status, &body, cost)
    }

    async fn remaining_credits(&self) -> Result<u64, FetchError> {
        let body = self
            .client
            .get(self.url("account"))
            .query(&[("key", self.key.as_str())])
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?
            .text()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;
        response::parse_account(&body)
    }
}
