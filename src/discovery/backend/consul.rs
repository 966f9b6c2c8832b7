//! Consul 健康 API 客户端

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use reqwest::Url;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::trace;

use crate::config::ConsulConfig;
use crate::discovery::backend::{HealthCheck, HealthRegistry, IndexedResponse, ServiceEntry};
use crate::error::RegistryError;

const INDEX_HEADER: &str = "X-Consul-Index";
const TOKEN_HEADER: &str = "X-Consul-Token";

/// 非阻塞查询的请求超时
const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Consul 健康 API 客户端
#[derive(Debug, Clone)]
pub struct ConsulHealthClient {
    http_client: HttpClient,
    consul_url: String,
    datacenter: Option<String>,
}

impl ConsulHealthClient {
    /// 创建新的 Consul 客户端
    pub fn new(config: &ConsulConfig) -> Result<Self, RegistryError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let value = HeaderValue::from_str(token)
                .map_err(|e| RegistryError::Transport(format!("invalid consul token: {}", e)))?;
            headers.insert(TOKEN_HEADER, value);
        }
        let http_client = HttpClient::builder().default_headers(headers).build()?;

        Ok(Self {
            http_client,
            consul_url: config.url.trim_end_matches('/').to_string(),
            datacenter: config.datacenter.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.consul_url
    }

    /// 阻塞查询的 HTTP 超时：Consul 会在 wait 上叠加最多 wait/16 的抖动
    fn blocking_timeout(wait: Duration) -> Duration {
        wait + wait / 16 + Duration::from_secs(5)
    }

    /// 拼接 API 路径，每个片段单独做百分号编码
    fn endpoint(&self, segments: &[&str]) -> Result<Url, RegistryError> {
        let mut url = Url::parse(&self.consul_url)
            .map_err(|e| RegistryError::Transport(format!("invalid consul url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| RegistryError::Transport("consul url cannot be a base".to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn get_indexed<T: DeserializeOwned>(
        &self,
        url: Url,
        mut query: Vec<(&'static str, String)>,
        timeout: Duration,
    ) -> Result<IndexedResponse<T>, RegistryError> {
        if let Some(dc) = &self.datacenter {
            query.push(("dc", dc.clone()));
        }
        trace!(url = %url, ?query, "consul request");

        let resp = self
            .http_client
            .get(url)
            .query(&query)
            .timeout(timeout)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RegistryError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let index = resp
            .headers()
            .get(INDEX_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .ok_or(RegistryError::MissingIndex)?;

        let value = resp.json::<T>().await?;
        Ok(IndexedResponse { index, value })
    }
}

#[async_trait]
impl HealthRegistry for ConsulHealthClient {
    async fn passing_checks(
        &self,
        wait_index: u64,
        wait: Duration,
    ) -> Result<IndexedResponse<Vec<HealthCheck>>, RegistryError> {
        let query = vec![
            ("index", wait_index.to_string()),
            ("wait", format!("{}s", wait.as_secs().max(1))),
        ];
        let url = self.endpoint(&["v1", "health", "state", "passing"])?;
        self.get_indexed(url, query, Self::blocking_timeout(wait))
            .await
    }

    async fn service_health(
        &self,
        service: &str,
        passing_only: bool,
    ) -> Result<IndexedResponse<Vec<ServiceEntry>>, RegistryError> {
        let mut query = Vec::new();
        if passing_only {
            query.push(("passing", "true".to_string()));
        }
        let url = self.endpoint(&["v1", "health", "service", service])?;
        self.get_indexed(url, query, QUERY_TIMEOUT).await
    }
}
