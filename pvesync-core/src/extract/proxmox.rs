//! Proxmox VE HTTP client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::api::{AgentInterface, AgentNetworkReply, GuestSummary, HypervisorApi, NodeInfo, RawConfig};
use crate::config::ProxmoxSettings;
use crate::error::{ProxmoxError, ProxmoxResult};
use crate::snapshot::VmKind;

/// Every API answer wraps its payload in `data`
#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct VersionInfo {
    version: String,
    #[serde(default)]
    release: Option<String>,
}

/// Client for the Proxmox VE REST API authenticated with an API token
#[derive(Debug, Clone)]
pub struct ProxmoxClient {
    http: reqwest::Client,
    base_url: String,
}

impl ProxmoxClient {
    /// Builds a client from resolved settings.
    ///
    /// # Errors
    ///
    /// Returns `ProxmoxError::Client` if the token is not a valid header value
    /// or the TLS backend fails to initialize.
    pub fn new(settings: &ProxmoxSettings) -> ProxmoxResult<Self> {
        let mut auth = HeaderValue::from_str(&settings.authorization())
            .map_err(|e| ProxmoxError::Client(format!("invalid API token: {e}")))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);

        if !settings.verify_ssl {
            tracing::warn!("TLS certificate verification is disabled for Proxmox");
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(settings.timeout_secs))
            .danger_accept_invalid_certs(!settings.verify_ssl)
            .build()
            .map_err(|e| ProxmoxError::Client(e.to_string()))?;

        Ok(Self {
            http,
            base_url: settings.base_url(),
        })
    }

    /// Base URL requests are made against
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> ProxmoxResult<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%path, "GET");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| ProxmoxError::Request {
                path: path.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProxmoxError::Status {
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let envelope: Envelope<T> = response.json().await.map_err(|e| ProxmoxError::Decode {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl HypervisorApi for ProxmoxClient {
    async fn version(&self) -> ProxmoxResult<String> {
        let info: VersionInfo = self.get("/version").await?;
        Ok(match info.release {
            Some(release) => format!("{} ({release})", info.version),
            None => info.version,
        })
    }

    async fn list_nodes(&self) -> ProxmoxResult<Vec<NodeInfo>> {
        self.get("/nodes").await
    }

    async fn list_guests(&self, node: &str, kind: VmKind) -> ProxmoxResult<Vec<GuestSummary>> {
        self.get(&format!("/nodes/{node}/{kind}")).await
    }

    async fn guest_config(&self, node: &str, kind: VmKind, vmid: u32) -> ProxmoxResult<RawConfig> {
        self.get(&format!("/nodes/{node}/{kind}/{vmid}/config"))
            .await
    }

    async fn agent_network_interfaces(
        &self,
        node: &str,
        vmid: u32,
    ) -> ProxmoxResult<Vec<AgentInterface>> {
        let reply: AgentNetworkReply = self
            .get(&format!(
                "/nodes/{node}/qemu/{vmid}/agent/network-get-interfaces"
            ))
            .await?;
        Ok(reply.result)
    }
}
