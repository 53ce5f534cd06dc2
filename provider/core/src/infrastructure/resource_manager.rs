// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

//! YARN ResourceManager REST Client
//!
//! Talks to the ResourceManager's `/ws/v1/cluster` API over HTTP.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** `ClusterApi` implementation shared by all kernel sessions
//! - **Integration:** Lifecycle manager → ApplicationLocator → ResourceManager REST API
//!
//! # Endpoint selection
//!
//! With a single endpoint it is used as is. With several (HA), each is probed
//! through `GET /ws/v1/cluster/info` and the first reporting
//! `haState: ACTIVE` wins. The selection is cached until a connection to it
//! fails.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::application::{ApplicationId, ApplicationRecord, ApplicationState};
use crate::domain::cluster::{AuthStrategy, ClusterApi, ClusterApiError, ClusterEndpoint, KillResponse};
use crate::domain::config::ProviderConfig;
use crate::infrastructure::hadoop_conf;

const CLUSTER_PATH: &str = "/ws/v1/cluster";

#[derive(Deserialize)]
struct AppsResponse {
    #[serde(default)]
    apps: Option<AppsEnvelope>,
}

#[derive(Deserialize)]
struct AppsEnvelope {
    #[serde(default)]
    app: Vec<ApplicationRecord>,
}

#[derive(Deserialize)]
struct AppResponse {
    app: ApplicationRecord,
}

#[derive(Deserialize)]
struct StateResponse {
    state: ApplicationState,
}

#[derive(Deserialize)]
struct ClusterInfoResponse {
    #[serde(rename = "clusterInfo")]
    cluster_info: ClusterInfo,
}

#[derive(Deserialize)]
struct ClusterInfo {
    #[serde(rename = "haState", default)]
    ha_state: Option<String>,
}

pub struct ResourceManagerClient {
    http: Client,
    endpoints: Vec<String>,
    auth: AuthStrategy,
    active: RwLock<Option<String>>,
}

impl ResourceManagerClient {
    pub fn new(endpoint: ClusterEndpoint, request_timeout: Duration) -> Result<Self, ClusterApiError> {
        let http = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| ClusterApiError::Transport(e.to_string()))?;

        let endpoints = endpoint.urls().to_vec();
        let active = if endpoints.len() == 1 {
            Some(endpoints[0].clone())
        } else {
            None
        };

        Ok(Self {
            http,
            endpoints,
            auth: endpoint.auth().clone(),
            active: RwLock::new(active),
        })
    }

    /// Build a client from provider configuration, discovering endpoints from
    /// the Hadoop configuration when none are configured.
    pub fn from_config(config: &ProviderConfig) -> anyhow::Result<Self> {
        let urls = match config.configured_endpoints() {
            Some(urls) => urls,
            None => {
                let conf_dir = hadoop_conf::conf_dir(config.hadoop_conf_dir.as_deref());
                let discovered = hadoop_conf::discover_endpoints(&conf_dir)?;
                info!(
                    "Discovered ResourceManager endpoints {:?} from {}",
                    discovered,
                    conf_dir.display()
                );
                discovered
            }
        };

        let endpoint = ClusterEndpoint::new(urls, config.auth_strategy()?);
        if endpoint.urls().is_empty() {
            anyhow::bail!("No ResourceManager endpoint configured or discoverable");
        }

        Ok(Self::new(endpoint, config.request_timeout)?)
    }

    pub fn endpoints(&self) -> &[String] {
        &self.endpoints
    }

    /// Probe the configured endpoints and cache the active one.
    pub async fn select_active_endpoint(&self) -> Result<String, ClusterApiError> {
        let cached = self.active.read().clone();
        if let Some(active) = cached {
            return Ok(active);
        }

        for endpoint in &self.endpoints {
            match self.probe_ha_state(endpoint).await {
                Ok(Some(state)) if state.eq_ignore_ascii_case("ACTIVE") => {
                    info!("ResourceManager '{}' is active", endpoint);
                    *self.active.write() = Some(endpoint.clone());
                    return Ok(endpoint.clone());
                }
                Ok(state) => debug!("ResourceManager '{}' HA state: {:?}", endpoint, state),
                Err(e) => debug!("ResourceManager '{}' probe failed: {}", endpoint, e),
            }
        }

        Err(ClusterApiError::NoActiveEndpoint(self.endpoints.clone()))
    }

    async fn probe_ha_state(&self, endpoint: &str) -> Result<Option<String>, ClusterApiError> {
        let url = format!("{}{}/info", endpoint, CLUSTER_PATH);
        let info: ClusterInfoResponse = self.send_json(endpoint, self.request(Method::GET, &url)).await?;
        Ok(info.cluster_info.ha_state)
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self
            .http
            .request(method, url)
            .header(reqwest::header::ACCEPT, "application/json");

        match &self.auth {
            AuthStrategy::None => builder,
            AuthStrategy::Kerberos(credentials) => builder.header(
                reqwest::header::AUTHORIZATION,
                format!("Negotiate {}", credentials.negotiate_token),
            ),
        }
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        builder: RequestBuilder,
    ) -> Result<T, ClusterApiError> {
        let response = builder.send().await.map_err(|e| self.map_send_error(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(ClusterApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ClusterApiError::Decode(e.to_string()))
    }

    fn map_send_error(&self, endpoint: &str, e: reqwest::Error) -> ClusterApiError {
        if e.is_connect() {
            // force re-selection on the next call
            if self.endpoints.len() > 1 {
                *self.active.write() = None;
            }
            ClusterApiError::ConnectionRefused {
                endpoint: endpoint.to_string(),
            }
        } else {
            ClusterApiError::Transport(e.to_string())
        }
    }

    async fn cluster_url(&self, path: &str) -> Result<(String, String), ClusterApiError> {
        let endpoint = self.select_active_endpoint().await?;
        let url = format!("{}{}{}", endpoint, CLUSTER_PATH, path);
        Ok((endpoint, url))
    }
}

#[async_trait]
impl ClusterApi for ResourceManagerClient {
    async fn list_applications(
        &self,
        started_since: DateTime<Utc>,
    ) -> Result<Vec<ApplicationRecord>, ClusterApiError> {
        let (endpoint, url) = self.cluster_url("/apps").await?;
        let builder = self
            .request(Method::GET, &url)
            .query(&[("startedTimeBegin", started_since.timestamp_millis().to_string())]);

        let response: AppsResponse = self.send_json(&endpoint, builder).await?;
        Ok(response.apps.map(|apps| apps.app).unwrap_or_default())
    }

    async fn get_application(&self, id: &ApplicationId) -> Result<ApplicationRecord, ClusterApiError> {
        let (endpoint, url) = self.cluster_url(&format!("/apps/{}", id)).await?;
        let response: AppResponse = self.send_json(&endpoint, self.request(Method::GET, &url)).await?;
        Ok(response.app)
    }

    async fn get_application_state(&self, id: &ApplicationId) -> Result<ApplicationState, ClusterApiError> {
        let (endpoint, url) = self.cluster_url(&format!("/apps/{}/state", id)).await?;
        let response: StateResponse = self.send_json(&endpoint, self.request(Method::GET, &url)).await?;
        Ok(response.state)
    }

    async fn kill_application(&self, id: &ApplicationId) -> Result<KillResponse, ClusterApiError> {
        let (endpoint, url) = self.cluster_url(&format!("/apps/{}/state", id)).await?;
        let builder = self
            .request(Method::PUT, &url)
            .json(&serde_json::json!({ "state": "KILLED" }));

        let response = builder.send().await.map_err(|e| self.map_send_error(&endpoint, e))?;
        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "(no body)".to_string());
            return Err(ClusterApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        // 202 Accepted may come back without a usable body
        Ok(response
            .json::<KillResponse>()
            .await
            .unwrap_or(KillResponse { state: None }))
    }

    fn active_endpoint(&self) -> Option<String> {
        self.active.read().clone()
    }
}
