//! aXAPI v3 HTTP client.
//!
//! Every call goes to `{base_url}/axapi/v3{path}`. After [`ThunderClient::login`]
//! the session signature is sent as `Authorization: A10 <signature>`.
//! A `{"response": {"status": "fail", ...}}` body is reported as
//! [`AxapiError::Device`] regardless of the HTTP status.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info};

use tidal_core::{HttpSettings, TelemetrySource, ThroughputSample, VirtualPort};

use crate::error::{AxapiError, AxapiResult};
use crate::slb::{
    PortStats, PortStatsEnvelope, Server, ServerList, ServiceGroup, ServiceGroupList,
    VirtualServer, VirtualServerList,
};

const API_PREFIX: &str = "/axapi/v3";

/// Client for one Thunder device.
pub struct ThunderClient {
    http: Client,
    base_url: String,
    /// Session signature from the last successful login.
    signature: RwLock<Option<String>>,
}

#[derive(Debug, Deserialize)]
struct AuthEnvelope {
    authresponse: AuthResponse,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    signature: String,
}

impl ThunderClient {
    /// Create a client for the device at `base_url` (e.g. `https://10.0.0.2:443`).
    pub fn new(base_url: &str, settings: HttpSettings) -> AxapiResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(settings.insecure_tls)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            signature: RwLock::new(None),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn is_authenticated(&self) -> bool {
        self.signature.read().await.is_some()
    }

    /// Open a session and keep its signature for later calls.
    pub async fn login(&self, username: &str, password: &str) -> AxapiResult<()> {
        let body = json!({
            "credentials": {
                "username": username,
                "password": password,
            }
        });
        let auth: AuthEnvelope = self.send(Method::POST, "/auth", Some(body), false).await?;
        *self.signature.write().await = Some(auth.authresponse.signature);
        info!(device = %self.base_url, "logged in to Thunder device");
        Ok(())
    }

    /// Close the session. A no-op when not logged in.
    pub async fn logoff(&self) -> AxapiResult<()> {
        if !self.is_authenticated().await {
            return Ok(());
        }
        let _: Value = self.send(Method::POST, "/logoff", None, true).await?;
        *self.signature.write().await = None;
        info!(device = %self.base_url, "logged off Thunder device");
        Ok(())
    }

    /// Statistics of a virtual-server port. `port` is in `80+http` form.
    pub async fn virtual_port_stats(&self, server: &str, port: &str) -> AxapiResult<PortStats> {
        let path = format!("/slb/virtual-server/{server}/port/{port}/stats");
        let env: PortStatsEnvelope = self.send(Method::GET, &path, None, true).await?;
        Ok(env.port.into_stats())
    }

    pub async fn virtual_servers(&self) -> AxapiResult<Vec<VirtualServer>> {
        let list: VirtualServerList = self
            .send(Method::GET, "/slb/virtual-server-list", None, true)
            .await?;
        Ok(list.servers)
    }

    pub async fn service_groups(&self) -> AxapiResult<Vec<ServiceGroup>> {
        let list: ServiceGroupList = self
            .send(Method::GET, "/slb/service-group-list", None, true)
            .await?;
        Ok(list.groups)
    }

    pub async fn servers(&self) -> AxapiResult<Vec<Server>> {
        let list: ServerList = self.send(Method::GET, "/slb/server", None, true).await?;
        Ok(list.servers)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        authenticated: bool,
    ) -> AxapiResult<T> {
        let url = format!("{}{API_PREFIX}{path}", self.base_url);
        let mut req = self.http.request(method.clone(), &url);

        if authenticated {
            let signature = self.signature.read().await.clone();
            let signature = signature.ok_or(AxapiError::NotAuthenticated)?;
            req = req.header(reqwest::header::AUTHORIZATION, format!("A10 {signature}"));
        }
        if let Some(body) = body {
            req = req.json(&body);
        }

        debug!(%method, %path, "aXAPI request");
        let resp = req.send().await?;
        let status = resp.status();
        let bytes = resp.bytes().await?;

        let failure = serde_json::from_slice::<Value>(&bytes)
            .ok()
            .and_then(|v| device_error(&v));
        if let Some((code, msg)) = failure {
            return Err(AxapiError::Device {
                path: path.to_string(),
                code,
                msg,
            });
        }

        if !status.is_success() {
            return Err(AxapiError::Status {
                path: path.to_string(),
                status,
            });
        }

        serde_json::from_slice(&bytes).map_err(|source| AxapiError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

/// Extract `(code, msg)` from an aXAPI failure body.
fn device_error(body: &Value) -> Option<(i64, String)> {
    let response = body.get("response")?;
    if response.get("status")?.as_str()? != "fail" {
        return None;
    }
    let err = response.get("err");
    let code = err
        .and_then(|e| e.get("code"))
        .and_then(Value::as_i64)
        .unwrap_or_default();
    let msg = err
        .and_then(|e| e.get("msg"))
        .and_then(Value::as_str)
        .unwrap_or("unknown error")
        .to_string();
    Some((code, msg))
}

#[async_trait]
impl TelemetrySource for ThunderClient {
    async fn throughput(&self, endpoint: &VirtualPort) -> anyhow::Result<ThroughputSample> {
        let stats = self
            .virtual_port_stats(&endpoint.server, &endpoint.port)
            .await?;
        Ok(ThroughputSample::new(endpoint.clone(), stats.throughput_bps))
    }
}
