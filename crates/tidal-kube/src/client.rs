use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::json;
use tracing::{debug, info};

use tidal_core::{DeploymentRef, DeploymentState, HttpSettings, WorkloadController};

use crate::error::{KubeError, KubeResult};
use crate::resources::{Credentials, ObjectList, Scalable, Secret};

const MERGE_PATCH: &str = "application/strategic-merge-patch+json";

/// Kubernetes API client authenticated with a bearer token.
pub struct KubeClient {
    http: Client,
    base_url: String,
    token: String,
}

impl KubeClient {
    pub fn new(base_url: &str, token: &str, settings: HttpSettings) -> KubeResult<Self> {
        let http = Client::builder()
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(settings.insecure_tls)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        })
    }

    /// Names of all pods in the cluster. Used as a connectivity check.
    pub async fn list_pods(&self) -> KubeResult<Vec<String>> {
        let list: ObjectList = self.get("/api/v1/pods").await?;
        Ok(list.names())
    }

    /// Names of all deployments across namespaces.
    pub async fn deployment_names(&self) -> KubeResult<Vec<String>> {
        let list: ObjectList = self.get("/apis/apps/v1/deployments").await?;
        Ok(list.names())
    }

    pub async fn deployment_status(
        &self,
        name: &str,
        namespace: &str,
    ) -> KubeResult<DeploymentState> {
        let path = format!("/apis/apps/v1/namespaces/{namespace}/deployments/{name}");
        let deployment: Scalable = self.get(&path).await?;
        let replicas = deployment.replicas();

        let meta = deployment.metadata;
        let reference = DeploymentRef::new(
            or_requested(meta.name, name),
            or_requested(meta.namespace, namespace),
        );
        Ok(DeploymentState::new(&reference, replicas))
    }

    /// Set the replica count through the `/scale` subresource.
    ///
    /// The API's answer must echo `replicas`; anything else is reported as
    /// [`KubeError::ScaleRejected`].
    pub async fn scale(&self, name: &str, namespace: &str, replicas: u32) -> KubeResult<()> {
        if name.is_empty() {
            return Err(KubeError::Blank("name"));
        }
        if namespace.is_empty() {
            return Err(KubeError::Blank("namespace"));
        }

        let path = format!("/apis/apps/v1/namespaces/{namespace}/deployments/{name}/scale");
        let patch = json!({ "spec": { "replicas": replicas } });
        let req = self
            .request(Method::PATCH, &path)
            .header(CONTENT_TYPE, MERGE_PATCH)
            .body(patch.to_string());
        let scale: Scalable = self.execute(req, &path).await?;

        let reported = scale.replicas();
        if reported != replicas {
            return Err(KubeError::ScaleRejected {
                deployment: format!("{namespace}/{name}"),
                requested: replicas,
                reported,
            });
        }
        info!(deployment = %format!("{namespace}/{name}"), replicas, "scale request accepted");
        Ok(())
    }

    /// Read base64 `username` and `password` entries from a secret.
    pub async fn secret_credentials(
        &self,
        name: &str,
        namespace: &str,
    ) -> KubeResult<Credentials> {
        let path = format!("/api/v1/namespaces/{namespace}/secrets/{name}");
        let secret: Secret = self.get(&path).await?;
        let secret_name = format!("{namespace}/{name}");

        let decode = |key: &'static str| -> KubeResult<String> {
            let raw = secret.data.get(key).ok_or_else(|| KubeError::MissingKey {
                secret: secret_name.clone(),
                key,
            })?;
            let bytes = STANDARD.decode(raw).map_err(|source| KubeError::Base64 {
                secret: secret_name.clone(),
                key,
                source,
            })?;
            Ok(String::from_utf8_lossy(&bytes).into_owned())
        };

        Ok(Credentials {
            username: decode("username")?,
            password: decode("password")?,
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        debug!(%method, %path, "kubernetes request");
        self.http
            .request(method, format!("{}{path}", self.base_url))
            .header(AUTHORIZATION, format!("Bearer {}", self.token))
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> KubeResult<T> {
        let req = self.request(Method::GET, path);
        self.execute(req, path).await
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        req: RequestBuilder,
        path: &str,
    ) -> KubeResult<T> {
        let resp = req.send().await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(KubeError::Status {
                path: path.to_string(),
                status,
            });
        }
        let bytes = resp.bytes().await?;
        serde_json::from_slice(&bytes).map_err(|source| KubeError::Decode {
            path: path.to_string(),
            source,
        })
    }
}

/// Echoed metadata, or the requested value when the API left it out.
fn or_requested(echoed: String, requested: &str) -> String {
    if echoed.is_empty() {
        requested.to_string()
    } else {
        echoed
    }
}

#[async_trait]
impl WorkloadController for KubeClient {
    async fn status(&self, target: &DeploymentRef) -> anyhow::Result<DeploymentState> {
        Ok(self.deployment_status(&target.name, &target.namespace).await?)
    }

    async fn set_replicas(&self, target: &DeploymentRef, replicas: u32) -> anyhow::Result<()> {
        Ok(self.scale(&target.name, &target.namespace, replicas).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_metadata_falls_back_to_request() {
        assert_eq!(or_requested(String::new(), "web"), "web");
        assert_eq!(or_requested("api".to_string(), "web"), "api");
    }

    #[tokio::test]
    async fn blank_names_rejected_before_request() {
        // Port 1 is never listening; a request would fail with Http instead.
        let client = KubeClient::new("https://127.0.0.1:1", "t", HttpSettings::default()).unwrap();
        assert!(matches!(
            client.scale("", "default", 3).await,
            Err(KubeError::Blank("name"))
        ));
        assert!(matches!(
            client.scale("web", "", 3).await,
            Err(KubeError::Blank("namespace"))
        ));
    }
}
