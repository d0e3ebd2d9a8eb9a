//! The slices of Kubernetes objects this client reads.

use std::collections::BTreeMap;
use std::fmt;

use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ObjectMeta {
    pub name: String,
    pub namespace: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct NamedObject {
    #[serde(default)]
    pub metadata: ObjectMeta,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ObjectList {
    #[serde(default)]
    pub items: Vec<NamedObject>,
}

impl ObjectList {
    pub(crate) fn names(self) -> Vec<String> {
        self.items.into_iter().map(|o| o.metadata.name).collect()
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct ReplicaSpec {
    /// Absent means zero on a scale subresource.
    pub replicas: Option<u32>,
}

/// Deployment or its `/scale` subresource; both carry `spec.replicas`.
#[derive(Debug, Deserialize)]
pub(crate) struct Scalable {
    #[serde(default)]
    pub metadata: ObjectMeta,
    #[serde(default)]
    pub spec: ReplicaSpec,
}

impl Scalable {
    pub(crate) fn replicas(&self) -> u32 {
        self.spec.replicas.unwrap_or_default()
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct Secret {
    #[serde(default)]
    pub data: BTreeMap<String, String>,
}

/// Username and password read from a secret.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
