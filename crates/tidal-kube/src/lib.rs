//! Bearer-token Kubernetes REST client.
//!
//! Covers only what the autoscaler needs: a connectivity probe, deployment
//! status and scale, and reading credentials out of a secret.

pub mod client;
pub mod error;
pub mod resources;

pub use client::KubeClient;
pub use error::{KubeError, KubeResult};
pub use resources::Credentials;
