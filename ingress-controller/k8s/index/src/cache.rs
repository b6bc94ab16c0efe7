use ahash::AHashMap as HashMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use pods_ingress_core::{config::ApiKeySecret, Route};
use pods_ingress_k8s_api::{self as k8s, ResourceExt};
use serde::Deserialize;
use tracing::warn;

/// A point-in-time snapshot of routable pods and API key secrets.
///
/// The watch layer owns the snapshot and must not mutate it while it is
/// being aggregated.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Cache {
    /// Routable pods, keyed by pod identity.
    #[serde(default)]
    pub pods: HashMap<String, PodWithRoutes>,

    /// API key secrets, keyed by namespace.
    #[serde(default)]
    pub secrets: HashMap<String, k8s::Secret>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PodWithRoutes {
    pub pod: k8s::Pod,

    #[serde(default)]
    pub routes: Vec<Route>,
}

// === impl Cache ===

impl Cache {
    /// Adds a pod, keyed by `namespace/name`.
    pub fn insert_pod(&mut self, pod: k8s::Pod, routes: Vec<Route>) {
        let key = format!("{}/{}", pod.namespace().unwrap_or_default(), pod.name_any());
        self.pods.insert(key, PodWithRoutes { pod, routes });
    }

    /// Adds a secret under its own namespace, replacing any prior secret for
    /// that namespace.
    pub fn insert_secret(&mut self, secret: k8s::Secret) {
        let ns = secret.namespace().unwrap_or_default();
        self.secrets.insert(ns, secret);
    }

    /// Returns the base64-encoded API key for `namespace`, if the namespace
    /// has a secret carrying the API key field.
    ///
    /// The watch layer decides which secret represents a namespace, so the
    /// secret's name is not checked here.
    pub fn api_key(&self, namespace: &str, location: &ApiKeySecret) -> Option<String> {
        let secret = self.secrets.get(namespace)?;

        match secret
            .data
            .as_ref()
            .and_then(|data| data.get(&location.data_field))
        {
            Some(k8s::ByteString(key)) => Some(BASE64.encode(key)),
            None => {
                warn!(
                    %namespace,
                    field = %location.data_field,
                    "Secret is missing the API key field"
                );
                None
            }
        }
    }
}
