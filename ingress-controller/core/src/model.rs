use crate::Target;
use std::collections::BTreeMap;

/// The routing decisions for every known host, derived from a cache snapshot.
///
/// Maps are ordered so that anything produced by iterating over a model is
/// stable across runs.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoutingModel {
    pub hosts: BTreeMap<String, Host>,

    /// Load-balanced pools, keyed by `host + path`.
    pub upstreams: BTreeMap<String, Upstream>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Host {
    pub locations: BTreeMap<String, Location>,
}

/// The resolved routing decision for a single host and path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The namespace of the first pod that registered this path.
    pub namespace: String,
    pub path: String,

    /// The base64-encoded API key requests must present, if the namespace
    /// has one.
    pub secret: Option<String>,
    pub backend: Backend,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    /// A single pod serves the location.
    Direct(Server),

    /// Several pods serve the location through a named upstream.
    Upstream { key: String, name: String },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Server {
    pub pod_name: String,
    pub target: Target,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Upstream {
    pub name: String,
    pub host: String,
    pub path: String,

    /// Members in insertion order. No two members share a target.
    pub servers: Vec<Server>,
}

const UPSTREAM_NAME_PREFIX: &str = "microservice";

/// Derives the nginx upstream name for a `host + path` key.
///
/// The name is the 32-bit FNV-1a hash of the key in base 10, so it only
/// depends on the key.
pub fn upstream_name(key: &str) -> String {
    format!("{UPSTREAM_NAME_PREFIX}{}", fnv1a_32(key.as_bytes()))
}

fn fnv1a_32(bytes: &[u8]) -> u32 {
    const OFFSET_BASIS: u32 = 0x811c_9dc5;
    const PRIME: u32 = 0x0100_0193;

    bytes.iter().fold(OFFSET_BASIS, |hash, b| {
        (hash ^ u32::from(*b)).wrapping_mul(PRIME)
    })
}

// === impl RoutingModel ===

impl RoutingModel {
    /// Indicates that there is nothing to route.
    pub fn is_empty(&self) -> bool {
        self.hosts.values().all(|h| h.locations.is_empty())
    }

    pub fn location(&self, host: &str, path: &str) -> Option<&Location> {
        self.hosts.get(host)?.locations.get(path)
    }

    /// Returns the upstream a location is pooled behind, if any.
    pub fn upstream_for(&self, location: &Location) -> Option<&Upstream> {
        match &location.backend {
            Backend::Direct(_) => None,
            Backend::Upstream { key, .. } => self.upstreams.get(key),
        }
    }
}

// === impl Location ===

impl Location {
    /// The name nginx should `proxy_pass` to: the pod address for a direct
    /// backend, or the upstream name for a pooled one.
    pub fn proxy_target(&self) -> &str {
        match &self.backend {
            Backend::Direct(server) => server.target.as_str(),
            Backend::Upstream { name, .. } => name,
        }
    }

    pub fn is_pooled(&self) -> bool {
        matches!(self.backend, Backend::Upstream { .. })
    }
}

// === impl Upstream ===

impl Upstream {
    pub fn new(name: &str, host: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            host: host.to_string(),
            path: path.to_string(),
            servers: Vec::new(),
        }
    }

    pub fn contains(&self, target: &Target) -> bool {
        self.servers.iter().any(|s| s.target == *target)
    }

    /// Adds a member unless one already serves the same target. Returns
    /// whether the server was added.
    pub fn insert(&mut self, server: Server) -> bool {
        if self.contains(&server.target) {
            return false;
        }
        self.servers.push(server);
        true
    }
}
