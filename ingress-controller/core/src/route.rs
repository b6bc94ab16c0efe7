use serde::{Deserialize, Serialize};

/// Binds an incoming host/path to an outgoing pod address.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub incoming: Incoming,
    pub outgoing: Outgoing,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Incoming {
    pub host: String,

    /// An nginx location, matched exactly as written (e.g. `/`, `/api`).
    pub path: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Outgoing {
    pub ip: String,
    pub port: String,
}

// === impl Route ===

impl Route {
    pub fn new(
        host: impl Into<String>,
        path: impl Into<String>,
        ip: impl Into<String>,
        port: impl Into<String>,
    ) -> Self {
        Self {
            incoming: Incoming {
                host: host.into(),
                path: path.into(),
            },
            outgoing: Outgoing {
                ip: ip.into(),
                port: port.into(),
            },
        }
    }

    /// The key shared by every route that serves the same host and path.
    pub fn upstream_key(&self) -> String {
        format!("{}{}", self.incoming.host, self.incoming.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_camel_case() {
        let route: Route = serde_json::from_str(
            r#"{"incoming":{"host":"a.com","path":"/api"},"outgoing":{"ip":"10.0.0.5","port":"8080"}}"#,
        )
        .unwrap();
        assert_eq!(route, Route::new("a.com", "/api", "10.0.0.5", "8080"));
        assert_eq!(route.upstream_key(), "a.com/api");
    }
}
