use crate::{Error, API_KEY_HEADER};
use pods_ingress_core::{Backend, RoutingModel, Server};
use serde::Serialize;
use std::{collections::BTreeMap, num::NonZeroU16};

/// The template context for a full configuration document.
///
/// Hosts and locations follow the model's key order; upstream members are
/// sorted by target so the document does not depend on the order in which
/// pods were aggregated.
#[derive(Debug, Serialize)]
pub(crate) struct ConfView<'m> {
    pub port: u16,
    pub api_key_var: String,
    pub upstreams: Vec<UpstreamView<'m>>,
    pub hosts: Vec<HostView<'m>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UpstreamView<'m> {
    pub name: &'m str,
    pub host: &'m str,
    pub path: &'m str,
    pub servers: Vec<ServerView<'m>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ServerView<'m> {
    pub pod_name: &'m str,
    pub target: &'m str,
}

#[derive(Debug, Serialize)]
pub(crate) struct HostView<'m> {
    pub name: &'m str,
    pub locations: Vec<LocationView<'m>>,
}

#[derive(Debug, Serialize)]
pub(crate) struct LocationView<'m> {
    pub path: &'m str,
    pub namespace: &'m str,
    pub secret: Option<&'m str>,
    pub pooled: bool,
    pub pod_name: Option<&'m str>,
    pub target: &'m str,
}

// === impl ConfView ===

impl<'m> ConfView<'m> {
    pub fn new(model: &'m RoutingModel, port: NonZeroU16) -> Result<Self, Error> {
        let upstreams = Self::upstreams(model)?;

        let mut hosts = Vec::with_capacity(model.hosts.len());
        for (host, h) in &model.hosts {
            let mut locations = Vec::with_capacity(h.locations.len());
            for (path, location) in &h.locations {
                let (pooled, pod_name) = match &location.backend {
                    Backend::Direct(server) => (false, Some(server.pod_name.as_str())),
                    Backend::Upstream { key, .. } => {
                        if !model.upstreams.contains_key(key) {
                            return Err(Error::MissingUpstream {
                                host: host.clone(),
                                path: path.clone(),
                                key: key.clone(),
                            });
                        }
                        (true, None)
                    }
                };

                locations.push(LocationView {
                    path,
                    namespace: &location.namespace,
                    secret: location.secret.as_deref().filter(|s| !s.is_empty()),
                    pooled,
                    pod_name,
                    target: location.proxy_target(),
                });
            }

            hosts.push(HostView {
                name: host,
                locations,
            });
        }

        Ok(Self {
            port: port.get(),
            api_key_var: header_var(API_KEY_HEADER),
            upstreams,
            hosts,
        })
    }

    fn upstreams(model: &'m RoutingModel) -> Result<Vec<UpstreamView<'m>>, Error> {
        let mut keys_by_name = BTreeMap::<&str, &str>::new();
        let mut upstreams = Vec::with_capacity(model.upstreams.len());

        for (key, upstream) in &model.upstreams {
            if upstream.servers.is_empty() {
                return Err(Error::EmptyUpstream {
                    name: upstream.name.clone(),
                });
            }

            if let Some(first) = keys_by_name.insert(&upstream.name, key) {
                return Err(Error::UpstreamNameCollision {
                    name: upstream.name.clone(),
                    first: first.to_string(),
                    second: key.clone(),
                });
            }

            let mut servers = upstream.servers.iter().collect::<Vec<&Server>>();
            servers.sort_by(|a, b| a.target.cmp(&b.target));

            upstreams.push(UpstreamView {
                name: &upstream.name,
                host: &upstream.host,
                path: &upstream.path,
                servers: servers
                    .into_iter()
                    .map(|s| ServerView {
                        pod_name: &s.pod_name,
                        target: s.target.as_str(),
                    })
                    .collect(),
            });
        }

        Ok(upstreams)
    }
}

/// Returns the nginx variable holding a request header, e.g.
/// `X-Ingress-API-Key` becomes `http_x_ingress_api_key`.
fn header_var(header: &str) -> String {
    format!("http_{}", header.to_ascii_lowercase().replace('-', "_"))
}

#[cfg(test)]
mod tests {
    #[test]
    fn header_var() {
        assert_eq!(
            super::header_var("X-Ingress-API-Key"),
            "http_x_ingress_api_key"
        );
    }
}
