use crate::Cache;
use pods_ingress_core::{
    config::ApiKeySecret, upstream_name, Backend, Incoming, Location, Route, RoutingModel, Server,
    Target, Upstream,
};
use pods_ingress_k8s_api::ResourceExt;
use std::collections::btree_map::Entry;
use tracing::{debug, instrument, trace, warn};

/// Builds the routing model for a cache snapshot.
///
/// Pods are visited in key order so that the pod recorded for each address,
/// and the namespace whose secret guards each path, do not depend on the
/// cache's hashing.
#[instrument(skip_all, fields(pods = cache.pods.len(), secrets = cache.secrets.len()))]
pub fn aggregate(cache: &Cache, api_key: &ApiKeySecret) -> RoutingModel {
    let mut model = RoutingModel::default();
    if cache.pods.is_empty() {
        debug!("No routable pods");
        return model;
    }

    let mut pods = cache.pods.iter().collect::<Vec<_>>();
    pods.sort_unstable_by(|(a, _), (b, _)| a.cmp(b));

    for (_, entry) in pods {
        let pod_name = entry.pod.name_any();
        let namespace = entry.pod.namespace().unwrap_or_default();
        let secret = cache.api_key(&namespace, api_key);

        for route in &entry.routes {
            apply_route(&mut model, &pod_name, &namespace, secret.as_deref(), route);
        }
    }

    debug!(
        hosts = model.hosts.len(),
        upstreams = model.upstreams.len(),
        "Aggregated routes"
    );
    model
}

fn apply_route(
    model: &mut RoutingModel,
    pod_name: &str,
    namespace: &str,
    secret: Option<&str>,
    route: &Route,
) {
    let Route {
        incoming: Incoming { host, path },
        outgoing,
    } = route;
    let server = Server {
        pod_name: pod_name.to_string(),
        target: Target::from(outgoing),
    };

    let RoutingModel { hosts, upstreams } = model;
    let locations = &mut hosts.entry(host.clone()).or_default().locations;

    let location = match locations.entry(path.clone()) {
        Entry::Vacant(entry) => {
            trace!(%host, %path, pod = %pod_name, target = %server.target, "Adding location");
            entry.insert(Location {
                namespace: namespace.to_string(),
                path: path.clone(),
                secret: secret.map(ToString::to_string),
                backend: Backend::Direct(server),
            });
            return;
        }
        Entry::Occupied(entry) => entry.into_mut(),
    };

    if location.secret.as_deref() != secret {
        warn!(
            %host,
            %path,
            namespace = %location.namespace,
            conflicting_namespace = %namespace,
            "Routes for the same path resolve different API keys; keeping the first"
        );
    }

    let prior = match &location.backend {
        Backend::Direct(prior) if prior.target == server.target => {
            trace!(%host, %path, target = %server.target, "Target already routed");
            return;
        }
        Backend::Direct(prior) => prior.clone(),
        Backend::Upstream { key, name } => {
            let upstream = upstreams
                .entry(key.clone())
                .or_insert_with(|| Upstream::new(name, host, path));
            let target = server.target.clone();
            if upstream.insert(server) {
                debug!(%host, %path, upstream = %upstream.name, %target, "Added upstream member");
            } else {
                trace!(
                    %host,
                    %path,
                    upstream = %upstream.name,
                    %target,
                    "Upstream member already exists"
                );
            }
            return;
        }
    };

    // A second address for the path promotes the location to an upstream.
    let key = route.upstream_key();
    let name = upstream_name(&key);
    let upstream = upstreams
        .entry(key.clone())
        .or_insert_with(|| Upstream::new(&name, host, path));
    upstream.insert(prior);
    upstream.insert(server);
    debug!(
        %host,
        %path,
        upstream = %name,
        members = upstream.servers.len(),
        "Promoted location to upstream"
    );

    location.backend = Backend::Upstream { key, name };
}
