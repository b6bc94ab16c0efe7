use crate::{core::Config, index, nginx::Renderer};
use anyhow::{Context, Result};
use clap::Parser;
use std::{
    num::NonZeroU16,
    path::{Path, PathBuf},
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

/// Renders an nginx configuration from a snapshot of routable pods.
#[derive(Debug, Parser)]
#[clap(name = "pods-ingress", about = "An nginx configuration generator for routable pods")]
pub struct Args {
    #[clap(long, default_value = "pods_ingress=info,warn", env = "PODS_INGRESS_LOG")]
    log_level: kubert::LogFilter,

    #[clap(long, default_value = "plain", env = "PODS_INGRESS_LOG_FORMAT")]
    log_format: kubert::LogFormat,

    /// The port nginx listens on.
    #[clap(long, default_value = "80", env = "PORT")]
    port: NonZeroU16,

    /// The pod annotation that lists the hosts a pod serves.
    #[clap(long, default_value = "routingHosts", env = "HOSTS_ANNOTATION")]
    hosts_annotation: String,

    /// The pod annotation that lists the paths a pod serves.
    #[clap(long, default_value = "routingPaths", env = "PATHS_ANNOTATION")]
    paths_annotation: String,

    /// The secret and data field holding each namespace's API key, as
    /// `name:field`.
    #[clap(long, default_value = "routing:api-key", env = "API_KEY_SECRET_LOCATION")]
    api_key_secret_location: String,

    /// Selects the pods and secrets that participate in routing.
    #[clap(long, default_value = "routable=true", env = "ROUTABLE_LABEL_SELECTOR")]
    routable_label_selector: String,

    /// A JSON snapshot of the route cache.
    #[clap(long, env = "PODS_INGRESS_CACHE")]
    cache: PathBuf,
}

impl Args {
    #[inline]
    pub async fn parse_and_run() -> Result<()> {
        Self::parse().run().await
    }

    pub async fn run(self) -> Result<()> {
        let Self {
            log_level,
            log_format,
            port,
            hosts_annotation,
            paths_annotation,
            api_key_secret_location,
            routable_label_selector,
            cache,
        } = self;

        log_format
            .try_init(log_level)
            .context("failed to initialize logging")?;

        let config = Config::from_parts(
            port,
            &hosts_annotation,
            &paths_annotation,
            &api_key_secret_location,
            &routable_label_selector,
        )?;
        info!(
            port = %config.port,
            hosts_annotation = %config.hosts_annotation,
            paths_annotation = %config.paths_annotation,
            api_key_secret = %config.api_key_secret,
            selector = %config.routable_label_selector,
            "Loaded configuration"
        );

        // Templates are compiled once and reused for every document.
        let renderer = Renderer::new(config.port)?;

        let conf = generate(&renderer, &config, &cache).await?;

        let mut stdout = tokio::io::stdout();
        stdout.write_all(conf.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}

/// Reads a cache snapshot and renders its configuration. Nothing is written
/// unless the whole document renders, so a caller can keep serving its last
/// good configuration on error.
#[instrument(skip(renderer, config), fields(path = %path.display()))]
async fn generate(renderer: &Renderer, config: &Config, path: &Path) -> Result<String> {
    let snapshot = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read cache snapshot {}", path.display()))?;
    let cache = serde_json::from_slice::<index::Cache>(&snapshot)
        .with_context(|| format!("failed to parse cache snapshot {}", path.display()))?;
    debug!(pods = cache.pods.len(), secrets = cache.secrets.len(), "Read cache snapshot");

    let model = index::aggregate(&cache, &config.api_key_secret);
    let conf = renderer
        .render(&model)
        .context("failed to render nginx configuration")?;
    Ok(conf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("pods-ingress").chain(args.iter().copied()))
            .expect("arguments must parse")
    }

    #[test]
    fn defaults() {
        let args = parse(&["--cache", "/tmp/cache.json"]);
        assert_eq!(args.port.get(), 80);
        assert_eq!(args.hosts_annotation, "routingHosts");
        assert_eq!(args.paths_annotation, "routingPaths");
        assert_eq!(args.api_key_secret_location, "routing:api-key");
        assert_eq!(args.routable_label_selector, "routable=true");
        assert_eq!(args.cache, PathBuf::from("/tmp/cache.json"));
    }

    #[test]
    fn rejects_invalid_ports() {
        for port in ["0", "65536", "http"] {
            assert!(
                Args::try_parse_from(["pods-ingress", "--cache", "c.json", "--port", port])
                    .is_err(),
                "{port}"
            );
        }
    }

    #[tokio::test]
    async fn generates_from_snapshot() {
        let path = std::env::temp_dir().join(format!(
            "pods-ingress-snapshot-{}.json",
            std::process::id()
        ));
        tokio::fs::write(
            &path,
            r#"{"pods": {"ns1/pod-0": {
                "pod": {"metadata": {"name": "pod-0", "namespace": "ns1"}},
                "routes": [{"incoming": {"host": "a.com", "path": "/"},
                            "outgoing": {"ip": "10.0.0.5", "port": "8080"}}]
            }}}"#,
        )
        .await
        .unwrap();

        let config = Config::default();
        let renderer = Renderer::new(config.port).unwrap();
        let conf = generate(&renderer, &config, &path).await;
        let _ = tokio::fs::remove_file(&path).await;

        let conf = conf.expect("snapshot must render");
        assert!(conf.contains("server_name a.com;"));
        assert!(conf.contains("proxy_pass http://10.0.0.5:8080;"));
    }

    #[tokio::test]
    async fn missing_snapshot_is_an_error() {
        let config = Config::default();
        let renderer = Renderer::new(config.port).unwrap();
        let err = generate(&renderer, &config, Path::new("/nonexistent/cache.json"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("failed to read cache snapshot"));
    }
}
