//! Renders a routing model as an nginx configuration document.
//!
//! Every generated document ends with a default server that closes
//! connections for unknown hosts. nginx otherwise sends requests for an
//! unmatched `Host` to the first server block, which would leak routes.
//! When there is nothing to route, the renderer emits a minimal document
//! holding only that default server.

#![deny(warnings, rust_2018_idioms)]
#![forbid(unsafe_code)]

mod error;
mod view;


pub use self::error::Error;
use self::view::ConfView;
use minijinja::{context, Environment, UndefinedBehavior};
use pods_ingress_core::RoutingModel;
use std::{fmt, num::NonZeroU16};
use tracing::debug;

/// The request header checked against a namespace's API key.
pub const API_KEY_HEADER: &str = "X-Ingress-API-Key";

const NGINX_CONF: &str = "nginx.conf";
const DEFAULT_CONF: &str = "default.conf";
const DEFAULT_SERVER_CONF: &str = "default-server.conf";

/// Compiles the nginx templates once and renders routing models with them.
///
/// A `Renderer` is immutable after construction and may be shared freely.
pub struct Renderer {
    env: Environment<'static>,
    port: NonZeroU16,
}

// === impl Renderer ===

impl Renderer {
    /// Compiles the configuration templates for servers listening on `port`.
    pub fn new(port: NonZeroU16) -> Result<Self, Error> {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_keep_trailing_newline(true);

        env.add_template(
            DEFAULT_SERVER_CONF,
            include_str!("../templates/default-server.conf"),
        )?;
        env.add_template(DEFAULT_CONF, include_str!("../templates/default.conf"))?;
        env.add_template(NGINX_CONF, include_str!("../templates/nginx.conf"))?;

        Ok(Self { env, port })
    }

    /// Renders the configuration for `model`.
    ///
    /// An empty model renders the default document. Otherwise the model is
    /// checked for dangling or empty upstreams and for upstream name
    /// collisions before anything is rendered; no partial document is ever
    /// returned.
    pub fn render(&self, model: &RoutingModel) -> Result<String, Error> {
        if model.is_empty() {
            debug!("No routes; rendering default configuration");
            return self.render_default();
        }

        let view = ConfView::new(model, self.port)?;
        let conf = self.env.get_template(NGINX_CONF)?.render(&view)?;
        debug!(
            hosts = view.hosts.len(),
            upstreams = view.upstreams.len(),
            "Rendered configuration"
        );
        Ok(conf)
    }

    /// Renders the document used when nothing is routable: nginx runs as a
    /// daemon and closes every connection.
    pub fn render_default(&self) -> Result<String, Error> {
        let conf = self
            .env
            .get_template(DEFAULT_CONF)?
            .render(context! { port => self.port.get() })?;
        Ok(conf)
    }
}

impl fmt::Debug for Renderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Renderer")
            .field("port", &self.port)
            .finish_non_exhaustive()
    }
}
