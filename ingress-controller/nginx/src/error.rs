use thiserror::Error;

/// Indicates that a routing model could not be rendered.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to render nginx configuration: {0}")]
    Template(#[from] minijinja::Error),

    #[error("location {host}{path} references missing upstream {key:?}")]
    MissingUpstream {
        host: String,
        path: String,
        key: String,
    },

    #[error("upstream {name} has no servers")]
    EmptyUpstream { name: String },

    #[error("upstream name {name} is derived from both {first:?} and {second:?}")]
    UpstreamNameCollision {
        name: String,
        first: String,
        second: String,
    },
}
