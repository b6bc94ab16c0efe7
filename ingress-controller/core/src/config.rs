//! Validated controller configuration.
//!
//! The annotation names and label selector are consumed by the layer that
//! builds the route cache; the renderer only needs the listen port and the
//! API key secret location.

use regex::Regex;
use std::{fmt, num::NonZeroU16, str::FromStr, sync::LazyLock};
use thiserror::Error;

pub const DEFAULT_PORT: u16 = 80;
pub const DEFAULT_HOSTS_ANNOTATION: &str = "routingHosts";
pub const DEFAULT_PATHS_ANNOTATION: &str = "routingPaths";
pub const DEFAULT_API_KEY_SECRET: &str = "routing";
pub const DEFAULT_API_KEY_SECRET_DATA_FIELD: &str = "api-key";
pub const DEFAULT_API_KEY_SECRET_LOCATION: &str = "routing:api-key";
pub const DEFAULT_ROUTABLE_LABEL_SELECTOR: &str = "routable=true";

pub const ENV_API_KEY_SECRET_LOCATION: &str = "API_KEY_SECRET_LOCATION";
pub const ENV_HOSTS_ANNOTATION: &str = "HOSTS_ANNOTATION";
pub const ENV_PATHS_ANNOTATION: &str = "PATHS_ANNOTATION";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ROUTABLE_LABEL_SELECTOR: &str = "ROUTABLE_LABEL_SELECTOR";

const QUALIFIED_NAME_MAX_LEN: usize = 63;
const DNS1123_SUBDOMAIN_MAX_LEN: usize = 253;

static QUALIFIED_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z0-9][-A-Za-z0-9_.]*)?[A-Za-z0-9]$").expect("should compile")
});

static DNS1123_SUBDOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?(\.[a-z0-9]([-a-z0-9]*[a-z0-9])?)*$")
        .expect("should compile")
});

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// The port nginx listens on.
    pub port: NonZeroU16,

    /// The pod annotation listing the hosts a pod serves.
    pub hosts_annotation: AnnotationName,

    /// The pod annotation listing the paths a pod serves.
    pub paths_annotation: AnnotationName,

    pub api_key_secret: ApiKeySecret,

    /// Selects the pods and secrets that participate in routing.
    pub routable_label_selector: LabelSelector,
}

/// Identifies the secret (and the field within it) holding a namespace's API
/// key, written as `name:field`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ApiKeySecret {
    pub name: String,
    pub data_field: String,
}

/// A Kubernetes qualified name, e.g. `routingHosts` or `example.com/hosts`.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct AnnotationName(String);

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LabelSelector(String);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "API_KEY_SECRET_LOCATION is not in the format of \
         {{API_KEY_SECRET_NAME}}:{{API_KEY_SECRET_DATA_FIELD_NAME}}"
    )]
    InvalidApiKeySecretLocation,

    #[error("invalid annotation name: {0}")]
    InvalidAnnotationName(String),

    #[error("{var} has an invalid annotation name: {value}")]
    InvalidAnnotation { var: &'static str, value: String },

    #[error("invalid label selector: {0:?}")]
    InvalidLabelSelector(String),
}

// === impl Config ===

impl Default for Config {
    fn default() -> Self {
        Self {
            port: NonZeroU16::new(DEFAULT_PORT).expect("default port must be non-zero"),
            hosts_annotation: AnnotationName(DEFAULT_HOSTS_ANNOTATION.to_string()),
            paths_annotation: AnnotationName(DEFAULT_PATHS_ANNOTATION.to_string()),
            api_key_secret: ApiKeySecret::default(),
            routable_label_selector: LabelSelector(DEFAULT_ROUTABLE_LABEL_SELECTOR.to_string()),
        }
    }
}

impl Config {
    /// Builds a configuration from raw values, reporting which variable held
    /// an invalid annotation name.
    pub fn from_parts(
        port: NonZeroU16,
        hosts_annotation: &str,
        paths_annotation: &str,
        api_key_secret_location: &str,
        routable_label_selector: &str,
    ) -> Result<Self, ConfigError> {
        let annotation = |var: &'static str, value: &str| {
            value
                .parse::<AnnotationName>()
                .map_err(|_| ConfigError::InvalidAnnotation {
                    var,
                    value: value.to_string(),
                })
        };

        Ok(Self {
            port,
            hosts_annotation: annotation(ENV_HOSTS_ANNOTATION, hosts_annotation)?,
            paths_annotation: annotation(ENV_PATHS_ANNOTATION, paths_annotation)?,
            api_key_secret: api_key_secret_location.parse()?,
            routable_label_selector: routable_label_selector.parse()?,
        })
    }
}

// === impl ApiKeySecret ===

impl Default for ApiKeySecret {
    fn default() -> Self {
        Self {
            name: DEFAULT_API_KEY_SECRET.to_string(),
            data_field: DEFAULT_API_KEY_SECRET_DATA_FIELD.to_string(),
        }
    }
}

impl FromStr for ApiKeySecret {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.split(':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(name), Some(data_field), None) => Ok(Self {
                name: name.to_string(),
                data_field: data_field.to_string(),
            }),
            _ => Err(ConfigError::InvalidApiKeySecretLocation),
        }
    }
}

impl fmt::Display for ApiKeySecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.name, self.data_field)
    }
}

// === impl AnnotationName ===

impl AnnotationName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Annotation names are validated case-insensitively, but the original
/// spelling is kept.
impl FromStr for AnnotationName {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if is_qualified_name(&s.to_lowercase()) {
            Ok(Self(s.to_string()))
        } else {
            Err(ConfigError::InvalidAnnotationName(s.to_string()))
        }
    }
}

impl fmt::Display for AnnotationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_qualified_name(s: &str) -> bool {
    let mut parts = s.split('/');
    let (prefix, name) = match (parts.next(), parts.next(), parts.next()) {
        (Some(name), None, None) => (None, name),
        (Some(prefix), Some(name), None) => (Some(prefix), name),
        _ => return false,
    };

    if let Some(prefix) = prefix {
        if prefix.is_empty()
            || prefix.len() > DNS1123_SUBDOMAIN_MAX_LEN
            || !DNS1123_SUBDOMAIN.is_match(prefix)
        {
            return false;
        }
    }

    !name.is_empty() && name.len() <= QUALIFIED_NAME_MAX_LEN && QUALIFIED_NAME.is_match(name)
}

// === impl LabelSelector ===

impl LabelSelector {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Only rejects blank selectors; the watch layer parses the full grammar.
impl FromStr for LabelSelector {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(ConfigError::InvalidLabelSelector(s.to_string()));
        }
        Ok(Self(s.to_string()))
    }
}

impl fmt::Display for LabelSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn defaults() {
        let config = Config::default();
        assert_eq!(config.port.get(), 80);
        assert_eq!(config.hosts_annotation.as_str(), "routingHosts");
        assert_eq!(config.paths_annotation.as_str(), "routingPaths");
        assert_eq!(config.api_key_secret.to_string(), DEFAULT_API_KEY_SECRET_LOCATION);
        assert_eq!(config.routable_label_selector.as_str(), "routable=true");
    }

    #[test]
    fn default_secret_location_parses_to_default() {
        let parsed = DEFAULT_API_KEY_SECRET_LOCATION
            .parse::<ApiKeySecret>()
            .unwrap();
        assert_eq!(parsed, ApiKeySecret::default());
    }

    #[rstest]
    #[case("routing")]
    #[case("a:b:c")]
    #[case("")]
    fn rejects_malformed_secret_locations(#[case] location: &str) {
        assert_eq!(
            location.parse::<ApiKeySecret>(),
            Err(ConfigError::InvalidApiKeySecretLocation)
        );
    }

    #[test]
    fn secret_location_error_message() {
        assert_eq!(
            ConfigError::InvalidApiKeySecretLocation.to_string(),
            "API_KEY_SECRET_LOCATION is not in the format of \
             {API_KEY_SECRET_NAME}:{API_KEY_SECRET_DATA_FIELD_NAME}"
        );
    }

    #[rstest]
    #[case("routingHosts", true)]
    #[case("routing-paths", true)]
    #[case("example.com/hosts", true)]
    #[case("Example.COM/Hosts", true)]
    #[case("", false)]
    #[case("-leading", false)]
    #[case("trailing-", false)]
    #[case("/hosts", false)]
    #[case("a/b/c", false)]
    #[case("bad prefix/hosts", false)]
    #[case("has space", false)]
    fn validates_annotation_names(#[case] name: &str, #[case] valid: bool) {
        assert_eq!(name.parse::<AnnotationName>().is_ok(), valid, "{name:?}");
    }

    #[test]
    fn annotation_names_keep_their_case() {
        let name = "routingHosts".parse::<AnnotationName>().unwrap();
        assert_eq!(name.to_string(), "routingHosts");
    }

    #[test]
    fn rejects_long_annotation_names() {
        let name = "a".repeat(QUALIFIED_NAME_MAX_LEN + 1);
        assert!(name.parse::<AnnotationName>().is_err());
    }

    #[test]
    fn from_parts_reports_the_offending_variable() {
        let port = NonZeroU16::new(8080).unwrap();
        let err = Config::from_parts(
            port,
            "routingHosts",
            "bad/path/name",
            "routing:api-key",
            "a=b",
        )
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "PATHS_ANNOTATION has an invalid annotation name: bad/path/name"
        );

        let config =
            Config::from_parts(port, "hosts", "paths", "secret:key", "app=web").unwrap();
        assert_eq!(config.port.get(), 8080);
        assert_eq!(config.api_key_secret.name, "secret");
        assert_eq!(config.api_key_secret.data_field, "key");
    }

    #[test]
    fn rejects_blank_selectors() {
        assert!(" ".parse::<LabelSelector>().is_err());
        assert!("routable=true".parse::<LabelSelector>().is_ok());
    }
}
