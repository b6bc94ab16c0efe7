use crate::Outgoing;
use std::fmt;

/// The network address nginx proxies to, formatted as `ip` or `ip:port`.
///
/// Ports 80 and 443 are the scheme defaults and are left off.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Target(String);

const DEFAULT_PORTS: [&str; 2] = ["80", "443"];

// === impl Target ===

impl Target {
    pub fn new(ip: &str, port: &str) -> Self {
        if DEFAULT_PORTS.contains(&port) {
            Self(ip.to_string())
        } else {
            Self(format!("{ip}:{port}"))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Outgoing> for Target {
    fn from(outgoing: &Outgoing) -> Self {
        Self::new(&outgoing.ip, &outgoing.port)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("80", "10.0.0.5")]
    #[case("443", "10.0.0.5")]
    #[case("8080", "10.0.0.5:8080")]
    #[case("8443", "10.0.0.5:8443")]
    #[case("3000", "10.0.0.5:3000")]
    fn elides_default_ports(#[case] port: &str, #[case] expected: &str) {
        assert_eq!(Target::new("10.0.0.5", port).as_str(), expected);
    }

    #[test]
    fn from_outgoing() {
        let outgoing = Outgoing {
            ip: "10.1.2.3".to_string(),
            port: "443".to_string(),
        };
        assert_eq!(Target::from(&outgoing).to_string(), "10.1.2.3");
    }
}
