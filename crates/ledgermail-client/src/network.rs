//! Network selection.
//!
//! A [`NetworkContext`] pairs a network with the endpoint serving it.
//! Contexts are plain values threaded by reference through every call;
//! an operation that must touch a mailbox on another network builds a
//! second context instead of mutating shared state.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{ClientError, Result};

/// Default endpoint for the test network.
pub const TEST_ENDPOINT: &str = "https://horizon-testnet.ledgermail.net";

/// Default endpoint for the public network.
pub const PUBLIC_ENDPOINT: &str = "https://horizon.ledgermail.net";

/// A ledger network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Network {
    /// The permissive test network (supports on-demand funding).
    Test,
    /// The public network.
    Public,
    /// An explicitly identified custom network.
    Custom(String),
}

impl Network {
    /// The string identifier stored in account attributes.
    pub fn id(&self) -> &str {
        match self {
            Network::Test => "test",
            Network::Public => "public",
            Network::Custom(id) => id,
        }
    }

    /// Parse a network identifier.
    pub fn from_id(id: &str) -> Self {
        match id {
            "test" => Network::Test,
            "public" => Network::Public,
            other => Network::Custom(other.to_string()),
        }
    }

    /// The preregistered endpoint, if this is a well-known network.
    pub fn default_endpoint(&self) -> Option<&'static str> {
        match self {
            Network::Test => Some(TEST_ENDPOINT),
            Network::Public => Some(PUBLIC_ENDPOINT),
            Network::Custom(_) => None,
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

/// A selected network and the endpoint serving it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkContext {
    network: Network,
    endpoint: String,
}

impl NetworkContext {
    /// Select `network`, optionally overriding its endpoint.
    ///
    /// Selecting a custom network without an endpoint is a configuration
    /// error.
    pub fn select(network: Network, endpoint_override: Option<&str>) -> Result<Self> {
        let endpoint = match endpoint_override {
            Some(url) => url.to_string(),
            None => network
                .default_endpoint()
                .ok_or_else(|| ClientError::UnknownNetwork(network.id().to_string()))?
                .to_string(),
        };
        Ok(Self { network, endpoint })
    }

    /// The test network with its default endpoint.
    pub fn test() -> Self {
        Self::select(Network::Test, None).expect("test network has a default endpoint")
    }

    /// The public network with its default endpoint.
    pub fn public() -> Self {
        Self::select(Network::Public, None).expect("public network has a default endpoint")
    }

    /// The selected network.
    pub fn network(&self) -> &Network {
        &self.network
    }

    /// The endpoint URL.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_well_known_defaults() {
        assert_eq!(NetworkContext::test().endpoint(), TEST_ENDPOINT);
        assert_eq!(NetworkContext::public().endpoint(), PUBLIC_ENDPOINT);
    }

    #[test]
    fn test_endpoint_override() {
        let ctx = NetworkContext::select(Network::Test, Some("http://localhost:8000")).unwrap();
        assert_eq!(ctx.endpoint(), "http://localhost:8000");
        assert_eq!(ctx.network(), &Network::Test);
    }

    #[test]
    fn test_custom_network_requires_endpoint() {
        let err = NetworkContext::select(Network::Custom("dev".into()), None).unwrap_err();
        assert!(matches!(err, ClientError::UnknownNetwork(id) if id == "dev"));

        let ok = NetworkContext::select(Network::Custom("dev".into()), Some("http://dev:1234"));
        assert!(ok.is_ok());
    }

    #[test]
    fn test_network_id_roundtrip() {
        for network in [
            Network::Test,
            Network::Public,
            Network::Custom("dev".into()),
        ] {
            assert_eq!(Network::from_id(network.id()), network);
        }
    }
}
