//! Per-account sharing configuration.
//!
//! The configuration lives on the ledger itself, as three data
//! attributes of the coordinated account. It is read fresh on every
//! protocol call so concurrent processes managing the same account
//! always see the ledger's current state.

use ledgermail_client::{Account, Federation, Ledger, Network, NetworkContext};
use ledgermail_core::{AccountId, Keypair, Operation, Tag, TransactionBuilder};
use ledgermail_messenger::MIN_STARTING_BALANCE;

use crate::error::{MultisigError, Result};
use crate::user::{Outcome, UserRef};
use crate::Multisig;

/// Attribute holding the mailbox account identifier. Its absence means
/// sharing is disabled.
pub const ATTR_MAILBOX: &str = "config:multisig";

/// Attribute naming the network the mailbox lives on.
pub const ATTR_NETWORK: &str = "config:multisig:network";

/// Attribute overriding the endpoint for that network.
pub const ATTR_ENDPOINT: &str = "config:multisig:endpoint";

/// An account's sharing configuration, as read from its attributes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SharingConfig {
    /// The mailbox co-signers deliver to.
    pub mailbox: AccountId,
    /// Network the mailbox lives on; the home network when the
    /// attribute is unset.
    pub network: Network,
    /// Endpoint override, if any.
    pub endpoint: Option<String>,
}

/// Settings accepted by [`Multisig::enable`] and
/// [`Multisig::reconfigure`].
#[derive(Debug, Clone, Default)]
pub struct EnableOptions {
    /// Mailbox to use; generated from a fresh random keypair when
    /// absent.
    pub mailbox: Option<AccountId>,
    /// Network attribute to record; unset falls back to the home
    /// network at read time.
    pub network: Option<Network>,
    /// Endpoint attribute to record.
    pub endpoint: Option<String>,
}

/// Parse `account`'s sharing attributes. `home` fills the network when
/// the attribute is unset.
pub(crate) fn read_config(account: &Account, home: &Network) -> Option<SharingConfig> {
    let mailbox = account.attr(ATTR_MAILBOX)?;
    let mailbox = AccountId::new(String::from_utf8_lossy(mailbox).into_owned());
    let network = account
        .attr(ATTR_NETWORK)
        .map(|bytes| Network::from_id(&String::from_utf8_lossy(bytes)))
        .unwrap_or_else(|| home.clone());
    let endpoint = account
        .attr(ATTR_ENDPOINT)
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned());
    Some(SharingConfig {
        mailbox,
        network,
        endpoint,
    })
}

fn set_attr(name: &str, value: &str) -> Operation {
    Operation::ManageData {
        name: name.to_string(),
        value: Some(bytes::Bytes::copy_from_slice(value.as_bytes())),
    }
}

fn clear_attr(name: &str) -> Operation {
    Operation::ManageData {
        name: name.to_string(),
        value: None,
    }
}

impl<L, F> Multisig<L, F>
where
    L: Ledger + 'static,
    F: Federation + 'static,
{
    /// The sharing configuration of `user`'s account, read fresh.
    pub async fn config(&self, user: &UserRef) -> Result<Option<SharingConfig>> {
        let account = self.resolve_user(user).await?;
        Ok(read_config(&account, self.home().network()))
    }

    /// Whether sharing is enabled on `user`'s account.
    pub async fn is_enabled(&self, user: &UserRef) -> Result<bool> {
        Ok(self.config(user).await?.is_some())
    }

    /// The network context the configured mailbox lives on.
    pub fn mailbox_context(&self, config: &SharingConfig) -> Result<NetworkContext> {
        if &config.network == self.home().network() && config.endpoint.is_none() {
            return Ok(self.home().clone());
        }
        Ok(NetworkContext::select(
            config.network.clone(),
            config.endpoint.as_deref(),
        )?)
    }

    /// Turn sharing on for `user`'s account.
    ///
    /// Builds the configuration transaction setting the attributes; a
    /// generated mailbox on the home network is created by the same
    /// transaction, a generated mailbox on a foreign network is
    /// established there first. Already enabled is a signal (`None`),
    /// not an error.
    pub async fn enable(&self, user: &UserRef, options: EnableOptions) -> Result<Option<Outcome>> {
        let account = self.resolve_user(user).await?;
        if read_config(&account, self.home().network()).is_some() {
            tracing::debug!(account = %account.id, "sharing already enabled");
            return Ok(None);
        }

        let generated = options.mailbox.is_none();
        let mailbox = options
            .mailbox
            .clone()
            .unwrap_or_else(|| Keypair::generate().account_id());
        let sharing_network = options
            .network
            .clone()
            .unwrap_or_else(|| self.home().network().clone());

        let mut builder = TransactionBuilder::new(account.id.clone(), account.sequence + 1)
            .memo(Tag::text("Enable signature sharing"))
            .operation(set_attr(ATTR_MAILBOX, mailbox.as_str()));
        if let Some(network) = &options.network {
            builder = builder.operation(set_attr(ATTR_NETWORK, network.id()));
        }
        if let Some(endpoint) = &options.endpoint {
            builder = builder.operation(set_attr(ATTR_ENDPOINT, endpoint));
        }

        if generated {
            if &sharing_network == self.home().network() {
                builder = builder.operation(Operation::CreateAccount {
                    destination: mailbox.clone(),
                    starting_balance: MIN_STARTING_BALANCE,
                });
            } else {
                // The configuration transaction runs on the home
                // network; a foreign mailbox must be established on its
                // own network beforehand.
                let ctx =
                    NetworkContext::select(sharing_network.clone(), options.endpoint.as_deref())?;
                self.ledger()
                    .ensure_funded(&mailbox, &ctx)
                    .await
                    .map_err(|e| match e {
                        ledgermail_client::ClientError::UnsupportedNetwork(_) => {
                            MultisigError::CrossNetworkAccount(mailbox.clone())
                        }
                        other => MultisigError::Client(other),
                    })?;
            }
        }

        let outcome = self.finish(builder.build(), user, self.home()).await?;
        Ok(Some(outcome))
    }

    /// Change the mailbox, network or endpoint of an enabled account.
    pub async fn reconfigure(&self, user: &UserRef, options: EnableOptions) -> Result<Outcome> {
        let account = self.resolve_user(user).await?;
        if read_config(&account, self.home().network()).is_none() {
            return Err(MultisigError::NotEnabled(account.id));
        }

        let mut builder = TransactionBuilder::new(account.id.clone(), account.sequence + 1)
            .memo(Tag::text("Update signature sharing"));
        if let Some(mailbox) = &options.mailbox {
            builder = builder.operation(set_attr(ATTR_MAILBOX, mailbox.as_str()));
        }
        if let Some(network) = &options.network {
            builder = builder.operation(set_attr(ATTR_NETWORK, network.id()));
        }
        if let Some(endpoint) = &options.endpoint {
            builder = builder.operation(set_attr(ATTR_ENDPOINT, endpoint));
        }

        self.finish(builder.build(), user, self.home()).await
    }

    /// Turn sharing off, clearing every configuration attribute.
    /// Already disabled is a signal (`None`), not an error.
    pub async fn disable(&self, user: &UserRef) -> Result<Option<Outcome>> {
        let account = self.resolve_user(user).await?;
        if read_config(&account, self.home().network()).is_none() {
            tracing::debug!(account = %account.id, "sharing already disabled");
            return Ok(None);
        }

        let clearing = account
            .config_attrs
            .keys()
            .filter(|key| {
                key.as_str() == ATTR_MAILBOX
                    || key.as_str() == ATTR_NETWORK
                    || key.as_str() == ATTR_ENDPOINT
            })
            .cloned()
            .collect::<Vec<_>>();

        let mut builder = TransactionBuilder::new(account.id.clone(), account.sequence + 1)
            .memo(Tag::text("Disable signature sharing"));
        for key in clearing {
            builder = builder.operation(clear_attr(&key));
        }

        let outcome = self.finish(builder.build(), user, self.home()).await?;
        Ok(Some(outcome))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn account_with_attrs(attrs: &[(&str, &str)]) -> Account {
        let mut config_attrs = BTreeMap::new();
        for (key, value) in attrs {
            config_attrs.insert(key.to_string(), value.as_bytes().to_vec());
        }
        Account {
            id: AccountId::new("ab".repeat(32)),
            sequence: 0,
            config_attrs,
            signers: Vec::new(),
        }
    }

    #[test]
    fn test_absent_mailbox_means_disabled() {
        let account = account_with_attrs(&[(ATTR_NETWORK, "public")]);
        assert_eq!(read_config(&account, &Network::Test), None);
    }

    #[test]
    fn test_network_falls_back_to_home() {
        let mailbox = "cd".repeat(32);
        let account = account_with_attrs(&[(ATTR_MAILBOX, &mailbox)]);
        let config = read_config(&account, &Network::Public).unwrap();
        assert_eq!(config.mailbox.as_str(), mailbox);
        assert_eq!(config.network, Network::Public);
        assert_eq!(config.endpoint, None);
    }

    #[test]
    fn test_full_config_parsed() {
        let mailbox = "cd".repeat(32);
        let account = account_with_attrs(&[
            (ATTR_MAILBOX, &mailbox),
            (ATTR_NETWORK, "dev"),
            (ATTR_ENDPOINT, "http://dev:1234"),
        ]);
        let config = read_config(&account, &Network::Test).unwrap();
        assert_eq!(config.network, Network::Custom("dev".into()));
        assert_eq!(config.endpoint.as_deref(), Some("http://dev:1234"));
    }
}
