use std::path::Path;

use anyhow::{bail, Context, Result};
use indexmap::IndexMap;
use twitter::{Credential, TwitterClient};

/// All credentialed clients for one run, keyed by account alias. Built
/// once at startup and handed to workers read-only; aliases keep the
/// order they have in the store file, which fixes worker and merge order.
pub struct CredentialPool {
    clients: IndexMap<String, TwitterClient>,
}

impl CredentialPool {
    /// Load the credential store and build one client per alias. There is
    /// no recovering from a bad store, so any failure here is fatal.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref()).with_context(|| {
            format!("unable to read credential store {}", path.as_ref().display())
        })?;
        Self::from_toml(&contents)
    }

    fn from_toml(contents: &str) -> Result<Self> {
        let store: IndexMap<String, Credential> =
            toml::from_str(contents).context("unable to parse credential store")?;
        if store.is_empty() {
            bail!("credential store is empty");
        }

        let clients = store
            .into_iter()
            .map(|(alias, credential)| (alias, TwitterClient::new(&credential)))
            .collect();
        Ok(Self { clients })
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TwitterClient)> {
        self.clients.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORE: &str = r#"
        [zeta]
        bearer_token = "zzz"

        [alpha]
        bearer_token = "aaa"
        api_key = "k"
        api_key_secret = "s"
        access_token = "t"
        access_token_secret = "ts"
    "#;

    #[test]
    fn aliases_keep_store_order() {
        let pool = CredentialPool::from_toml(STORE).unwrap();
        let aliases: Vec<&String> = pool.iter().map(|(alias, _)| alias).collect();
        assert_eq!(aliases, vec!["zeta", "alpha"]);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn empty_store_is_fatal() {
        assert!(CredentialPool::from_toml("").is_err());
    }

    #[test]
    fn unparseable_store_is_fatal() {
        assert!(CredentialPool::from_toml("[broken").is_err());
        assert!(CredentialPool::from_toml("[acct]\napi_key = \"k\"\n").is_err());
    }
}
