use anyhow::{ensure, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use subtle::ConstantTimeEq;
use tokio::sync::RwLock;

/// Holds username/password pairs for RFC 1929 authentication.
///
/// Mirrors the shape of the original proxy's password manager: usernames are
/// unique keys, `add` can either refuse or override an existing entry, and
/// `verify` is the only operation exposed on the hot path of a connection.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn add(&self, username: &str, password: &str, override_existing: bool) -> Result<()>;
    async fn remove(&self, username: &str) -> Result<()>;
    async fn set_password(&self, username: &str, password: &str) -> Result<()>;

    /// Constant-time check of a supplied (username, password) pair.
    async fn verify(&self, username: &str, password: &str) -> bool;
}

#[derive(Default)]
pub struct InMemoryCredentialStore {
    entries: RwLock<HashMap<String, String>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> InMemoryCredentialStore {
        InMemoryCredentialStore::default()
    }

    /// Seeds the store from an iterator of `(username, password)` pairs, as
    /// parsed out of a `--credentials-file`.
    pub fn from_pairs<I>(pairs: I) -> InMemoryCredentialStore
    where
        I: IntoIterator<Item = (String, String)>,
    {
        InMemoryCredentialStore {
            entries: RwLock::new(HashMap::from_iter(pairs)),
        }
    }
}

/// Usernames/passwords are 1..255 bytes with no embedded NUL, matching the
/// wire's ULEN/PLEN framing (RFC 1929) and the base spec's store contract.
fn validate_credential(kind: &str, value: &str) -> Result<()> {
    ensure!(!value.is_empty(), "{kind} must not be empty");
    ensure!(value.len() <= 255, "{kind} must not exceed 255 bytes");
    ensure!(!value.as_bytes().contains(&0), "{kind} must not contain a NUL byte");
    Ok(())
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn add(&self, username: &str, password: &str, override_existing: bool) -> Result<()> {
        validate_credential("username", username)?;
        validate_credential("password", password)?;

        let mut entries = self.entries.write().await;
        ensure!(
            override_existing || !entries.contains_key(username),
            "user '{username}' already exists"
        );
        entries.insert(username.to_owned(), password.to_owned());
        Ok(())
    }

    async fn remove(&self, username: &str) -> Result<()> {
        self.entries.write().await.remove(username);
        Ok(())
    }

    async fn set_password(&self, username: &str, password: &str) -> Result<()> {
        validate_credential("password", password)?;

        let mut entries = self.entries.write().await;
        ensure!(entries.contains_key(username), "user '{username}' does not exist");
        entries.insert(username.to_owned(), password.to_owned());
        Ok(())
    }

    async fn verify(&self, username: &str, password: &str) -> bool {
        let entries = self.entries.read().await;
        match entries.get(username) {
            Some(expected) => {
                expected.as_bytes().ct_eq(password.as_bytes()).into()
            }
            None => false,
        }
    }
}
