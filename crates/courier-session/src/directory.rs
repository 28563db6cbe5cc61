//! Durable identity storage.
//!
//! [`IdentityStore`] is the seam to whatever database holds confirmed
//! identities. [`MemoryIdentityStore`] keeps them in a map and is what
//! tests and single-process deployments use.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use courier_protocol::{EmailAddress, Identity, StorageError, UserId};
use parking_lot::RwLock;

/// Lookup and creation of confirmed identities.
///
/// Implementations must make `create` atomic with respect to the email:
/// of two concurrent creates for one address, at most one succeeds.
pub trait IdentityStore: Send + Sync + 'static {
    /// Finds the identity registered under `email`.
    fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> impl Future<Output = Result<Option<Identity>, StorageError>> + Send;

    /// Finds the identity with id `id`.
    fn find_by_id(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<Option<Identity>, StorageError>> + Send;

    /// Persists a new identity.
    ///
    /// # Errors
    /// [`StorageError::Conflict`] if the email or the id is already taken.
    fn create(
        &self,
        identity: Identity,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<S: IdentityStore> IdentityStore for Arc<S> {
    fn find_by_email(
        &self,
        email: &EmailAddress,
    ) -> impl Future<Output = Result<Option<Identity>, StorageError>> + Send {
        (**self).find_by_email(email)
    }

    fn find_by_id(
        &self,
        id: &UserId,
    ) -> impl Future<Output = Result<Option<Identity>, StorageError>> + Send {
        (**self).find_by_id(id)
    }

    fn create(&self, identity: Identity) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).create(identity)
    }
}

/// In-memory [`IdentityStore`].
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    identities: RwLock<HashMap<UserId, Identity>>,
}

impl MemoryIdentityStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored identities.
    pub fn len(&self) -> usize {
        self.identities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.read().is_empty()
    }
}

impl IdentityStore for MemoryIdentityStore {
    async fn find_by_email(&self, email: &EmailAddress) -> Result<Option<Identity>, StorageError> {
        let identities = self.identities.read();
        Ok(identities.values().find(|i| &i.email == email).cloned())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<Identity>, StorageError> {
        Ok(self.identities.read().get(id).cloned())
    }

    async fn create(&self, identity: Identity) -> Result<(), StorageError> {
        let mut identities = self.identities.write();
        if identities.values().any(|i| i.email == identity.email) {
            return Err(StorageError::Conflict(format!(
                "email {} is already registered",
                identity.email
            )));
        }
        if identities.contains_key(&identity.id) {
            return Err(StorageError::Conflict(format!(
                "identity id {} is already taken",
                identity.id
            )));
        }
        tracing::info!(user_id = %identity.id, "identity created");
        identities.insert(identity.id.clone(), identity);
        Ok(())
    }
}
