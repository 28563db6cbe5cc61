//! `Courier` builder and service handle.
//!
//! This is the entry point for running Courier. It ties together all the
//! layers: transport → protocol → session → dispatch → groups.

use std::sync::Arc;

use courier_dispatch::Dispatcher;
use courier_protocol::{Envelope, Response};
use courier_session::{
    AuthFlow, CredentialStore, IdentityStore, MemoryIdentityStore, OwnershipGate, SessionIssuer,
    spawn_sweeper,
};
use courier_transport::Mailer;
use tokio::task::JoinHandle;

use crate::{
    ContentResolver, CourierConfig, CourierError, FsContentResolver, GroupService, GroupStore,
    MemoryGroupStore, RequestHandler,
};

/// Builder for wiring a [`Courier`] from its collaborators.
///
/// # Example
///
/// ```rust,ignore
/// use courier::prelude::*;
///
/// let config = CourierConfig::from_env()?;
/// let courier = Courier::builder(config)
///     .build_in_memory(LogMailer::new())
///     .await?;
/// let response = courier.handle(envelope).await;
/// ```
pub struct CourierBuilder {
    config: CourierConfig,
}

impl CourierBuilder {
    pub fn new(config: CourierConfig) -> Self {
        Self { config }
    }

    /// Builds a service with in-memory stores and local-file content.
    pub async fn build_in_memory<M: Mailer>(
        self,
        mailer: M,
    ) -> Result<Courier<MemoryIdentityStore, MemoryGroupStore, FsContentResolver, M>, CourierError>
    {
        self.build(
            MemoryIdentityStore::new(),
            MemoryGroupStore::new(),
            FsContentResolver::new(),
            mailer,
        )
        .await
    }

    /// Builds the service and starts the credential sweeper.
    ///
    /// Must be called inside a Tokio runtime.
    pub async fn build<S, G, C, M>(
        self,
        identities: S,
        groups: G,
        content: C,
        mailer: M,
    ) -> Result<Courier<S, G, C, M>, CourierError>
    where
        S: IdentityStore,
        G: GroupStore,
        C: ContentResolver,
        M: Mailer,
    {
        let CourierConfig {
            secret,
            session,
            notices,
            dispatch,
            sweep_interval,
        } = self.config;

        let issuer = Arc::new(SessionIssuer::new(&secret, &session)?);
        let credentials = Arc::new(CredentialStore::new(&session));
        let identities = Arc::new(identities);
        let mailer = Arc::new(mailer);

        let auth = Arc::new(AuthFlow::new(
            Arc::clone(&credentials),
            Arc::clone(&issuer),
            Arc::clone(&identities),
            Arc::clone(&mailer),
            notices,
        ));
        let gate = Arc::new(OwnershipGate::new(issuer, identities));
        let dispatcher = Arc::new(Dispatcher::new(mailer, dispatch));
        let groups = Arc::new(GroupService::new(
            Arc::clone(&gate),
            Arc::new(groups),
            Arc::new(content),
            dispatcher,
        ));

        let sweeper = spawn_sweeper(Arc::clone(&credentials), sweep_interval);
        tracing::info!(?sweep_interval, "courier service ready");

        Ok(Courier {
            handler: RequestHandler::new(auth, gate, groups),
            credentials,
            sweeper,
        })
    }
}

/// A running Courier service.
///
/// Dropping it stops the background sweeper.
pub struct Courier<S, G, C, M> {
    handler: RequestHandler<S, G, C, M>,
    credentials: Arc<CredentialStore>,
    sweeper: JoinHandle<()>,
}

impl Courier<(), (), (), ()> {
    /// Creates a new builder.
    pub fn builder(config: CourierConfig) -> CourierBuilder {
        CourierBuilder::new(config)
    }
}

impl<S, G, C, M> Courier<S, G, C, M>
where
    S: IdentityStore,
    G: GroupStore,
    C: ContentResolver,
    M: Mailer,
{
    /// Handles one request envelope.
    pub async fn handle(&self, envelope: Envelope) -> Response {
        self.handler.handle(envelope).await
    }

    /// Handles one JSON-encoded request envelope.
    pub async fn handle_bytes(&self, data: &[u8]) -> Vec<u8> {
        self.handler.handle_bytes(data).await
    }

    pub fn handler(&self) -> &RequestHandler<S, G, C, M> {
        &self.handler
    }

    /// The store holding pending registrations and login codes.
    pub fn credentials(&self) -> &Arc<CredentialStore> {
        &self.credentials
    }
}

impl<S, G, C, M> Drop for Courier<S, G, C, M> {
    fn drop(&mut self) {
        self.sweeper.abort();
    }
}
