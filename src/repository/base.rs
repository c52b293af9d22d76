//! Repository identity and provisioning lifecycle.

use std::sync::Arc;

use log::{debug, info, warn};
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;

use super::error::{RepositoryError, RepositoryResult};
use crate::store::{CollectionLink, DocumentStore, RequestOptions, StoreError};

/// Observable provisioning state of a repository instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProvisioningState {
    /// No provisioning attempt has run to completion.
    Uninitialized,
    /// A provisioning sequence is in flight.
    Provisioning,
    /// Database and collection exist; provisioning will not run again.
    Ready,
    /// Provisioning failed. Terminal for this instance.
    Failed,
}

enum Phase {
    Idle,
    Running,
    Ready,
    Failed(StoreError),
}

/// Shared core of every repository: identifiers, client handle, request
/// options and the lazy provisioning handle.
///
/// Construction performs no I/O. The backing database and collection are
/// created by [`RepositoryBase::ready`], which callers await explicitly:
///
/// ```ignore
/// let repository = CrudRepository::<Order>::new("shop", "orders", store, None);
/// repository.ready(&cancel).await?;
/// ```
///
/// Data operations do not wait for provisioning. Operating before `ready`
/// has completed is possible and occasionally useful, but its correctness
/// then rests entirely on the store's idempotent create-if-absent behavior.
pub struct RepositoryBase {
    database_id: String,
    collection_id: String,
    link: CollectionLink,
    client: Arc<dyn DocumentStore>,
    options: Option<RequestOptions>,
    phase: RwLock<Phase>,
    // Serializes provisioning so concurrent ready() calls coalesce into one
    // create sequence.
    provision_gate: tokio::sync::Mutex<()>,
}

impl RepositoryBase {
    /// Create a repository core over a database/collection pair.
    ///
    /// # Arguments
    /// * `database_id` - Logical database name, immutable afterwards
    /// * `collection_id` - Collection name, immutable afterwards
    /// * `client` - Store client, shared with other repositories
    /// * `options` - Per-request tuning applied to every operation
    pub fn new(
        database_id: impl Into<String>,
        collection_id: impl Into<String>,
        client: Arc<dyn DocumentStore>,
        options: Option<RequestOptions>,
    ) -> Self {
        let database_id = database_id.into();
        let collection_id = collection_id.into();
        let link = CollectionLink::new(database_id.clone(), collection_id.clone());
        Self {
            database_id,
            collection_id,
            link,
            client,
            options,
            phase: RwLock::new(Phase::Idle),
            provision_gate: tokio::sync::Mutex::new(()),
        }
    }

    pub fn database_id(&self) -> &str {
        &self.database_id
    }

    pub fn collection_id(&self) -> &str {
        &self.collection_id
    }

    /// The injected store client.
    pub fn client(&self) -> &Arc<dyn DocumentStore> {
        &self.client
    }

    /// Request options applied to every operation of this repository.
    pub fn request_options(&self) -> Option<&RequestOptions> {
        self.options.as_ref()
    }

    pub(crate) fn collection_link(&self) -> &CollectionLink {
        &self.link
    }

    /// Current provisioning state.
    pub fn provisioning_state(&self) -> ProvisioningState {
        match &*self.phase.read() {
            Phase::Idle => ProvisioningState::Uninitialized,
            Phase::Running => ProvisioningState::Provisioning,
            Phase::Ready => ProvisioningState::Ready,
            Phase::Failed(_) => ProvisioningState::Failed,
        }
    }

    /// Ensure the backing database and collection exist.
    ///
    /// Two phases, strictly ordered: the database is created if absent, and
    /// only after that succeeds is the collection created if absent. Both
    /// creates converge on existing resources, so any number of repositories
    /// may provision the same pair concurrently.
    ///
    /// The outcome is memoized per instance. After success further calls
    /// return immediately; after a store fault the instance is terminally
    /// failed and every later call returns the same
    /// [`RepositoryError::ProvisioningFailed`] without contacting the store.
    /// Cancellation is not a failure: it rolls the state back to
    /// [`ProvisioningState::Uninitialized`] and a later call may retry.
    pub async fn ready(&self, cancel: &CancellationToken) -> RepositoryResult<()> {
        if let Some(settled) = self.settled_outcome() {
            return settled;
        }
        if cancel.is_cancelled() {
            return Err(RepositoryError::Cancelled);
        }

        let _gate = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(RepositoryError::Cancelled),
            guard = self.provision_gate.lock() => guard,
        };
        // A concurrent caller may have settled the outcome while this one
        // waited for the gate.
        if let Some(settled) = self.settled_outcome() {
            return settled;
        }

        *self.phase.write() = Phase::Running;
        debug!("provisioning database 'dbs/{}'", self.database_id);
        let database = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                *self.phase.write() = Phase::Idle;
                return Err(RepositoryError::Cancelled);
            }
            outcome = self
                .client
                .create_database_if_absent(&self.database_id, self.options.as_ref()) => outcome,
        };
        if let Err(source) = database {
            warn!(
                "database provisioning failed for 'dbs/{}': {}",
                self.database_id, source
            );
            *self.phase.write() = Phase::Failed(source.clone());
            return Err(self.provisioning_failure(source));
        }

        // The collection call is issued only once the database exists.
        debug!("provisioning collection '{}'", self.link.path());
        let collection = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                *self.phase.write() = Phase::Idle;
                return Err(RepositoryError::Cancelled);
            }
            outcome = self
                .client
                .create_collection_if_absent(&self.link, None, self.options.as_ref()) => outcome,
        };
        match collection {
            Ok(_) => {
                info!("collection '{}' ready", self.link.path());
                *self.phase.write() = Phase::Ready;
                Ok(())
            }
            Err(source) => {
                warn!(
                    "collection provisioning failed for '{}': {}",
                    self.link.path(),
                    source
                );
                *self.phase.write() = Phase::Failed(source.clone());
                Err(self.provisioning_failure(source))
            }
        }
    }

    /// The memoized outcome, if provisioning already settled.
    fn settled_outcome(&self) -> Option<RepositoryResult<()>> {
        match &*self.phase.read() {
            Phase::Ready => Some(Ok(())),
            Phase::Failed(source) => Some(Err(self.provisioning_failure(source.clone()))),
            _ => None,
        }
    }

    fn provisioning_failure(&self, source: StoreError) -> RepositoryError {
        RepositoryError::ProvisioningFailed {
            database: self.database_id.clone(),
            collection: self.collection_id.clone(),
            source,
        }
    }
}
