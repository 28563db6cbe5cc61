//! Group management: create, list, edit, delete, execute.
//!
//! Every operation but `create` loads the group first and runs the
//! ownership check against its recorded owner before touching it.
//! `create` only needs a valid credential, since it is what establishes
//! ownership.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use courier_dispatch::{DispatchReport, Dispatcher};
use courier_protocol::{Group, GroupId, GroupPatch, NewGroup, StorageError, UserId};
use courier_session::{IdentityStore, OwnershipGate, check_owner, generate_token};
use courier_transport::Mailer;
use parking_lot::RwLock;

use crate::{BodySource, ContentResolver, CourierError, CsvSource, GroupError};

// ---------------------------------------------------------------------------
// Storage
// ---------------------------------------------------------------------------

/// Durable group storage.
pub trait GroupStore: Send + Sync + 'static {
    /// Persists a new group. [`StorageError::Conflict`] if the id is taken.
    fn create(&self, group: Group) -> impl Future<Output = Result<(), StorageError>> + Send;

    fn find(
        &self,
        id: &GroupId,
    ) -> impl Future<Output = Result<Option<Group>, StorageError>> + Send;

    /// Every group owned by `owner`, oldest first.
    fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> impl Future<Output = Result<Vec<Group>, StorageError>> + Send;

    /// Replaces the stored group with the same id.
    /// [`StorageError::NotFound`] if there is none.
    fn update(&self, group: Group) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// [`StorageError::NotFound`] if there is no such group.
    fn delete(&self, id: &GroupId) -> impl Future<Output = Result<(), StorageError>> + Send;
}

impl<G: GroupStore> GroupStore for Arc<G> {
    fn create(&self, group: Group) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).create(group)
    }

    fn find(
        &self,
        id: &GroupId,
    ) -> impl Future<Output = Result<Option<Group>, StorageError>> + Send {
        (**self).find(id)
    }

    fn list_by_owner(
        &self,
        owner: &UserId,
    ) -> impl Future<Output = Result<Vec<Group>, StorageError>> + Send {
        (**self).list_by_owner(owner)
    }

    fn update(&self, group: Group) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).update(group)
    }

    fn delete(&self, id: &GroupId) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).delete(id)
    }
}

/// In-memory [`GroupStore`], kept in creation order.
#[derive(Debug, Default)]
pub struct MemoryGroupStore {
    groups: RwLock<Vec<Group>>,
}

impl MemoryGroupStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.groups.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.read().is_empty()
    }
}

impl GroupStore for MemoryGroupStore {
    async fn create(&self, group: Group) -> Result<(), StorageError> {
        let mut groups = self.groups.write();
        if groups.iter().any(|g| g.id == group.id) {
            return Err(StorageError::Conflict(format!("group {} already exists", group.id)));
        }
        groups.push(group);
        Ok(())
    }

    async fn find(&self, id: &GroupId) -> Result<Option<Group>, StorageError> {
        Ok(self.groups.read().iter().find(|g| &g.id == id).cloned())
    }

    async fn list_by_owner(&self, owner: &UserId) -> Result<Vec<Group>, StorageError> {
        Ok(self
            .groups
            .read()
            .iter()
            .filter(|g| &g.owner == owner)
            .cloned()
            .collect())
    }

    async fn update(&self, group: Group) -> Result<(), StorageError> {
        let mut groups = self.groups.write();
        let slot = groups
            .iter_mut()
            .find(|g| g.id == group.id)
            .ok_or_else(|| StorageError::NotFound(format!("group {}", group.id)))?;
        *slot = group;
        Ok(())
    }

    async fn delete(&self, id: &GroupId) -> Result<(), StorageError> {
        let mut groups = self.groups.write();
        let before = groups.len();
        groups.retain(|g| &g.id != id);
        if groups.len() == before {
            return Err(StorageError::NotFound(format!("group {id}")));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Drafts
// ---------------------------------------------------------------------------

/// A validated [`NewGroup`] whose sources have not been resolved yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDraft {
    pub name: String,
    pub subject: String,
    pub recipients: Vec<String>,
    pub csv: Option<CsvSource>,
    pub body: BodySource,
}

fn filled(field: &Option<String>) -> Option<&str> {
    field.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl GroupDraft {
    /// Checks the creation rules.
    ///
    /// Name and subject must be non-blank. Exactly one of `message`,
    /// `html_path`, `html_link` supplies the body. At most one of
    /// `csv_file_path`, `csv_link` supplies extra recipients, and there
    /// must be at least one recipient source overall.
    pub fn validate(new: NewGroup) -> Result<Self, GroupError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(GroupError::InvalidDraft("name is required".into()));
        }
        let subject = new.subject.trim();
        if subject.is_empty() {
            return Err(GroupError::InvalidDraft("subject is required".into()));
        }

        let body = match (
            filled(&new.message),
            filled(&new.html_path),
            filled(&new.html_link),
        ) {
            (Some(_), None, None) => BodySource::Text(new.message.clone().unwrap_or_default()),
            (None, Some(path), None) => BodySource::File(PathBuf::from(path)),
            (None, None, Some(link)) => BodySource::Link(link.to_string()),
            (None, None, None) => {
                return Err(GroupError::InvalidDraft(
                    "one of message, html_path or html_link is required".into(),
                ));
            }
            _ => {
                return Err(GroupError::InvalidDraft(
                    "only one of message, html_path or html_link may be given".into(),
                ));
            }
        };

        let csv = match (filled(&new.csv_file_path), filled(&new.csv_link)) {
            (Some(_), Some(_)) => {
                return Err(GroupError::InvalidDraft(
                    "only one of csv_file_path or csv_link may be given".into(),
                ));
            }
            (Some(path), None) => Some(CsvSource::File(PathBuf::from(path))),
            (None, Some(link)) => Some(CsvSource::Link(link.to_string())),
            (None, None) => None,
        };

        if new.recipients.is_empty() && csv.is_none() {
            return Err(GroupError::InvalidDraft(
                "recipients or a CSV source is required".into(),
            ));
        }

        Ok(Self {
            name: name.to_string(),
            subject: subject.to_string(),
            recipients: new.recipients,
            csv,
            body,
        })
    }
}

fn check_patch(patch: &GroupPatch) -> Result<(), GroupError> {
    let blank = |field: &Option<String>| field.as_deref().is_some_and(|s| s.trim().is_empty());
    if blank(&patch.name) {
        return Err(GroupError::InvalidDraft("name must not be blank".into()));
    }
    if blank(&patch.subject) {
        return Err(GroupError::InvalidDraft("subject must not be blank".into()));
    }
    Ok(())
}

/// A fresh group id: `g-` and 32 hex characters.
pub fn new_group_id() -> GroupId {
    GroupId(format!("g-{}", generate_token()))
}

// ---------------------------------------------------------------------------
// Service
// ---------------------------------------------------------------------------

/// Group operations behind the ownership gate.
pub struct GroupService<S, G, C, M> {
    gate: Arc<OwnershipGate<S>>,
    groups: Arc<G>,
    content: Arc<C>,
    dispatcher: Arc<Dispatcher<M>>,
}

impl<S, G, C, M> GroupService<S, G, C, M>
where
    S: IdentityStore,
    G: GroupStore,
    C: ContentResolver,
    M: Mailer,
{
    pub fn new(
        gate: Arc<OwnershipGate<S>>,
        groups: Arc<G>,
        content: Arc<C>,
        dispatcher: Arc<Dispatcher<M>>,
    ) -> Self {
        Self {
            gate,
            groups,
            content,
            dispatcher,
        }
    }

    /// Creates a group owned by the caller.
    pub async fn create(
        &self,
        credential: Option<&str>,
        new: NewGroup,
    ) -> Result<Group, CourierError> {
        let owner = self.gate.resolve(credential).await?;
        let draft = GroupDraft::validate(new)?;

        let mut recipients = draft.recipients;
        if let Some(csv) = &draft.csv {
            recipients.extend(self.content.recipients(csv).await?);
        }
        let body = self.content.body(&draft.body).await?;

        let group = Group {
            id: new_group_id(),
            name: draft.name,
            owner: owner.id,
            recipients,
            subject: draft.subject,
            body,
        };
        self.groups.create(group.clone()).await?;

        tracing::info!(group_id = %group.id, owner = %group.owner, "group created");
        Ok(group)
    }

    /// Every group the caller owns.
    pub async fn list(&self, credential: Option<&str>) -> Result<Vec<Group>, CourierError> {
        let caller = self.gate.resolve(credential).await?;
        Ok(self.groups.list_by_owner(&caller.id).await?)
    }

    /// Applies `patch` to a group the caller owns and returns the result.
    pub async fn edit(
        &self,
        credential: Option<&str>,
        patch: GroupPatch,
    ) -> Result<Group, CourierError> {
        let mut group = self.owned(credential, &patch.group_id).await?;
        check_patch(&patch)?;

        patch.apply(&mut group);
        self.groups.update(group.clone()).await?;

        tracing::info!(group_id = %group.id, "group updated");
        Ok(group)
    }

    /// Deletes a group the caller owns.
    pub async fn delete(&self, credential: Option<&str>, id: &GroupId) -> Result<(), CourierError> {
        let group = self.owned(credential, id).await?;
        self.groups.delete(&group.id).await?;
        tracing::info!(group_id = %group.id, "group deleted");
        Ok(())
    }

    /// Sends a group's message to all of its recipients.
    pub async fn execute(
        &self,
        credential: Option<&str>,
        id: &GroupId,
    ) -> Result<DispatchReport, CourierError> {
        let group = self.owned(credential, id).await?;
        tracing::info!(group_id = %group.id, recipients = group.recipients.len(), "executing group");
        let report = self
            .dispatcher
            .dispatch(&group.subject, &group.body, &group.recipients)
            .await?;
        Ok(report)
    }

    /// Resolves the caller, loads the group, and checks ownership.
    async fn owned(&self, credential: Option<&str>, id: &GroupId) -> Result<Group, CourierError> {
        let caller = self.gate.resolve(credential).await?;
        let group = self.groups.find(id).await?.ok_or(GroupError::NotFound)?;
        check_owner(&caller, &group.owner)?;
        Ok(group)
    }
}
