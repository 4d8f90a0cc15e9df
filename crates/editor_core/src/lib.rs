//! Core of the group roster editor: the edit state machine, the
//! reconciler that merges server data with staged edits, the save
//! coordinator, and the narrow async contracts of its collaborators.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::domain::{AccountIdentity, GroupId, GroupMetadata, Member, PersonRef, RawMemberId};

pub mod driver;
pub mod editor;
pub mod reconcile;
pub mod save;
pub mod session;

pub use driver::{DriverNotice, EditorDriver, SaveOutcome};
pub use editor::{CloseOutcome, Effect, GroupEditor, LoadTicket};
pub use save::{build_request, MutationRequest, SaveRequestError};
pub use session::{EditorAction, EditorSession, SessionSnapshot, Status};

/// Supplies group metadata. `Ok(None)` means the group is gone, which is
/// fatal for an edit session.
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_group_metadata(&self, group: GroupId) -> Result<Option<GroupMetadata>>;
}

/// Supplies the authoritative member rows of a group. An empty list is a
/// valid roster, distinct from not-yet-loaded.
#[async_trait]
pub trait MembersSource: Send + Sync {
    async fn fetch_existing_members(&self, group: GroupId) -> Result<Vec<Member>>;
}

/// Resolves a picked suggestion into a full member record.
#[async_trait]
pub trait ContactLookup: Send + Sync {
    async fn resolve_contact(
        &self,
        raw_member_id: RawMemberId,
        person: PersonRef,
    ) -> Result<Option<Member>>;
}

/// Durably applies a mutation request and reports the resulting group.
/// The editor never awaits this; the outcome reaches the caller out of
/// band.
#[async_trait]
pub trait SaveService: Send + Sync {
    async fn submit(&self, request: MutationRequest) -> Result<GroupId>;
}

/// Accounts a new group may be created under.
pub trait AccountsProvider: Send + Sync {
    fn writable_accounts(&self) -> Vec<AccountIdentity>;
}

/// Whether an account type allows its group rosters to be edited.
pub trait AccountCapabilities: Send + Sync {
    fn is_membership_editable(&self, account: &AccountIdentity) -> bool;
}

pub struct MissingContactLookup;

#[async_trait]
impl ContactLookup for MissingContactLookup {
    async fn resolve_contact(
        &self,
        raw_member_id: RawMemberId,
        _person: PersonRef,
    ) -> Result<Option<Member>> {
        Err(anyhow!(
            "contact lookup unavailable for raw member {}",
            raw_member_id.0
        ))
    }
}

pub struct MissingSaveService;

#[async_trait]
impl SaveService for MissingSaveService {
    async fn submit(&self, _request: MutationRequest) -> Result<GroupId> {
        Err(anyhow!("save service unavailable"))
    }
}
