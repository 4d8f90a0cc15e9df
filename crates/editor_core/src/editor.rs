//! The group-membership edit state machine.
//!
//! Owns the session exclusively. Every operation is a single discrete
//! event that runs to completion, including its reconciler call, before
//! the next is accepted; asynchronous work is requested through
//! [`Effect`]s and fed back in as events. Results of loads that were
//! superseded, or that arrive after the session has left EDITING, are
//! dropped.

use chrono::Utc;
use shared::domain::{AccountIdentity, GroupId, GroupMetadata, Member, PersonRef, RawMemberId};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::reconcile::reconcile;
use crate::save::{self, MutationRequest, SaveRequestError};
use crate::session::{EditorSession, SessionSnapshot, Status};

/// Identifies one issued asynchronous load. A result is applied only if
/// its ticket is still the current one; superseding or leaving EDITING
/// invalidates outstanding tickets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoadTicket(u64);

/// Work the host must perform on the editor's behalf.
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    FetchMetadata {
        group: GroupId,
    },
    FetchMembers {
        group: GroupId,
        ticket: LoadTicket,
    },
    ResolveContact {
        raw_member_id: RawMemberId,
        person: PersonRef,
        ticket: LoadTicket,
    },
    /// Ask the user to pick an owning account (CREATE with several
    /// writable accounts).
    PromptAccountSelection,
    /// Ask the user to confirm discarding unsaved changes.
    ConfirmDiscard,
    DispatchSave(MutationRequest),
    Closed(CloseOutcome),
}

/// How the session ended, reported exactly once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// CREATE path with zero writable accounts. Fatal.
    AccountsNotFound,
    /// EDIT path whose group is gone server-side. Fatal.
    GroupNotFound,
    SelectionCancelled,
    Reverted,
    /// Commit with nothing to save: success, nothing dispatched. Carries
    /// the original group reference (absent on the CREATE path).
    SavedNoChanges { group: Option<GroupId> },
    /// The mutation request was handed to the save service; its durable
    /// outcome is reported out of band.
    SaveDispatched,
}

pub struct GroupEditor {
    editor_id: Uuid,
    session: EditorSession,
    status: Status,
    original_name: String,
    name_input: String,
    name_read_only: bool,
    members_ticket: u64,
    lookup_ticket: u64,
    outcome: Option<CloseOutcome>,
    effects: Vec<Effect>,
}

impl GroupEditor {
    /// Opens a create session. With no supplied account, a single
    /// writable account is auto-selected; several prompt the user; none
    /// is fatal.
    pub fn create(
        supplied_account: Option<AccountIdentity>,
        writable_accounts: &[AccountIdentity],
    ) -> Self {
        let mut editor = Self::with_session(EditorSession::new_create(), Status::Editing);
        match supplied_account {
            Some(account) => {
                editor.session.account = Some(account);
            }
            None => match writable_accounts {
                [] => {
                    warn!(editor = %editor.editor_id, "no writable accounts; session is fatal");
                    editor.close(CloseOutcome::AccountsNotFound);
                }
                [only] => {
                    editor.session.account = Some(only.clone());
                }
                _ => {
                    editor.status = Status::SelectingAccount;
                    editor.effects.push(Effect::PromptAccountSelection);
                }
            },
        }
        editor
    }

    /// Opens an edit session for an existing group and requests its
    /// metadata. Existing members are fetched only once the metadata
    /// confirms the group still exists.
    pub fn edit(group: GroupId) -> Self {
        let mut editor = Self::with_session(EditorSession::new_edit(group), Status::Loading);
        editor.effects.push(Effect::FetchMetadata { group });
        editor
    }

    fn with_session(session: EditorSession, status: Status) -> Self {
        let editor_id = Uuid::new_v4();
        debug!(editor = %editor_id, action = ?session.action, "opening editor session");
        Self {
            editor_id,
            session,
            status,
            original_name: String::new(),
            name_input: String::new(),
            name_read_only: false,
            members_ticket: 0,
            lookup_ticket: 0,
            outcome: None,
            effects: Vec::new(),
        }
    }

    /// Restores a session from a persisted snapshot. A LOADING session
    /// re-issues its metadata fetch; an EDITING session rebuilds its
    /// roster from the persisted lists without fetching; a session
    /// interrupted at SAVING or later is already concluded.
    pub fn resume(snapshot: SessionSnapshot) -> Self {
        let mut editor = Self {
            editor_id: snapshot.editor_id,
            session: snapshot.session,
            status: snapshot.status,
            original_name: snapshot.original_name,
            name_input: snapshot.name_input,
            name_read_only: snapshot.name_read_only,
            members_ticket: 0,
            lookup_ticket: 0,
            outcome: None,
            effects: Vec::new(),
        };
        debug!(editor = %editor.editor_id, status = ?editor.status, "resuming editor session");
        match editor.status {
            Status::SelectingAccount => editor.effects.push(Effect::PromptAccountSelection),
            Status::Loading => match editor.session.group {
                Some(group) => editor.effects.push(Effect::FetchMetadata { group }),
                None => editor.close(CloseOutcome::GroupNotFound),
            },
            Status::Editing => editor.refresh_display(),
            Status::Saving | Status::Closing => editor.status = Status::Closing,
        }
        editor
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            editor_id: self.editor_id,
            session: self.session.clone(),
            status: self.status,
            original_name: self.original_name.clone(),
            name_input: self.name_input.clone(),
            name_read_only: self.name_read_only,
            saved_at: Utc::now(),
        }
    }

    pub fn editor_id(&self) -> Uuid {
        self.editor_id
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn display(&self) -> &[Member] {
        &self.session.display
    }

    /// Contact ids currently displayed, for hosts that exclude them from
    /// their suggestion lists.
    pub fn displayed_contact_ids(&self) -> Vec<shared::domain::ContactId> {
        self.session.display.iter().map(|m| m.contact_id).collect()
    }

    pub fn name_input(&self) -> &str {
        &self.name_input
    }

    pub fn name_read_only(&self) -> bool {
        self.name_read_only
    }

    pub fn outcome(&self) -> Option<CloseOutcome> {
        self.outcome
    }

    /// Drains the pending effects. The host performs them in order.
    pub fn take_effects(&mut self) -> Vec<Effect> {
        std::mem::take(&mut self.effects)
    }

    pub fn has_valid_name(&self) -> bool {
        !self.name_input.is_empty()
    }

    /// True iff the name input differs from the name loaded at session
    /// start (for CREATE: iff a non-empty name was entered).
    pub fn has_name_change(&self) -> bool {
        self.name_input != self.original_name
    }

    pub fn has_membership_change(&self) -> bool {
        self.session.has_membership_change()
    }

    pub fn account_chosen(&mut self, account: AccountIdentity) {
        if self.status != Status::SelectingAccount {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring account choice");
            return;
        }
        self.session.account = Some(account);
        self.status = Status::Editing;
    }

    pub fn selection_cancelled(&mut self) {
        if self.status != Status::SelectingAccount {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring selection cancel");
            return;
        }
        self.close(CloseOutcome::SelectionCancelled);
    }

    /// Applies the metadata fetch result. An absent group is fatal.
    pub fn metadata_loaded(&mut self, metadata: Option<GroupMetadata>) {
        if self.status != Status::Loading {
            debug!(editor = %self.editor_id, status = ?self.status, "dropping metadata result");
            return;
        }
        let Some(metadata) = metadata else {
            warn!(editor = %self.editor_id, group = ?self.session.group, "group not found");
            self.close(CloseOutcome::GroupNotFound);
            return;
        };
        self.original_name = metadata.name.clone();
        self.name_input = metadata.name;
        self.name_read_only = metadata.read_only;
        self.session.account = Some(metadata.account);
        self.status = Status::Editing;
        self.request_members_load();
    }

    fn request_members_load(&mut self) {
        // Edit sessions always carry a group reference.
        let Some(group) = self.session.group else {
            return;
        };
        self.members_ticket += 1;
        self.effects.push(Effect::FetchMembers {
            group,
            ticket: LoadTicket(self.members_ticket),
        });
    }

    /// Applies an existing-members result against the CURRENT pending
    /// lists. Stale tickets and results arriving after EDITING ended are
    /// dropped.
    pub fn members_loaded(&mut self, ticket: LoadTicket, members: Vec<Member>) {
        if self.status != Status::Editing || ticket.0 != self.members_ticket {
            debug!(editor = %self.editor_id, ?ticket, status = ?self.status,
                "dropping stale existing-members result");
            return;
        }
        self.session.existing = Some(members);
        self.refresh_display();
    }

    pub fn set_name(&mut self, name: impl Into<String>) {
        if self.status != Status::Editing || self.name_read_only {
            debug!(editor = %self.editor_id, "ignoring name edit");
            return;
        }
        self.name_input = name.into();
    }

    /// Stages an addition. Duplicates are silently ignored; a pending
    /// removal of the same member is undone instead.
    pub fn add_member(&mut self, member: Member) {
        if self.status != Status::Editing {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring add");
            return;
        }
        if self.session.stage_add(member) {
            self.refresh_display();
        }
    }

    /// Stages a removal, or unstages a pending addition. Removing a
    /// member the session has never seen is silently ignored.
    pub fn remove_member(&mut self, member: &Member) {
        if self.status != Status::Editing {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring remove");
            return;
        }
        if self.session.stage_remove(member) {
            self.refresh_display();
        }
    }

    /// Starts a contact lookup for a picked suggestion, superseding any
    /// lookup still in flight.
    pub fn pick_suggestion(&mut self, raw_member_id: RawMemberId, person: PersonRef) {
        if self.status != Status::Editing {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring suggestion pick");
            return;
        }
        self.lookup_ticket += 1;
        self.effects.push(Effect::ResolveContact {
            raw_member_id,
            person,
            ticket: LoadTicket(self.lookup_ticket),
        });
    }

    pub fn contact_resolved(&mut self, ticket: LoadTicket, member: Option<Member>) {
        if self.status != Status::Editing || ticket.0 != self.lookup_ticket {
            debug!(editor = %self.editor_id, ?ticket, "dropping superseded contact lookup");
            return;
        }
        match member {
            Some(member) => self.add_member(member),
            None => debug!(editor = %self.editor_id, "picked contact no longer resolvable"),
        }
    }

    /// Commits the session. An invalid name or a non-EDITING status
    /// closes without saving, like a revert. With no changes at all the
    /// session closes as a no-op success carrying the original group
    /// reference. Otherwise the mutation request is built and dispatched
    /// and the save completes fire-and-forget.
    pub fn request_commit(&mut self) -> Result<(), SaveRequestError> {
        if self.status != Status::Editing || !self.has_valid_name() {
            debug!(editor = %self.editor_id, status = ?self.status, "commit rejected");
            self.invalidate_loads();
            self.close(CloseOutcome::Reverted);
            return Ok(());
        }
        // The roster is frozen from here; late load results must not
        // mutate a session on its way out.
        self.invalidate_loads();
        if !self.has_name_change() && !self.has_membership_change() {
            let group = self.session.group;
            info!(editor = %self.editor_id, ?group, "nothing to save");
            self.close(CloseOutcome::SavedNoChanges { group });
            return Ok(());
        }
        let request = save::build_request(&self.session, &self.name_input, &self.original_name)?;
        self.status = Status::Saving;
        info!(editor = %self.editor_id, "dispatching mutation request");
        self.effects.push(Effect::DispatchSave(request));
        Ok(())
    }

    /// Called once the request has been handed to the save service.
    pub fn save_dispatched(&mut self) {
        if self.status != Status::Saving {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring save handoff");
            return;
        }
        self.close(CloseOutcome::SaveDispatched);
    }

    /// Discards the session. With unsaved changes the host must confirm
    /// first via [`Effect::ConfirmDiscard`].
    pub fn request_revert(&mut self) {
        if self.status != Status::Editing {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring revert");
            return;
        }
        if self.has_name_change() || self.has_membership_change() {
            self.effects.push(Effect::ConfirmDiscard);
        } else {
            self.invalidate_loads();
            self.close(CloseOutcome::Reverted);
        }
    }

    pub fn confirm_revert(&mut self) {
        if self.status != Status::Editing {
            debug!(editor = %self.editor_id, status = ?self.status, "ignoring revert confirm");
            return;
        }
        self.invalidate_loads();
        self.close(CloseOutcome::Reverted);
    }

    fn refresh_display(&mut self) {
        self.session.display = reconcile(
            self.session.existing.as_deref(),
            &self.session.pending_adds,
            &self.session.pending_removes,
        );
    }

    fn invalidate_loads(&mut self) {
        self.members_ticket += 1;
        self.lookup_ticket += 1;
    }

    fn close(&mut self, outcome: CloseOutcome) {
        info!(editor = %self.editor_id, ?outcome, "editor closing");
        self.status = Status::Closing;
        self.outcome = Some(outcome);
        self.effects.push(Effect::Closed(outcome));
    }
}

#[cfg(test)]
#[path = "tests/editor_tests.rs"]
mod tests;
