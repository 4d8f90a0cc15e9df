//! Async glue between the editor state machine and its collaborators.
//!
//! The driver owns the editor and serializes every session-mutating
//! event through `&mut self`: one event, including its reconciler call,
//! runs to completion before the next is accepted. Save submissions are
//! spawned fire-and-forget; their outcome reaches the opener on a
//! channel, never through the editor.

use std::sync::Arc;

use shared::domain::GroupId;
use tokio::sync::mpsc;
use tracing::{error, warn};

use crate::editor::{CloseOutcome, Effect, GroupEditor};
use crate::save::SaveRequestError;
use crate::{AccountCapabilities, ContactLookup, MembersSource, MetadataSource, SaveService};

/// Host-facing notifications produced while pumping effects.
#[derive(Debug, Clone, PartialEq)]
pub enum DriverNotice {
    /// Show the account picker and feed the choice back via
    /// [`GroupEditor::account_chosen`].
    PromptAccountSelection,
    /// Ask the user to confirm discarding unsaved changes and feed a yes
    /// back via [`GroupEditor::confirm_revert`].
    ConfirmDiscard,
    Closed(CloseOutcome),
}

/// Out-of-band result of a dispatched save.
#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome {
    pub result: Result<GroupId, String>,
}

pub struct EditorDriver {
    editor: GroupEditor,
    metadata: Arc<dyn MetadataSource>,
    members: Arc<dyn MembersSource>,
    contacts: Arc<dyn ContactLookup>,
    saves: Arc<dyn SaveService>,
    capabilities: Arc<dyn AccountCapabilities>,
    save_outcomes: mpsc::UnboundedSender<SaveOutcome>,
}

impl EditorDriver {
    pub fn new(
        editor: GroupEditor,
        metadata: Arc<dyn MetadataSource>,
        members: Arc<dyn MembersSource>,
        contacts: Arc<dyn ContactLookup>,
        saves: Arc<dyn SaveService>,
        capabilities: Arc<dyn AccountCapabilities>,
    ) -> (Self, mpsc::UnboundedReceiver<SaveOutcome>) {
        let (save_outcomes, outcome_rx) = mpsc::unbounded_channel();
        (
            Self {
                editor,
                metadata,
                members,
                contacts,
                saves,
                capabilities,
                save_outcomes,
            },
            outcome_rx,
        )
    }

    pub fn editor(&self) -> &GroupEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut GroupEditor {
        &mut self.editor
    }

    /// "Done" tapped: commit when the owning account allows membership
    /// edits, otherwise just revert.
    pub async fn done_clicked(&mut self) -> Result<Vec<DriverNotice>, SaveRequestError> {
        let editable = self
            .editor
            .session()
            .account
            .as_ref()
            .is_some_and(|account| self.capabilities.is_membership_editable(account));
        if editable {
            self.editor.request_commit()?;
        } else {
            self.editor.confirm_revert();
        }
        Ok(self.pump().await)
    }

    /// Drains and performs pending effects until the editor asks for
    /// nothing more, returning whatever needs the host's attention.
    pub async fn pump(&mut self) -> Vec<DriverNotice> {
        let mut notices = Vec::new();
        loop {
            let effects = self.editor.take_effects();
            if effects.is_empty() {
                break;
            }
            for effect in effects {
                self.perform(effect, &mut notices).await;
            }
        }
        notices
    }

    async fn perform(&mut self, effect: Effect, notices: &mut Vec<DriverNotice>) {
        match effect {
            Effect::FetchMetadata { group } => {
                match self.metadata.fetch_group_metadata(group).await {
                    Ok(metadata) => self.editor.metadata_loaded(metadata),
                    Err(err) => {
                        error!(group = group.0, %err, "group metadata fetch failed");
                        self.editor.metadata_loaded(None);
                    }
                }
            }
            Effect::FetchMembers { group, ticket } => {
                match self.members.fetch_existing_members(group).await {
                    Ok(members) => self.editor.members_loaded(ticket, members),
                    Err(err) => {
                        // The roster stays local-only; staged adds remain
                        // visible and nothing can be removed.
                        warn!(group = group.0, %err, "existing members fetch failed");
                    }
                }
            }
            Effect::ResolveContact {
                raw_member_id,
                person,
                ticket,
            } => match self.contacts.resolve_contact(raw_member_id, person).await {
                Ok(found) => self.editor.contact_resolved(ticket, found),
                Err(err) => {
                    warn!(raw_member = raw_member_id.0, %err, "contact lookup failed");
                    self.editor.contact_resolved(ticket, None);
                }
            },
            Effect::DispatchSave(request) => {
                let saves = Arc::clone(&self.saves);
                let outcomes = self.save_outcomes.clone();
                tokio::spawn(async move {
                    let result = saves
                        .submit(request)
                        .await
                        .map_err(|err| err.to_string());
                    if let Err(ref reason) = result {
                        error!(%reason, "save submission failed");
                    }
                    let _ = outcomes.send(SaveOutcome { result });
                });
                self.editor.save_dispatched();
            }
            Effect::PromptAccountSelection => notices.push(DriverNotice::PromptAccountSelection),
            Effect::ConfirmDiscard => notices.push(DriverNotice::ConfirmDiscard),
            Effect::Closed(outcome) => notices.push(DriverNotice::Closed(outcome)),
        }
    }
}

#[cfg(test)]
#[path = "tests/driver_tests.rs"]
mod tests;
