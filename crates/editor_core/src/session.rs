//! Editor session state and its serializable snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use shared::domain::{AccountIdentity, GroupId, Member};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorAction {
    Create,
    Edit,
}

/// Lifecycle status of the editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Waiting for the user to pick an owning account.
    SelectingAccount,
    /// Group metadata fetch is in flight.
    Loading,
    /// Ready for user input.
    Editing,
    /// Commit in progress; the mutation request is being dispatched.
    Saving,
    /// Terminal. No further saves or roster updates.
    Closing,
}

/// The mutable working set of one edit session.
///
/// Owned exclusively by the editor state machine; the reconciler and the
/// save coordinator only ever see it for a single call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorSession {
    pub action: EditorAction,
    pub group: Option<GroupId>,
    pub account: Option<AccountIdentity>,
    /// Last-loaded authoritative snapshot; `None` until the first
    /// existing-members result arrives (distinct from loaded-but-empty).
    pub existing: Option<Vec<Member>>,
    pub pending_adds: Vec<Member>,
    pub pending_removes: Vec<Member>,
    /// Derived roster; only ever rebuilt through the reconciler.
    pub display: Vec<Member>,
}

impl EditorSession {
    pub fn new_create() -> Self {
        Self {
            action: EditorAction::Create,
            group: None,
            account: None,
            existing: None,
            pending_adds: Vec::new(),
            pending_removes: Vec::new(),
            display: Vec::new(),
        }
    }

    pub fn new_edit(group: GroupId) -> Self {
        Self {
            action: EditorAction::Edit,
            group: Some(group),
            account: None,
            existing: None,
            pending_adds: Vec::new(),
            pending_removes: Vec::new(),
            display: Vec::new(),
        }
    }

    pub fn has_membership_change(&self) -> bool {
        !self.pending_adds.is_empty() || !self.pending_removes.is_empty()
    }

    /// Stages an addition. Returns false when nothing changed.
    ///
    /// A member already displayed is a duplicate and is ignored. A member
    /// with a pending removal gets that removal undone instead of
    /// entering `pending_adds` (it is still persisted server-side).
    pub(crate) fn stage_add(&mut self, member: Member) -> bool {
        if self.display.contains(&member) {
            return false;
        }
        if let Some(pos) = self.pending_removes.iter().position(|m| *m == member) {
            self.pending_removes.remove(pos);
            return true;
        }
        if self.pending_adds.contains(&member) {
            return false;
        }
        self.pending_adds.push(member);
        true
    }

    /// Stages a removal. Returns false when nothing changed.
    ///
    /// A member staged for addition is simply unstaged (it was never
    /// persisted). Only members confirmed by the last existing-members
    /// snapshot may enter `pending_removes`.
    pub(crate) fn stage_remove(&mut self, member: &Member) -> bool {
        if let Some(pos) = self.pending_adds.iter().position(|m| m == member) {
            self.pending_adds.remove(pos);
            return true;
        }
        let confirmed = self
            .existing
            .as_ref()
            .is_some_and(|list| list.contains(member));
        if !confirmed || self.pending_removes.contains(member) {
            return false;
        }
        self.pending_removes.push(member.clone());
        true
    }
}

/// Serializable snapshot of a whole edit session, for suspend/resume
/// across interruption. Round-trips exactly through JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub editor_id: Uuid,
    pub session: EditorSession,
    pub status: Status,
    pub original_name: String,
    pub name_input: String,
    pub name_read_only: bool,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }
}

#[cfg(test)]
mod tests {
    use shared::domain::{ContactId, RawMemberId};

    use super::*;

    fn member(raw: i64, contact: i64, name: &str) -> Member {
        Member::new(
            RawMemberId(raw),
            ContactId(contact),
            &format!("key-{contact}"),
            name,
            None,
        )
    }

    #[test]
    fn removal_is_only_staged_for_confirmed_existing_members() {
        let mut session = EditorSession::new_edit(GroupId(1));
        let stranger = member(5, 5, "Stranger");

        assert!(!session.stage_remove(&stranger));
        assert!(session.pending_removes.is_empty());

        session.existing = Some(vec![stranger.clone()]);
        assert!(session.stage_remove(&stranger));
        assert_eq!(session.pending_removes, vec![stranger]);
    }

    #[test]
    fn adding_back_a_removed_member_undoes_the_removal() {
        let mut session = EditorSession::new_edit(GroupId(1));
        let ann = member(1, 1, "Ann");
        session.existing = Some(vec![ann.clone()]);

        assert!(session.stage_remove(&ann));
        assert!(session.stage_add(ann.clone()));
        assert!(session.pending_removes.is_empty());
        assert!(session.pending_adds.is_empty());
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let mut session = EditorSession::new_edit(GroupId(9));
        session.account = Some(AccountIdentity::new("me@example.com", "com.example", None));
        session.existing = Some(vec![member(1, 1, "Ann")]);
        session.pending_adds = vec![member(2, 2, "Bob")];
        session.display = vec![member(1, 1, "Ann"), member(2, 2, "Bob")];

        let snapshot = SessionSnapshot {
            editor_id: Uuid::new_v4(),
            session,
            status: Status::Editing,
            original_name: "Friends".into(),
            name_input: "Close friends".into(),
            name_read_only: false,
            saved_at: Utc::now(),
        };

        let raw = snapshot.to_json().expect("serialize snapshot");
        let restored = SessionSnapshot::from_json(&raw).expect("deserialize snapshot");
        assert_eq!(restored, snapshot);
    }
}
