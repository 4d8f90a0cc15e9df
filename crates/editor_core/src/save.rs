//! Translates a committed session into the single mutation request
//! handed to the save service.

use serde::{Deserialize, Serialize};
use shared::domain::{AccountIdentity, GroupId, Member, RawMemberId};
use thiserror::Error;

use crate::session::{EditorAction, EditorSession};

/// The one atomic create/update instruction dispatched on commit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum MutationRequest {
    CreateGroup {
        account: AccountIdentity,
        name: String,
        members_to_add: Vec<RawMemberId>,
    },
    UpdateGroup {
        group: GroupId,
        /// `None` when the name is unchanged.
        new_name: Option<String>,
        add: Vec<RawMemberId>,
        remove: Vec<RawMemberId>,
    },
}

/// A session that cannot be turned into a request. The state machine's
/// gating makes these unreachable; hitting one is a programming error.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SaveRequestError {
    #[error("create session committed without a resolved account")]
    MissingAccount,
    #[error("edit session committed without a group reference")]
    MissingGroupRef,
}

pub fn build_request(
    session: &EditorSession,
    name_input: &str,
    original_name: &str,
) -> Result<MutationRequest, SaveRequestError> {
    match session.action {
        EditorAction::Create => {
            let account = session
                .account
                .clone()
                .ok_or(SaveRequestError::MissingAccount)?;
            Ok(MutationRequest::CreateGroup {
                account,
                name: name_input.to_string(),
                members_to_add: raw_member_ids(&session.pending_adds),
            })
        }
        EditorAction::Edit => {
            let group = session.group.ok_or(SaveRequestError::MissingGroupRef)?;
            let new_name = (name_input != original_name).then(|| name_input.to_string());
            Ok(MutationRequest::UpdateGroup {
                group,
                new_name,
                add: raw_member_ids(&session.pending_adds),
                remove: raw_member_ids(&session.pending_removes),
            })
        }
    }
}

fn raw_member_ids(members: &[Member]) -> Vec<RawMemberId> {
    members.iter().map(|m| m.raw_member_id).collect()
}

#[cfg(test)]
mod tests {
    use shared::domain::ContactId;

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
    fn edit_request_carries_new_name_only_when_changed() {
        let mut session = EditorSession::new_edit(GroupId(4));
        session.pending_adds = vec![member(1, 1, "Ann")];
        session.pending_removes = vec![member(2, 2, "Bob")];

        let unchanged =
            build_request(&session, "Friends", "Friends").expect("request with unchanged name");
        assert_eq!(
            unchanged,
            MutationRequest::UpdateGroup {
                group: GroupId(4),
                new_name: None,
                add: vec![RawMemberId(1)],
                remove: vec![RawMemberId(2)],
            }
        );

        let renamed =
            build_request(&session, "Close friends", "Friends").expect("request with rename");
        match renamed {
            MutationRequest::UpdateGroup { new_name, .. } => {
                assert_eq!(new_name.as_deref(), Some("Close friends"));
            }
            other => panic!("expected update request, got {other:?}"),
        }
    }

    #[test]
    fn create_request_includes_staged_members_and_account() {
        let mut session = EditorSession::new_create();
        session.account = Some(AccountIdentity::new("me@example.com", "com.example", None));
        session.pending_adds = vec![member(3, 3, "Cay"), member(5, 5, "Dee")];

        let request = build_request(&session, "Hiking", "").expect("create request");
        assert_eq!(
            request,
            MutationRequest::CreateGroup {
                account: AccountIdentity::new("me@example.com", "com.example", None),
                name: "Hiking".into(),
                members_to_add: vec![RawMemberId(3), RawMemberId(5)],
            }
        );
    }

    #[test]
    fn create_without_account_is_a_programming_error() {
        let session = EditorSession::new_create();
        assert_eq!(
            build_request(&session, "Hiking", ""),
            Err(SaveRequestError::MissingAccount)
        );
    }
}
