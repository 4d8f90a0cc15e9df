use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub i64);
    };
}

id_newtype!(GroupId);
id_newtype!(RawMemberId);
id_newtype!(ContactId);

/// Opaque lookup handle for a person, handed to the contact lookup
/// collaborator when the user picks a suggestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PersonRef(pub String);

/// The account that owns a group: name, account type, optional dataset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountIdentity {
    pub name: String,
    pub kind: String,
    pub data_set: Option<String>,
}

impl AccountIdentity {
    pub fn new(name: impl Into<String>, kind: impl Into<String>, data_set: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            data_set,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMetadata {
    pub name: String,
    pub account: AccountIdentity,
    pub read_only: bool,
}

/// One member (current or candidate) of the group being edited.
///
/// Equality and hashing go through `lookup_ref`, the stable person
/// reference, never through `raw_member_id`: the same person sourced
/// from two different membership rows is one member.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Member {
    pub raw_member_id: RawMemberId,
    pub contact_id: ContactId,
    lookup_ref: String,
    pub display_name: String,
    pub photo: Option<String>,
}

impl Member {
    pub fn new(
        raw_member_id: RawMemberId,
        contact_id: ContactId,
        lookup_key: &str,
        display_name: impl Into<String>,
        photo: Option<String>,
    ) -> Self {
        Self {
            raw_member_id,
            contact_id,
            lookup_ref: format!("lookup/{lookup_key}/{}", contact_id.0),
            display_name: display_name.into(),
            photo,
        }
    }

    pub fn stable_ref(&self) -> &str {
        &self.lookup_ref
    }
}

impl PartialEq for Member {
    fn eq(&self, other: &Self) -> bool {
        self.lookup_ref == other.lookup_ref
    }
}

impl Eq for Member {}

impl std::hash::Hash for Member {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.lookup_ref.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn members_with_same_person_but_different_raw_rows_are_equal() {
        let first = Member::new(RawMemberId(10), ContactId(3), "abc", "Ann", None);
        let second = Member::new(RawMemberId(99), ContactId(3), "abc", "Ann B.", None);
        assert_eq!(first, second);

        let mut seen = HashSet::new();
        assert!(seen.insert(first));
        assert!(!seen.insert(second));
    }

    #[test]
    fn members_with_different_lookup_keys_are_distinct() {
        let first = Member::new(RawMemberId(1), ContactId(3), "abc", "Ann", None);
        let second = Member::new(RawMemberId(1), ContactId(3), "xyz", "Ann", None);
        assert_ne!(first, second);
    }
}
