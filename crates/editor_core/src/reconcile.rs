//! Merges the authoritative existing-members snapshot with staged edits
//! into the roster the user sees.

use std::collections::HashSet;

use shared::domain::Member;

/// Builds the display roster from the last-loaded existing members (if
/// any), the staged additions, and the staged removals.
///
/// Pure and idempotent; called every time existing members arrive or a
/// pending list changes. Until the first existing-members result lands,
/// only staged additions are shown. Members are de-duplicated by stable
/// reference, existing members first in load order, then staged
/// additions in staging order. A member present both server-side and in
/// the staged additions appears once, in its server-side position.
pub fn reconcile(
    existing: Option<&[Member]>,
    pending_adds: &[Member],
    pending_removes: &[Member],
) -> Vec<Member> {
    let removed: HashSet<&str> = pending_removes.iter().map(Member::stable_ref).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut display = Vec::new();

    for member in existing.unwrap_or_default().iter().chain(pending_adds) {
        if removed.contains(member.stable_ref()) {
            continue;
        }
        if seen.insert(member.stable_ref()) {
            display.push(member.clone());
        }
    }

    display
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
    fn merges_existing_adds_and_removes_in_order() {
        let a = member(1, 1, "A");
        let b = member(2, 2, "B");
        let c = member(3, 3, "C");

        let display = reconcile(
            Some(&[a.clone(), b.clone()]),
            &[c.clone()],
            std::slice::from_ref(&b),
        );
        assert_eq!(display, vec![a, c]);
    }

    #[test]
    fn shows_only_staged_adds_before_existing_members_arrive() {
        let x = member(7, 7, "X");
        let display = reconcile(None, std::slice::from_ref(&x), &[]);
        assert_eq!(display, vec![x]);
    }

    #[test]
    fn member_known_both_server_side_and_staged_appears_once() {
        let a = member(1, 1, "A");
        let b = member(2, 2, "B");
        // Same person as `b` resolved again through a different raw row.
        let b_again = member(9, 2, "B");

        let display = reconcile(Some(&[a.clone(), b.clone()]), &[b_again], &[]);
        assert_eq!(display, vec![a, b]);
    }

    #[test]
    fn identical_inputs_reconcile_identically() {
        let existing = vec![member(1, 1, "A"), member(2, 2, "B")];
        let adds = vec![member(3, 3, "C")];
        let removes = vec![member(1, 1, "A")];

        let first = reconcile(Some(&existing), &adds, &removes);
        let second = reconcile(Some(&existing), &adds, &removes);
        assert_eq!(first, second);
    }
}
