use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;

use super::membership::{Membership, MembershipStore, StoreError};

type Key = (String, String);

/// Process-local membership table keyed by (user_id, workspace_id).
#[derive(Default)]
pub struct InMemoryMembershipStore {
    rows: RwLock<HashMap<Key, Membership>>,
}

impl InMemoryMembershipStore {
    pub fn new() -> Self { Self::default() }

    pub fn from_memberships(rows: impl IntoIterator<Item = Membership>) -> Self {
        let store = Self::new();
        for m in rows { store.upsert(m); }
        store
    }

    /// Insert or replace; at most one row exists per pair. Returns the replaced row.
    pub fn upsert(&self, m: Membership) -> Option<Membership> {
        let key = (m.user_id.clone(), m.workspace_id.clone());
        self.rows.write().insert(key, m)
    }

    pub fn len(&self) -> usize { self.rows.read().len() }

    pub fn is_empty(&self) -> bool { self.rows.read().is_empty() }
}

impl MembershipStore for InMemoryMembershipStore {
    fn find(&self, user_id: &str, workspace_id: &str) -> Result<Option<Membership>, StoreError> {
        let now = Utc::now();
        let map = self.rows.read();
        Ok(map
            .get(&(user_id.to_string(), workspace_id.to_string()))
            .filter(|m| m.is_active_at(now))
            .cloned())
    }

    fn list_for_workspace(&self, workspace_id: &str) -> Result<Vec<Membership>, StoreError> {
        let now = Utc::now();
        let mut out: Vec<Membership> = self
            .rows
            .read()
            .values()
            .filter(|m| m.workspace_id == workspace_id && m.is_active_at(now))
            .cloned()
            .collect();
        out.sort_by(|a, b| b.role.cmp(&a.role).then_with(|| a.user_id.cmp(&b.user_id)));
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workspace::Role;
    use chrono::Duration;

    #[test]
    fn upsert_keeps_one_row_per_pair() {
        let s = InMemoryMembershipStore::new();
        assert!(s.upsert(Membership::new("u1", "w1", Role::Viewer)).is_none());
        let old = s.upsert(Membership::new("u1", "w1", Role::Admin)).unwrap();
        assert_eq!(old.role, Role::Viewer);
        assert_eq!(s.len(), 1);
        assert_eq!(s.find("u1", "w1").unwrap().unwrap().role, Role::Admin);
    }

    #[test]
    fn find_is_exact_match() {
        let s = InMemoryMembershipStore::from_memberships([Membership::new("u1", "w1", Role::Member)]);
        assert!(s.find("u1", "w2").unwrap().is_none());
        assert!(s.find("U1", "w1").unwrap().is_none());
        assert!(s.find("u", "w1").unwrap().is_none());
    }

    #[test]
    fn expired_rows_are_invisible() {
        let mut m = Membership::new("u1", "w1", Role::Admin);
        m.expires_at = Some(Utc::now() - Duration::minutes(1));
        let s = InMemoryMembershipStore::from_memberships([m]);
        assert!(s.find("u1", "w1").unwrap().is_none());
        assert!(s.list_for_workspace("w1").unwrap().is_empty());
    }

    #[test]
    fn list_orders_by_role_then_user() {
        let s = InMemoryMembershipStore::from_memberships([
            Membership::new("b", "w1", Role::Viewer),
            Membership::new("a", "w1", Role::Viewer),
            Membership::new("z", "w1", Role::Admin),
            Membership::new("x", "w2", Role::Admin),
        ]);
        let ids: Vec<_> = s.list_for_workspace("w1").unwrap().into_iter().map(|m| m.user_id).collect();
        assert_eq!(ids, vec!["z", "a", "b"]);
    }
}
