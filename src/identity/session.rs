use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};
use parking_lot::RwLock;
use base64::Engine;
use thiserror::Error;

use super::principal::Principal;

pub type SessionToken = String;

type FillRandom = fn(&mut [u8]) -> Result<(), getrandom::Error>;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("random source unavailable: {0}")]
    Rng(String),
}

#[derive(Debug, Clone)]
pub struct Session {
    pub session_id: String,
    pub token: SessionToken,
    pub principal: Principal,
    pub issued_at: Instant,
    /// `None` for pre-provisioned API tokens.
    pub expires_at: Option<Instant>,
}

impl Session {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map(|t| t > now).unwrap_or(true)
    }
}

type SessionMap = HashMap<SessionToken, Session>;
type UserIndex = HashMap<String, HashSet<SessionToken>>;

/// Drop `token` from the user's set, and the user once the set is empty.
fn unindex(idx: &mut UserIndex, user_id: &str, token: &str) {
    if let Some(set) = idx.get_mut(user_id) {
        set.remove(token);
        if set.is_empty() { idx.remove(user_id); }
    }
}

/// Token-to-principal bindings for the local identity provider.
///
/// Lock order is always `sessions` then `user_index`.
pub struct SessionManager {
    pub ttl: Duration,
    fill_random: FillRandom,
    sessions: RwLock<SessionMap>,
    user_index: RwLock<UserIndex>,
}

impl Default for SessionManager {
    fn default() -> Self { Self::with_ttl(Duration::from_secs(60 * 60)) }
}

impl SessionManager {
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            fill_random: getrandom::getrandom,
            sessions: RwLock::new(HashMap::new()),
            user_index: RwLock::new(HashMap::new()),
        }
    }

    fn gen_id(&self) -> Result<String, SessionError> {
        // 256-bit random token, base64url without padding
        let mut buf = [0u8; 32];
        (self.fill_random)(&mut buf).map_err(|e| SessionError::Rng(e.to_string()))?;
        Ok(base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(buf))
    }

    /// Issue a session that expires after `ttl`.
    pub fn issue(&self, principal: Principal) -> Result<Session, SessionError> {
        let now = Instant::now();
        let sess = Session {
            session_id: self.gen_id()?,
            token: self.gen_id()?,
            principal,
            issued_at: now,
            expires_at: Some(now + self.ttl),
        };
        self.store(sess.clone());
        tracing::debug!(user = %sess.principal.user_id, sid = %sess.session_id, ttl_secs = self.ttl.as_secs(), "session.issue");
        Ok(sess)
    }

    /// Register a caller-chosen token that never expires (API tokens from the seed file).
    pub fn install(&self, token: impl Into<String>, principal: Principal) -> Result<Session, SessionError> {
        let sess = Session {
            session_id: self.gen_id()?,
            token: token.into(),
            principal,
            issued_at: Instant::now(),
            expires_at: None,
        };
        self.store(sess.clone());
        tracing::debug!(user = %sess.principal.user_id, sid = %sess.session_id, "session.install");
        Ok(sess)
    }

    fn store(&self, sess: Session) {
        let mut sessions = self.sessions.write();
        let mut idx = self.user_index.write();
        let token = sess.token.clone();
        let user_id = sess.principal.user_id.clone();
        if let Some(old) = sessions.insert(token.clone(), sess) {
            if old.principal.user_id != user_id { unindex(&mut idx, &old.principal.user_id, &token); }
        }
        idx.entry(user_id).or_default().insert(token);
    }

    pub fn validate(&self, token: &str) -> Option<Principal> {
        let now = Instant::now();
        {
            let map = self.sessions.read();
            let ent = map.get(token)?;
            if ent.is_live(now) { return Some(ent.principal.clone()); }
        }
        // read guard released before pruning
        self.logout(token);
        tracing::debug!("session.expired");
        None
    }

    pub fn logout(&self, token: &str) -> bool {
        let mut sessions = self.sessions.write();
        let Some(ent) = sessions.remove(token) else { return false; };
        unindex(&mut self.user_index.write(), &ent.principal.user_id, token);
        true
    }

    pub fn revoke_user(&self, user_id: &str) -> usize {
        let mut sessions = self.sessions.write();
        let tokens = self.user_index.write().remove(user_id).unwrap_or_default();
        let count = tokens.iter().filter(|t| sessions.remove(*t).is_some()).count();
        drop(sessions);
        tracing::info!(user = %user_id, count, "session.revoke");
        count
    }

    /// Drop every expired session; returns how many were removed.
    pub fn sweep_expired(&self) -> usize {
        let now = Instant::now();
        let mut sessions = self.sessions.write();
        let mut idx = self.user_index.write();
        let before = sessions.len();
        sessions.retain(|token, s| {
            let live = s.is_live(now);
            if !live { unindex(&mut idx, &s.principal.user_id, token); }
            live
        });
        before - sessions.len()
    }

    pub fn len(&self) -> usize { self.sessions.read().len() }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn indexed_users(sm: &SessionManager) -> usize { sm.user_index.read().len() }

    #[test]
    fn issued_token_validates_to_its_principal() {
        let sm = SessionManager::default();
        let s = sm.issue(Principal::authenticated("u1")).unwrap();
        assert_eq!(sm.validate(&s.token).unwrap().user_id, "u1");
        assert_ne!(s.token, s.session_id);
        assert!(sm.validate("not-a-token").is_none());
    }

    #[test]
    fn rng_failure_is_propagated_and_stores_nothing() {
        let mut sm = SessionManager::default();
        sm.fill_random = |_: &mut [u8]| Err(getrandom::Error::UNSUPPORTED);
        assert!(matches!(sm.issue(Principal::authenticated("u1")), Err(SessionError::Rng(_))));
        assert!(matches!(sm.install("api-key", Principal::authenticated("u1")), Err(SessionError::Rng(_))));
        assert_eq!(sm.len(), 0);
        assert_eq!(indexed_users(&sm), 0);
    }

    #[test]
    fn expired_sessions_are_pruned() {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        let s = sm.issue(Principal::authenticated("u1")).unwrap();
        assert!(sm.validate(&s.token).is_none());
        assert_eq!(sm.len(), 0);
        assert_eq!(indexed_users(&sm), 0);
    }

    #[test]
    fn sweep_removes_only_expired_sessions() {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        sm.issue(Principal::authenticated("u1")).unwrap();
        sm.issue(Principal::authenticated("u2")).unwrap();
        sm.install("keep", Principal::authenticated("svc")).unwrap();
        assert_eq!(sm.sweep_expired(), 2);
        assert_eq!(sm.len(), 1);
        assert_eq!(sm.revoke_user("u1"), 0);
    }

    #[test]
    fn user_index_shrinks_with_sessions() {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        for i in 0..1000 {
            sm.issue(Principal::authenticated(format!("user-{i}"))).unwrap();
        }
        assert_eq!(indexed_users(&sm), 1000);
        assert_eq!(sm.sweep_expired(), 1000);
        assert_eq!(sm.len(), 0);
        assert_eq!(indexed_users(&sm), 0);
    }

    #[test]
    fn logout_of_last_session_drops_the_user_entry() {
        let sm = SessionManager::default();
        let s = sm.issue(Principal::authenticated("u1")).unwrap();
        assert!(sm.logout(&s.token));
        assert_eq!(indexed_users(&sm), 0);
    }

    #[test]
    fn reinstalling_a_token_for_another_user_moves_it() {
        let sm = SessionManager::default();
        sm.install("shared", Principal::authenticated("a")).unwrap();
        sm.install("shared", Principal::authenticated("b")).unwrap();
        assert_eq!(sm.revoke_user("a"), 0);
        assert_eq!(sm.validate("shared").unwrap().user_id, "b");
        assert_eq!(sm.revoke_user("b"), 1);
        assert_eq!(indexed_users(&sm), 0);
    }

    #[test]
    fn maps_stay_consistent_while_issuing_and_revoking() {
        let sm = std::sync::Arc::new(SessionManager::default());
        let issuer = {
            let sm = sm.clone();
            std::thread::spawn(move || {
                for _ in 0..500 { sm.issue(Principal::authenticated("u1")).unwrap(); }
            })
        };
        for _ in 0..200 {
            {
                let sessions = sm.sessions.read();
                let idx = sm.user_index.read();
                for (token, s) in sessions.iter() {
                    assert!(idx.get(&s.principal.user_id).is_some_and(|set| set.contains(token)));
                }
            }
            sm.revoke_user("u1");
        }
        issuer.join().unwrap();
        sm.revoke_user("u1");
        assert_eq!(sm.len(), 0);
        assert_eq!(indexed_users(&sm), 0);
    }

    #[test]
    fn installed_tokens_never_expire() {
        let sm = SessionManager::with_ttl(Duration::from_secs(0));
        sm.install("api-key-1", Principal::authenticated("svc")).unwrap();
        assert_eq!(sm.validate("api-key-1").unwrap().user_id, "svc");
    }

    #[test]
    fn logout_removes_only_that_token() {
        let sm = SessionManager::default();
        let a = sm.issue(Principal::authenticated("u1")).unwrap();
        let b = sm.issue(Principal::authenticated("u1")).unwrap();
        assert!(sm.logout(&a.token));
        assert!(!sm.logout(&a.token));
        assert!(sm.validate(&a.token).is_none());
        assert!(sm.validate(&b.token).is_some());
    }

    #[test]
    fn revoke_user_drops_every_session_of_that_user() {
        let sm = SessionManager::default();
        sm.issue(Principal::authenticated("u1")).unwrap();
        sm.issue(Principal::authenticated("u1")).unwrap();
        let other = sm.issue(Principal::authenticated("u2")).unwrap();
        assert_eq!(sm.revoke_user("u1"), 2);
        assert_eq!(sm.revoke_user("u1"), 0);
        assert_eq!(sm.len(), 1);
        assert!(sm.validate(&other.token).is_some());
    }
}
