//! Short-lived credential store: pending registrations and login codes.
//!
//! Both kinds of entry are single-use. Redemption removes the entry under
//! the same lock that looks it up, so two callers racing on one token
//! cannot both win.
//!
//! # Expiry
//!
//! Every entry is stamped when stored. A redemption of an entry older than
//! its configured lifetime fails as if the entry were absent. Expired
//! entries are also removed in bulk by [`CredentialStore::sweep_expired`],
//! which [`spawn_sweeper`] runs on a fixed interval.
//!
//! Timestamps use [`tokio::time::Instant`], so tests can drive expiry with
//! a paused clock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use courier_protocol::{EmailAddress, Identity};
use parking_lot::Mutex;
use subtle::ConstantTimeEq;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::SessionConfig;

struct PendingEntry {
    identity: Identity,
    created_at: Instant,
}

struct ChallengeEntry {
    code: String,
    created_at: Instant,
    failed_attempts: u32,
}

/// How many entries one sweep removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub pending: usize,
    pub challenges: usize,
}

impl SweepStats {
    /// Total entries removed.
    pub fn total(&self) -> usize {
        self.pending + self.challenges
    }
}

/// Process-local store for registration tokens and login codes.
///
/// Contents are lost on restart. Lost entries only mean users have to
/// register or log in again.
pub struct CredentialStore {
    /// Registration token -> identity awaiting confirmation.
    pending: Mutex<HashMap<String, PendingEntry>>,

    /// Email -> the one outstanding login code for that address.
    /// A new login replaces the previous code.
    challenges: Mutex<HashMap<EmailAddress, ChallengeEntry>>,

    pending_ttl: Option<Duration>,
    challenge_ttl: Option<Duration>,
    max_code_attempts: u32,
}

fn is_expired(created_at: Instant, ttl: Option<Duration>) -> bool {
    ttl.is_some_and(|ttl| created_at.elapsed() >= ttl)
}

impl CredentialStore {
    /// Creates an empty store using the lifetimes in `config`.
    pub fn new(config: &SessionConfig) -> Self {
        Self {
            pending: Mutex::new(HashMap::new()),
            challenges: Mutex::new(HashMap::new()),
            pending_ttl: config.pending_ttl,
            challenge_ttl: config.challenge_ttl,
            max_code_attempts: config.max_code_attempts,
        }
    }

    /// Stores `identity` under `token` until it is redeemed or expires.
    pub fn put_pending(&self, token: String, identity: Identity) {
        let entry = PendingEntry {
            identity,
            created_at: Instant::now(),
        };
        self.pending.lock().insert(token, entry);
    }

    /// Removes and returns the identity stored under `token`.
    ///
    /// Returns `None` for an unknown, already redeemed, or expired token.
    /// At most one caller ever receives `Some` for a given token.
    pub fn take_pending(&self, token: &str) -> Option<Identity> {
        let entry = self.pending.lock().remove(token)?;
        if is_expired(entry.created_at, self.pending_ttl) {
            tracing::debug!("registration token redeemed after expiry");
            return None;
        }
        Some(entry.identity)
    }

    /// Stores `code` as the outstanding login code for `email`,
    /// replacing any previous one.
    pub fn put_challenge(&self, email: EmailAddress, code: String) {
        let entry = ChallengeEntry {
            code,
            created_at: Instant::now(),
            failed_attempts: 0,
        };
        self.challenges.lock().insert(email, entry);
    }

    /// Removes and returns the outstanding code for `email`, if any and
    /// not expired.
    pub fn take_challenge(&self, email: &EmailAddress) -> Option<String> {
        let entry = self.challenges.lock().remove(email)?;
        if is_expired(entry.created_at, self.challenge_ttl) {
            return None;
        }
        Some(entry.code)
    }

    /// Checks `code` against the outstanding code for `email`.
    ///
    /// On a match the code is consumed and `true` is returned. A wrong
    /// guess counts against the code; once the configured attempt limit
    /// is reached the code is discarded and every later guess fails.
    /// The comparison runs in constant time.
    pub fn redeem_challenge(&self, email: &EmailAddress, code: &str) -> bool {
        let mut challenges = self.challenges.lock();
        let Some(entry) = challenges.get_mut(email) else {
            return false;
        };

        if is_expired(entry.created_at, self.challenge_ttl) {
            challenges.remove(email);
            return false;
        }

        if bool::from(entry.code.as_bytes().ct_eq(code.as_bytes())) {
            challenges.remove(email);
            return true;
        }

        entry.failed_attempts += 1;
        if entry.failed_attempts >= self.max_code_attempts {
            tracing::warn!(%email, "login code discarded after too many wrong guesses");
            challenges.remove(email);
        }
        false
    }

    /// Removes every expired entry and reports how many went.
    pub fn sweep_expired(&self) -> SweepStats {
        let mut stats = SweepStats::default();

        {
            let mut pending = self.pending.lock();
            let before = pending.len();
            pending.retain(|_, entry| !is_expired(entry.created_at, self.pending_ttl));
            stats.pending = before - pending.len();
        }

        {
            let mut challenges = self.challenges.lock();
            let before = challenges.len();
            challenges.retain(|_, entry| !is_expired(entry.created_at, self.challenge_ttl));
            stats.challenges = before - challenges.len();
        }

        stats
    }

    /// Number of registrations awaiting confirmation, expired ones included.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    /// Number of outstanding login codes, expired ones included.
    pub fn challenge_len(&self) -> usize {
        self.challenges.lock().len()
    }
}

/// Spawns a task that calls [`CredentialStore::sweep_expired`] every
/// `every`.
///
/// Missed ticks are skipped rather than replayed. The task runs until the
/// returned handle is aborted or the runtime shuts down.
pub fn spawn_sweeper(store: Arc<CredentialStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let stats = store.sweep_expired();
            if stats.total() > 0 {
                tracing::debug!(
                    pending = stats.pending,
                    challenges = stats.challenges,
                    "swept expired credentials"
                );
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use courier_protocol::UserId;

    use super::*;

    fn email(raw: &str) -> EmailAddress {
        EmailAddress::parse(raw).unwrap()
    }

    fn identity(raw: &str) -> Identity {
        Identity {
            id: UserId("abcdefghij".into()),
            email: email(raw),
            password_hash: "$argon2id$stub".into(),
        }
    }

    fn store() -> CredentialStore {
        CredentialStore::new(&SessionConfig::default())
    }

    #[test]
    fn test_take_pending_returns_once() {
        let store = store();
        store.put_pending("tok".into(), identity("a@x.com"));

        let first = store.take_pending("tok");
        assert_eq!(first.map(|i| i.email), Some(email("a@x.com")));
        assert!(store.take_pending("tok").is_none());
    }

    #[test]
    fn test_take_pending_unknown_token_returns_none() {
        assert!(store().take_pending("nope").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_take_pending_after_ttl_returns_none() {
        let store = store();
        store.put_pending("tok".into(), identity("a@x.com"));

        time::advance(Duration::from_secs(24 * 60 * 60)).await;

        assert!(store.take_pending("tok").is_none());
        assert_eq!(store.pending_len(), 0);
    }

    #[test]
    fn test_put_challenge_replaces_previous_code() {
        let store = store();
        let addr = email("a@x.com");
        store.put_challenge(addr.clone(), "111111".into());
        store.put_challenge(addr.clone(), "222222".into());

        assert!(!store.redeem_challenge(&addr, "111111"));
        assert!(store.redeem_challenge(&addr, "222222"));
    }

    #[test]
    fn test_redeem_challenge_is_single_use() {
        let store = store();
        let addr = email("a@x.com");
        store.put_challenge(addr.clone(), "123456".into());

        assert!(store.redeem_challenge(&addr, "123456"));
        assert!(!store.redeem_challenge(&addr, "123456"));
    }

    #[test]
    fn test_redeem_challenge_discards_after_max_attempts() {
        let store = store();
        let addr = email("a@x.com");
        store.put_challenge(addr.clone(), "123456".into());

        for _ in 0..5 {
            assert!(!store.redeem_challenge(&addr, "000000"));
        }
        assert_eq!(store.challenge_len(), 0);
        assert!(!store.redeem_challenge(&addr, "123456"));
    }

    #[test]
    fn test_redeem_challenge_wrong_guess_keeps_code_below_limit() {
        let store = store();
        let addr = email("a@x.com");
        store.put_challenge(addr.clone(), "123456".into());

        assert!(!store.redeem_challenge(&addr, "999999"));
        assert!(store.redeem_challenge(&addr, "123456"));
    }

    #[test]
    fn test_take_challenge_returns_code() {
        let store = store();
        let addr = email("a@x.com");
        store.put_challenge(addr.clone(), "042042".into());
        assert_eq!(store.take_challenge(&addr).as_deref(), Some("042042"));
        assert!(store.take_challenge(&addr).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_redeem_challenge_after_ttl_returns_false() {
        let store = store();
        let addr = email("a@x.com");
        store.put_challenge(addr.clone(), "123456".into());

        time::advance(Duration::from_secs(10 * 60)).await;

        assert!(!store.redeem_challenge(&addr, "123456"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweep_expired_removes_only_stale_entries() {
        let store = store();
        store.put_pending("old".into(), identity("a@x.com"));
        store.put_challenge(email("a@x.com"), "111111".into());

        time::advance(Duration::from_secs(11 * 60)).await;
        store.put_challenge(email("b@x.com"), "222222".into());

        let stats = store.sweep_expired();
        assert_eq!(stats, SweepStats { pending: 0, challenges: 1 });
        assert_eq!(store.pending_len(), 1);
        assert_eq!(store.challenge_len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawn_sweeper_clears_expired_entries() {
        let store = Arc::new(store());
        store.put_challenge(email("a@x.com"), "111111".into());

        let handle = spawn_sweeper(Arc::clone(&store), Duration::from_secs(60));

        time::sleep(Duration::from_secs(11 * 60)).await;
        tokio::task::yield_now().await;

        assert_eq!(store.challenge_len(), 0);
        handle.abort();
    }

    #[test]
    fn test_no_ttl_never_expires() {
        let config = SessionConfig {
            pending_ttl: None,
            challenge_ttl: None,
            ..SessionConfig::default()
        };
        let store = CredentialStore::new(&config);
        store.put_pending("tok".into(), identity("a@x.com"));
        assert_eq!(store.sweep_expired().total(), 0);
        assert!(store.take_pending("tok").is_some());
    }
}
