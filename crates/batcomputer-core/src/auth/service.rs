//! Session & lockout manager

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{info, warn};

use super::{
    AuthError, Clock, GateEvent, LockState, LockoutPolicy, LockoutState, Session, SessionState,
    SystemClock,
};
use crate::clearance::ClearanceLevel;
use crate::credentials::CredentialTable;
use crate::storage::KeyValueStore;

/// Persisted session (JSON)
pub const SESSION_KEY: &str = "bat_auth_session_v1";
/// Persisted lockout deadline (Unix ms, decimal)
pub const LOCK_KEY: &str = "bat_auth_lock_v1";
/// Persisted failure count (decimal)
pub const FAIL_KEY: &str = "bat_auth_fail_v1";
/// Marker set on every successful login for the entry animation
pub const ENTER_ONCE_KEY: &str = "bat_enter_once";

/// The access gate
///
/// Owns the active session and the lockout counters. Every mutation is
/// written through to the key-value store before the call returns.
pub struct AuthService {
    credentials: CredentialTable,
    policy: LockoutPolicy,
    store: Box<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    session: Option<Session>,
    lockout: LockoutState,
    just_authenticated: bool,
    subscribers: Vec<mpsc::UnboundedSender<GateEvent>>,
}

impl AuthService {
    /// Gate with the built-in credentials, default policy and wall clock
    pub fn new<S: KeyValueStore + 'static>(store: S) -> Result<Self, AuthError> {
        Self::with_options(
            store,
            Arc::new(SystemClock),
            CredentialTable::builtin(),
            LockoutPolicy::default(),
        )
    }

    /// Gate with explicit dependencies, restoring any persisted state
    pub fn with_options<S: KeyValueStore + 'static>(
        store: S,
        clock: Arc<dyn Clock>,
        credentials: CredentialTable,
        policy: LockoutPolicy,
    ) -> Result<Self, AuthError> {
        let session = Self::load_session(&store)?;
        let lockout = Self::load_lockout(&store)?;

        if let Some(session) = &session {
            info!(
                "Restored session for {} at {} clearance",
                session.username, session.level
            );
        }

        Ok(Self {
            credentials,
            policy,
            store: Box::new(store),
            clock,
            session,
            lockout,
            just_authenticated: false,
            subscribers: Vec::new(),
        })
    }

    /// Receive every event emitted from now on
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<GateEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    /// Resolve a secret without touching any state
    pub fn detect_level(&self, secret: &str) -> Option<ClearanceLevel> {
        self.credentials.resolve(secret)
    }

    /// Attempt a login
    ///
    /// While a lockout window is open the secret is not even looked at.
    pub fn login(&mut self, username: &str, secret: &str) -> Result<Session, AuthError> {
        let now = self.clock.now_millis();

        if let Some(remaining) = self.lockout.remaining(now) {
            let remaining_ms = remaining.as_millis() as u64;
            warn!("Login refused: lockout active for another {}ms", remaining_ms);
            self.emit(GateEvent::locked(remaining_ms));
            return Err(AuthError::Locked { remaining_ms });
        }

        let username = username.trim();
        let level = self.credentials.resolve(secret);

        let level = match level {
            Some(level) if !username.is_empty() => level,
            _ => {
                let mut lockout = self.lockout.clone();
                let opened = lockout.record_failure(now, &self.policy);
                self.persist_lockout(&lockout)?;
                self.lockout = lockout;

                match opened {
                    Some(window) => warn!(
                        "Invalid credentials (failure {}), locked for {}s",
                        self.lockout.failure_count,
                        window.as_secs()
                    ),
                    None => warn!("Invalid credentials (failure {})", self.lockout.failure_count),
                }
                self.emit(GateEvent::invalid(self.lockout.failure_count));
                return Err(AuthError::Invalid);
            }
        };

        // Nothing is committed in memory until every write has landed
        let session = Session::new(username, level, now);
        let lockout = LockoutState::default();
        self.persist_session(Some(&session))?;
        self.persist_lockout(&lockout)?;
        self.store.set(ENTER_ONCE_KEY, "1")?;

        self.session = Some(session.clone());
        self.lockout = lockout;
        self.just_authenticated = true;

        info!(
            "Access granted to {} ({}) at {} clearance",
            session.username, session.codename, session.level
        );
        self.emit(GateEvent::authenticated(level));
        Ok(session)
    }

    /// Clear the active session; lockout counters are left alone
    ///
    /// If the store refuses the change the session stays active.
    pub fn logout(&mut self) -> Result<(), AuthError> {
        self.persist_session(None)?;
        if let Some(session) = self.session.take() {
            info!("Session terminated for {}", session.username);
        }
        self.just_authenticated = false;
        self.emit(GateEvent::logged_out());
        Ok(())
    }

    /// Returns true exactly once after each successful login
    pub fn consume_just_authenticated(&mut self) -> bool {
        std::mem::take(&mut self.just_authenticated)
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Clearance of the active session, if any
    pub fn level(&self) -> Option<ClearanceLevel> {
        self.session.as_ref().map(|s| s.level)
    }

    pub fn session_state(&self) -> SessionState {
        match &self.session {
            Some(session) => SessionState::Authenticated(session.level),
            None => SessionState::Anonymous,
        }
    }

    pub fn lock_state(&self) -> LockState {
        match self.lockout.locked_until {
            Some(until) if self.lockout.is_locked(self.clock.now_millis()) => {
                LockState::Locked { until }
            }
            _ => LockState::Unlocked,
        }
    }

    pub fn failure_count(&self) -> u32 {
        self.lockout.failure_count
    }

    /// Raw lockout deadline, even if it has already passed
    pub fn locked_until(&self) -> Option<i64> {
        self.lockout.locked_until
    }

    pub fn lockout_remaining(&self) -> Option<Duration> {
        self.lockout.remaining(self.clock.now_millis())
    }

    pub fn policy(&self) -> &LockoutPolicy {
        &self.policy
    }

    fn emit(&mut self, event: GateEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    fn persist_session(&self, session: Option<&Session>) -> Result<(), AuthError> {
        match session {
            Some(session) => {
                let json = serde_json::to_string(session)
                    .map_err(crate::storage::StorageError::from)?;
                self.store.set(SESSION_KEY, &json)?;
            }
            None => self.store.remove(SESSION_KEY)?,
        }
        Ok(())
    }

    fn persist_lockout(&self, lockout: &LockoutState) -> Result<(), AuthError> {
        match lockout.locked_until {
            Some(until) => self.store.set(LOCK_KEY, &until.to_string())?,
            None => self.store.remove(LOCK_KEY)?,
        }
        self.store.set(FAIL_KEY, &lockout.failure_count.to_string())?;
        Ok(())
    }

    fn load_session(store: &dyn KeyValueStore) -> Result<Option<Session>, AuthError> {
        let Some(raw) = store.get(SESSION_KEY)? else {
            return Ok(None);
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) if !session.username.trim().is_empty() => Ok(Some(session)),
            Ok(_) => {
                warn!("Ignoring stored session with empty username");
                Ok(None)
            }
            Err(e) => {
                warn!("Ignoring unreadable stored session: {}", e);
                Ok(None)
            }
        }
    }

    fn load_lockout(store: &dyn KeyValueStore) -> Result<LockoutState, AuthError> {
        let locked_until = match store.get(LOCK_KEY)? {
            Some(raw) => match raw.trim().parse::<i64>() {
                Ok(until) if until > 0 => Some(until),
                _ => {
                    warn!("Ignoring unreadable lockout deadline {:?}", raw);
                    None
                }
            },
            None => None,
        };

        let failure_count = match store.get(FAIL_KEY)? {
            Some(raw) => raw.trim().parse::<u32>().unwrap_or_else(|_| {
                warn!("Ignoring unreadable failure count {:?}", raw);
                0
            }),
            None => 0,
        };

        Ok(LockoutState {
            failure_count,
            locked_until,
        })
    }
}
