//! Virtual user session state.

use std::fmt;

/// Lifecycle of a virtual user.
///
/// ```text
/// Starting ──► Authenticated ──► Running ──► Stopped
///     │                                        ▲
///     └────────────── auth failure ────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserState {
    /// Registered, not yet authenticated.
    Starting,
    /// Holds a token; moves to `Running` immediately.
    Authenticated,
    /// Steady state: the scheduler is picking tasks.
    Running,
    /// Session over. No further requests.
    Stopped,
}

impl fmt::Display for UserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UserState::Starting => "starting",
            UserState::Authenticated => "authenticated",
            UserState::Running => "running",
            UserState::Stopped => "stopped",
        };
        f.write_str(name)
    }
}

/// One simulated end-user session.
///
/// Owned by exactly one task; nothing else reads or writes it, so no field
/// needs synchronization.
#[derive(Debug)]
pub struct VirtualUser {
    /// Spawn index within the run.
    id: u64,

    /// Username registered in the identity pool.
    identity: String,

    /// Password sent to `/api/auth`.
    secret: String,

    /// Bearer token, present only after successful authentication.
    token: Option<String>,

    /// Local estimate of the server-side balance.
    balance: u64,

    /// Successful transfers this session.
    transfers: u32,

    /// Successful purchases this session.
    purchases: u32,

    state: UserState,
}

impl VirtualUser {
    pub fn new(id: u64, identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            id,
            identity: identity.into(),
            secret: secret.into(),
            token: None,
            balance: 0,
            transfers: 0,
            purchases: 0,
            state: UserState::Starting,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn identity(&self) -> &str {
        &self.identity
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn transfers(&self) -> u32 {
        self.transfers
    }

    pub fn purchases(&self) -> u32 {
        self.purchases
    }

    pub fn state(&self) -> UserState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == UserState::Running
    }

    /// Store the token and starting balance after a successful login.
    ///
    /// Only valid from `Starting`; returns false and changes nothing
    /// otherwise.
    pub fn authenticated(&mut self, token: String, initial_balance: u64) -> bool {
        if self.state != UserState::Starting {
            return false;
        }
        self.token = Some(token);
        self.balance = initial_balance;
        self.state = UserState::Authenticated;
        true
    }

    /// Enter the steady state.
    pub fn start_running(&mut self) {
        if self.state == UserState::Authenticated {
            self.state = UserState::Running;
        }
    }

    /// End the session.
    pub fn stop(&mut self) {
        self.state = UserState::Stopped;
    }

    /// Apply a transfer the server accepted.
    pub fn record_transfer(&mut self, amount: u64) {
        debug_assert!(amount <= self.balance, "transfer exceeds balance");
        self.balance = self.balance.saturating_sub(amount);
        self.transfers += 1;
    }

    /// Apply a purchase the server accepted.
    pub fn record_purchase(&mut self, price: u64) {
        debug_assert!(price <= self.balance, "purchase exceeds balance");
        self.balance = self.balance.saturating_sub(price);
        self.purchases += 1;
    }

    /// Summary of the session so far.
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            identity: self.identity.clone(),
            state: self.state,
            authenticated: self.token.is_some(),
            balance: self.balance,
            transfers: self.transfers,
            purchases: self.purchases,
        }
    }
}

/// Final state of a user, returned when its task ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserSummary {
    pub id: u64,
    pub identity: String,
    pub state: UserState,
    /// Whether the user ever obtained a token.
    pub authenticated: bool,
    pub balance: u64,
    pub transfers: u32,
    pub purchases: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lifecycle() {
        let mut user = VirtualUser::new(1, "user1", "password");
        assert_eq!(user.state(), UserState::Starting);
        assert!(user.token().is_none());

        assert!(user.authenticated("tok".into(), 1000));
        assert_eq!(user.state(), UserState::Authenticated);
        user.start_running();
        assert!(user.is_running());
        assert_eq!(user.balance(), 1000);

        // A second login is refused
        assert!(!user.authenticated("other".into(), 5));
        assert_eq!(user.token(), Some("tok"));
        assert_eq!(user.balance(), 1000);

        user.stop();
        assert_eq!(user.state(), UserState::Stopped);
    }

    #[test]
    fn test_start_running_requires_token() {
        let mut user = VirtualUser::new(1, "user1", "password");
        user.start_running();
        assert_eq!(user.state(), UserState::Starting);
    }

    #[test]
    fn test_debits() {
        let mut user = VirtualUser::new(1, "user1", "password");
        user.authenticated("tok".into(), 1000);
        user.start_running();

        user.record_purchase(80);
        user.record_transfer(100);

        let summary = user.summary();
        assert_eq!(summary.balance, 820);
        assert_eq!(summary.purchases, 1);
        assert_eq!(summary.transfers, 1);
        assert!(summary.authenticated);
    }
}
