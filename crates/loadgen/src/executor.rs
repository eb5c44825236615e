//! Action executors.
//!
//! Each executor follows the same contract:
//!
//! 1. Check the action's guard condition against the user's local state.
//! 2. If the guard fails, return [`Execution::Skipped`]: no request is
//!    issued and no outcome event is emitted.
//! 3. Otherwise issue exactly one request, emit exactly one
//!    [`OutcomeEvent`], and mutate the user only if the status was 200.
//!
//! Errors never escape an executor; a failed request is recorded and the
//! caller moves on to the next scheduled task.

use crate::client::{ApiRequest, ApiResponse, AuthResponse, Transport};
use crate::config::SessionConfig;
use crate::identities::IdentityPool;
use crate::scheduler::Task;
use crate::user::{UserState, VirtualUser};
use rand::Rng;
use shopload_types::{classify_status, ActionKind, Catalog, OutcomeEvent, StatusClass};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::{debug, trace, warn};

/// What happened when an executor ran.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Execution {
    /// Guard failed; nothing was sent.
    Skipped,
    /// A response came back with this classification.
    Responded(StatusClass),
    /// The transport gave up before a response arrived.
    TransportFailed,
}

impl Execution {
    /// Whether a request went out.
    pub fn issued(&self) -> bool {
        !matches!(self, Execution::Skipped)
    }
}

/// Runs actions on behalf of virtual users.
///
/// One executor is shared by every user of a run; all per-user state lives
/// in the [`VirtualUser`] passed to each call.
pub struct ActionExecutor {
    transport: Arc<dyn Transport>,
    identities: Arc<IdentityPool>,
    catalog: Arc<Catalog>,
    session: SessionConfig,
    events: mpsc::UnboundedSender<OutcomeEvent>,
}

impl ActionExecutor {
    pub fn new(
        transport: Arc<dyn Transport>,
        identities: Arc<IdentityPool>,
        catalog: Arc<Catalog>,
        session: SessionConfig,
        events: mpsc::UnboundedSender<OutcomeEvent>,
    ) -> Self {
        Self {
            transport,
            identities,
            catalog,
            session,
            events,
        }
    }

    /// Log the user in.
    ///
    /// On a 200 carrying a token the user ends in `Running` with the
    /// initial balance. Any other outcome stops the user before it ever
    /// runs. Returns whether the user is now running.
    pub async fn authenticate(&self, user: &mut VirtualUser) -> bool {
        if user.state() != UserState::Starting {
            return false;
        }

        let request = ApiRequest::Auth {
            username: user.identity().to_string(),
            password: user.secret().to_string(),
        };

        let Some(response) = self.call(ActionKind::Authenticate, request).await else {
            warn!(user = user.identity(), "Authentication failed: no response");
            user.stop();
            return false;
        };

        if !classify_status(response.status).is_ok() {
            warn!(
                user = user.identity(),
                status = response.status,
                "Authentication failed"
            );
            user.stop();
            return false;
        }

        match response.json::<AuthResponse>() {
            Ok(auth) => {
                user.authenticated(auth.token, self.session.initial_balance);
                user.start_running();
                debug!(user = user.identity(), "Authenticated");
                true
            }
            Err(e) => {
                warn!(user = user.identity(), error = %e, "Authentication failed: bad token body");
                user.stop();
                false
            }
        }
    }

    /// Send a fixed amount to another known user.
    ///
    /// Guard: under the transfer limit, balance covers the amount, and the
    /// pool holds someone other than this user.
    pub async fn transfer<R: Rng + Send + ?Sized>(
        &self,
        user: &mut VirtualUser,
        rng: &mut R,
    ) -> Execution {
        let Some(token) = user.token().map(str::to_string) else {
            return Execution::Skipped;
        };
        let amount = self.session.transfer_amount;

        if user.transfers() >= self.session.max_transfers || user.balance() < amount {
            return Execution::Skipped;
        }

        let Some(recipient) = self.identities.sample_excluding(user.identity(), rng) else {
            trace!(user = user.identity(), "No transfer recipient available");
            return Execution::Skipped;
        };

        let request = ApiRequest::SendCoin {
            token,
            to_user: recipient,
            amount,
        };

        let execution = self.execute(ActionKind::Transfer, request).await;
        if execution == Execution::Responded(StatusClass::Ok) {
            user.record_transfer(amount);
        }
        execution
    }

    /// Buy one affordable item.
    ///
    /// Guard: under the purchase limit and at least one item fits the
    /// balance. The item is picked uniformly among affordable entries.
    pub async fn purchase<R: Rng + Send + ?Sized>(
        &self,
        user: &mut VirtualUser,
        rng: &mut R,
    ) -> Execution {
        let Some(token) = user.token().map(str::to_string) else {
            return Execution::Skipped;
        };

        if user.purchases() >= self.session.max_purchases {
            return Execution::Skipped;
        }

        let Some(entry) = self.catalog.choose_affordable(user.balance(), rng) else {
            return Execution::Skipped;
        };
        let price = entry.price;
        let item = entry.name.clone();

        trace!(user = user.identity(), %item, price, "Buying");

        let execution = self
            .execute(ActionKind::Purchase, ApiRequest::Buy { token, item })
            .await;
        if execution == Execution::Responded(StatusClass::Ok) {
            user.record_purchase(price);
        }
        execution
    }

    /// Check the balance. Never mutates the user.
    pub async fn inquire(&self, user: &mut VirtualUser) -> Execution {
        let Some(token) = user.token().map(str::to_string) else {
            return Execution::Skipped;
        };
        self.execute(ActionKind::Inquire, ApiRequest::Info { token })
            .await
    }

    /// Run one scheduled task. Returns the number of requests issued.
    pub async fn run_task<R: Rng + Send + ?Sized>(
        &self,
        task: Task,
        user: &mut VirtualUser,
        rng: &mut R,
    ) -> usize {
        let executions = match task {
            Task::Purchase => vec![self.purchase(user, rng).await],
            Task::Transfer => vec![self.transfer(user, rng).await],
            Task::TransferThenPurchase => {
                let transfer = self.transfer(user, rng).await;
                let purchase = self.purchase(user, rng).await;
                vec![transfer, purchase]
            }
            Task::CheckBalance => vec![self.inquire(user).await],
        };

        executions.iter().filter(|e| e.issued()).count()
    }

    async fn execute(&self, kind: ActionKind, request: ApiRequest) -> Execution {
        match self.call(kind, request).await {
            Some(response) => Execution::Responded(classify_status(response.status)),
            None => Execution::TransportFailed,
        }
    }

    /// Issue a request and emit its outcome event.
    async fn call(&self, kind: ActionKind, request: ApiRequest) -> Option<ApiResponse> {
        let start = Instant::now();

        match self.transport.execute(request).await {
            Ok(response) => {
                self.emit(OutcomeEvent::from_status(
                    kind,
                    response.status,
                    response.latency,
                ));
                Some(response)
            }
            Err(e) => {
                debug!(action = %kind, error = %e, "Request failed");
                self.emit(OutcomeEvent::transport_failure(kind, start.elapsed()));
                None
            }
        }
    }

    fn emit(&self, event: OutcomeEvent) {
        if self.events.send(event).is_err() {
            trace!("Outcome receiver dropped");
        }
    }
}
