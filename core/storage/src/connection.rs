//! Connection reuse for session-based backends.
//!
//! FTP and SFTP drivers pay a login round trip per connection. Wrapping the
//! session in an [`IdleConnection`] keeps it open across a burst of calls and
//! closes it once the backend has been idle for the grace period.

use async_trait::async_trait;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, warn};

use filestorage_common::Result;

/// Default time a connection stays open after the last call finished.
pub const DEFAULT_IDLE_GRACE: Duration = Duration::from_millis(500);

/// Opens and closes backend sessions.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Session handle.
    type Conn: Send + Sync + 'static;

    /// Open a new session.
    async fn connect(&self) -> Result<Self::Conn>;

    /// Close a session.
    async fn disconnect(&self, conn: &Self::Conn) -> Result<()>;
}

struct State<T> {
    conn: Option<Arc<T>>,
    /// Calls currently running on `conn`.
    leases: usize,
    /// Bumped on every call; a scheduled teardown only fires if it still
    /// matches the value it captured.
    generation: u64,
}

struct Shared<C: Connector> {
    connector: C,
    grace: Duration,
    /// Never held across an await.
    state: Mutex<State<C::Conn>>,
    /// Serializes session opening so concurrent first calls share one login.
    connecting: tokio::sync::Mutex<()>,
}

impl<C: Connector> Shared<C> {
    fn state(&self) -> MutexGuard<'_, State<C::Conn>> {
        // The state is plain counters; a panic elsewhere cannot leave it torn.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A running call. Dropping it releases the session, whether the call
/// returned, panicked or was cancelled.
struct Lease<C: Connector> {
    shared: Arc<Shared<C>>,
    conn: Arc<C::Conn>,
}

impl<C: Connector> Drop for Lease<C> {
    fn drop(&mut self) {
        let generation = {
            let mut state = self.shared.state();
            state.leases = state.leases.saturating_sub(1);
            if state.leases > 0 {
                return;
            }
            state.generation
        };

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(teardown(self.shared.clone(), generation));
            }
            Err(_) => debug!("no runtime to schedule idle teardown on"),
        }
    }
}

/// Close the session once the grace period passed without a new call.
async fn teardown<C: Connector>(shared: Arc<Shared<C>>, generation: u64) {
    tokio::time::sleep(shared.grace).await;

    let conn = {
        let mut state = shared.state();
        if state.leases > 0 || state.generation != generation {
            return;
        }
        state.conn.take()
    };

    if let Some(conn) = conn {
        debug!("closing idle backend connection");
        if let Err(e) = shared.connector.disconnect(&conn).await {
            warn!(error = %e, "failed to close idle connection");
        }
    }
}

/// A lazily opened connection that closes itself after an idle period.
pub struct IdleConnection<C: Connector> {
    shared: Arc<Shared<C>>,
}

impl<C: Connector> Clone for IdleConnection<C> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<C: Connector> IdleConnection<C> {
    /// Keeper with the default grace period.
    pub fn new(connector: C) -> Self {
        Self::with_grace(connector, DEFAULT_IDLE_GRACE)
    }

    /// Keeper with a custom grace period.
    pub fn with_grace(connector: C, grace: Duration) -> Self {
        Self {
            shared: Arc::new(Shared {
                connector,
                grace,
                state: Mutex::new(State {
                    conn: None,
                    leases: 0,
                    generation: 0,
                }),
                connecting: tokio::sync::Mutex::new(()),
            }),
        }
    }

    /// The wrapped connector.
    pub fn connector(&self) -> &C {
        &self.shared.connector
    }

    /// Whether a session is currently open.
    pub fn is_connected(&self) -> bool {
        self.shared.state().conn.is_some()
    }

    /// Run `op` on the session, opening it first if needed.
    ///
    /// # Postconditions
    /// - The session stays open while any call is running
    /// - Once the last running call finishes, the session is closed after
    ///   the grace period unless another call starts in the meantime
    /// - A call that panics or whose future is dropped counts as finished
    ///
    /// # Errors
    /// - Connection failures, and whatever `op` returns
    pub async fn with_connection<F, Fut, T>(&self, op: F) -> Result<T>
    where
        F: FnOnce(Arc<C::Conn>) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let lease = self.acquire().await?;
        op(lease.conn.clone()).await
    }

    /// Close the session now, regardless of pending calls' grace periods.
    pub async fn close(&self) -> Result<()> {
        let conn = {
            let mut state = self.shared.state();
            state.generation += 1;
            state.conn.take()
        };

        match conn {
            Some(conn) => self.shared.connector.disconnect(&conn).await,
            None => Ok(()),
        }
    }

    async fn acquire(&self) -> Result<Lease<C>> {
        let _connecting = self.shared.connecting.lock().await;

        if let Some(lease) = self.lease_open() {
            return Ok(lease);
        }

        debug!("opening backend connection");
        let conn = Arc::new(self.shared.connector.connect().await?);

        let mut state = self.shared.state();
        state.generation += 1;
        state.leases += 1;
        state.conn = Some(conn.clone());

        Ok(Lease {
            shared: self.shared.clone(),
            conn,
        })
    }

    /// Lease the open session, if there is one.
    fn lease_open(&self) -> Option<Lease<C>> {
        let mut state = self.shared.state();
        let conn = state.conn.clone()?;
        state.generation += 1;
        state.leases += 1;

        Some(Lease {
            shared: self.shared.clone(),
            conn,
        })
    }
}
