//! `Gateway` builder and session engine.
//!
//! This is the entry point for running the BBS. It ties together all the
//! layers: transport → protocol → session → mailbox/groups.
//!
//! ```text
//! Disconnected ──► Connecting ──► LoggedIn ──► Closing ──► Disconnected
//!                  (login line)   (receive loop,   (stop timers,
//!                                  retry timer,     close transport,
//!                                  beacon)          abandon pending)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use aprsbbs_groups::GroupRegistry;
use aprsbbs_mailbox::Mailbox;
use aprsbbs_protocol::{Frame, FrameCodec, Identity, LoginLine, encode};
use aprsbbs_session::{AckConfig, AckTracker, DuplicateFilter, Lifecycle, SessionState};
use aprsbbs_transport::{Connection, TcpConnection};
use chrono::Utc;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};

use crate::beacon::{build_beacon, run_beacon};
use crate::context::SessionContext;
use crate::handler::receive_loop;
use crate::retry::run_retry_timer;
use crate::{BbsError, BeaconConfig, GatewayConfig, Outbox};

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection (EOF).
    ServerClosed,
    /// A read or write failed.
    TransportFailed,
    /// [`ShutdownHandle::shutdown`] was called.
    Shutdown,
}

/// What one call to [`Gateway::run_session`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSummary {
    pub end: SessionEnd,
    pub lines_received: u64,
    /// Tracked messages still unacknowledged when the session closed.
    pub abandoned: usize,
    /// Tracked messages given up on after their last retry.
    pub failed_deliveries: usize,
}

/// Requests a graceful stop of the running session, from any task.
///
/// The request is sticky: sessions started afterwards end right after
/// login.
#[derive(Clone)]
pub struct ShutdownHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_shutdown(&self) -> bool {
        *self.tx.borrow()
    }

    /// Resolves once shutdown has been requested.
    pub async fn wait(&self) {
        let mut rx = self.tx.subscribe();
        let _ = rx.wait_for(|requested| *requested).await;
    }
}

/// Builder for configuring a [`Gateway`].
///
/// # Example
///
/// ```rust,no_run
/// use aprsbbs::prelude::*;
///
/// # async fn demo() -> Result<(), BbsError> {
/// let gateway = Gateway::builder(Identity::new("N0CALL-10")?)
///     .database("bbs.sqlite3")
///     .build()?;
/// gateway.run().await?;
/// # Ok(())
/// # }
/// ```
pub struct GatewayBuilder {
    config: GatewayConfig,
    mailbox: Option<Mailbox>,
}

impl GatewayBuilder {
    /// Creates a builder with default settings for `identity`.
    pub fn new(identity: Identity) -> Self {
        Self::from_config(GatewayConfig::new(identity))
    }

    /// Starts from a complete configuration, e.g. one read from a file.
    pub fn from_config(config: GatewayConfig) -> Self {
        Self {
            config,
            mailbox: None,
        }
    }

    /// Sets the APRS-IS server.
    pub fn server(mut self, host: &str, port: u16) -> Self {
        self.config.host = host.to_string();
        self.config.port = port;
        self
    }

    pub fn passcode(mut self, passcode: i32) -> Self {
        self.config.passcode = Some(passcode);
        self
    }

    pub fn filter(mut self, filter: &str) -> Self {
        self.config.filter = Some(filter.to_string());
        self
    }

    /// Persists the mailbox in the SQLite file at `path`.
    pub fn database(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = Some(path.into());
        self
    }

    pub fn ack_config(mut self, ack: AckConfig) -> Self {
        self.config.ack = ack;
        self
    }

    pub fn beacon(mut self, beacon: BeaconConfig) -> Self {
        self.config.beacon = Some(beacon);
        self
    }

    pub fn duplicate_window(mut self, window: Duration) -> Self {
        self.config.duplicate_window_secs = window.as_secs();
        self
    }

    /// Uses an already opened mailbox instead of `database_path`.
    pub fn mailbox(mut self, mailbox: Mailbox) -> Self {
        self.mailbox = Some(mailbox);
        self
    }

    /// Validates the configuration and opens the mailbox.
    pub fn build(self) -> Result<Gateway, BbsError> {
        let config = self.config;

        let login = login_line(&config);
        encode(&Frame::Login(login))
            .map_err(|e| BbsError::Config(format!("login line: {e}")))?;
        if let Some(beacon) = &config.beacon {
            build_beacon(&config.identity, beacon, Utc::now())
                .map_err(|e| BbsError::Config(format!("beacon: {e}")))?;
        }

        let mailbox = match (self.mailbox, &config.database_path) {
            (Some(mailbox), _) => mailbox,
            (None, Some(path)) => Mailbox::open(path)?,
            (None, None) => Mailbox::in_memory(),
        };
        if !mailbox.is_durable() {
            info!("mailbox is memory-only, messages are lost on restart");
        }

        let (shutdown, _) = watch::channel(false);
        Ok(Gateway {
            config,
            mailbox: Arc::new(Mutex::new(mailbox)),
            groups: Arc::new(Mutex::new(GroupRegistry::new())),
            shutdown: Arc::new(shutdown),
        })
    }
}

fn login_line(config: &GatewayConfig) -> LoginLine {
    let mut login = LoginLine::new(
        config.identity.clone(),
        config.software.as_str(),
        config.version.as_str(),
    );
    login.passcode = config.effective_passcode();
    login.filter = Some(config.effective_filter());
    login
}

/// The BBS gateway.
///
/// Owns the state that survives reconnects: the mailbox and the group
/// registry. Each call to [`run_session`](Self::run_session) gets a
/// fresh ack tracker and duplicate filter.
pub struct Gateway {
    config: GatewayConfig,
    mailbox: Arc<Mutex<Mailbox>>,
    groups: Arc<Mutex<GroupRegistry>>,
    shutdown: Arc<watch::Sender<bool>>,
}

impl Gateway {
    /// Creates a new builder.
    pub fn builder(identity: Identity) -> GatewayBuilder {
        GatewayBuilder::new(identity)
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn identity(&self) -> &Identity {
        &self.config.identity
    }

    /// Shared handle to the mailbox.
    pub fn mailbox(&self) -> Arc<Mutex<Mailbox>> {
        Arc::clone(&self.mailbox)
    }

    /// Shared handle to the group registry.
    pub fn groups(&self) -> Arc<Mutex<GroupRegistry>> {
        Arc::clone(&self.groups)
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle {
            tx: Arc::clone(&self.shutdown),
        }
    }

    /// The login line this gateway sends.
    pub fn login_line(&self) -> LoginLine {
        login_line(&self.config)
    }

    /// Opens a TCP connection to the configured server.
    pub async fn connect(&self) -> Result<TcpConnection, BbsError> {
        Ok(TcpConnection::connect(&self.config.host, self.config.port).await?)
    }

    /// Connects and runs one session to completion.
    pub async fn run(&self) -> Result<SessionSummary, BbsError> {
        let conn = self.connect().await?;
        self.run_session(conn).await
    }

    /// Runs one session over an established connection.
    ///
    /// Returns when the server hangs up, the transport fails or shutdown
    /// is requested. Only a failed login write is returned as an error;
    /// everything after login ends in a [`SessionSummary`].
    pub async fn run_session<C: Connection>(&self, conn: C) -> Result<SessionSummary, BbsError> {
        let identity = self.config.identity.clone();
        let conn = Arc::new(conn);
        let conn_id = conn.id();
        let mut lifecycle = Lifecycle::new();

        // --- Connecting: login ---
        lifecycle.advance(SessionState::Connecting)?;
        let login = encode(&Frame::Login(self.login_line()))?;
        if let Err(e) = conn.send_line(&login).await {
            warn!(%identity, %conn_id, error = %e, "login failed");
            lifecycle.advance(SessionState::Closing)?;
            if let Err(e) = conn.close().await {
                debug!(error = %e, "close after failed login");
            }
            lifecycle.advance(SessionState::Disconnected)?;
            return Err(e.into());
        }
        lifecycle.advance(SessionState::LoggedIn)?;
        info!(%identity, %conn_id, "logged in");

        // --- LoggedIn: timers + receive loop ---
        let tracker = AckTracker::new(identity.clone(), self.config.ack.clone());
        let outbox = Outbox::new(Arc::clone(&conn), Arc::new(Mutex::new(tracker)));
        let ctx = SessionContext {
            identity: identity.clone(),
            codec: FrameCodec::new(identity.clone()),
            outbox: outbox.clone(),
            mailbox: Arc::clone(&self.mailbox),
            groups: Arc::clone(&self.groups),
            duplicates: Mutex::new(DuplicateFilter::new(self.config.duplicate_window())),
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let retry = tokio::spawn(run_retry_timer(
            outbox.clone(),
            self.config.ack.scan_interval(),
            stop_rx.clone(),
        ));
        let beacon = tokio::spawn(run_beacon(
            outbox.clone(),
            identity.clone(),
            self.config.beacon.clone(),
            stop_rx,
        ));

        let mut lines_received = 0;
        let end = receive_loop(&ctx, self.shutdown.subscribe(), &mut lines_received).await;

        // --- Closing: stop timers, close, abandon ---
        lifecycle.advance(SessionState::Closing)?;
        stop_tx.send_replace(true);
        let failed_deliveries = retry.await.unwrap_or_else(|e| {
            warn!(timer = "retry", error = %e, "timer task failed");
            0
        });
        if let Err(e) = beacon.await {
            warn!(timer = "beacon", error = %e, "timer task failed");
        }
        if let Err(e) = conn.close().await {
            debug!(error = %e, "close failed");
        }
        let abandoned = outbox.abandon_all().await;
        if abandoned > 0 {
            warn!(%identity, abandoned, "unacknowledged messages abandoned at shutdown");
        }
        lifecycle.advance(SessionState::Disconnected)?;

        info!(
            %identity,
            %conn_id,
            ?end,
            lines_received,
            failed_deliveries,
            "session ended"
        );
        Ok(SessionSummary {
            end,
            lines_received,
            abandoned,
            failed_deliveries,
        })
    }
}
