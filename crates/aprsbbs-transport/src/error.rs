/// Errors that can occur in the transport layer.
///
/// Every variant is fatal to the current session: the engine moves to
/// `Closing` as soon as one of these surfaces.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Resolving or connecting to the server failed.
    #[error("connect to {addr} failed: {source}")]
    ConnectFailed {
        /// The `host:port` we tried to reach.
        addr: String,
        /// The underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The connect attempt did not finish in time.
    #[error("connect to {0} timed out")]
    Timeout(String),

    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),
}
