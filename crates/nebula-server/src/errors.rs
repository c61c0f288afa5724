//! Server errors.

use std::net::SocketAddr;

/// Failures starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Binding the listener failed.
    #[error("failed to bind {address}: {source}")]
    Bind {
        /// Address we tried to bind.
        address: String,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// The listener's local address could not be read.
    #[error("failed to read local address: {0}")]
    LocalAddr(#[source] std::io::Error),

    /// Another `listen` call on this server is still binding.
    #[error("server is already binding its listener")]
    ListenInProgress,

    /// `listen` was called on a server that is already running.
    #[error("server already listening on {0}")]
    AlreadyListening(SocketAddr),

    /// The global metrics recorder could not be installed.
    #[error("failed to install metrics recorder: {0}")]
    Metrics(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bind_message_includes_address() {
        let err = ServerError::Bind {
            address: "127.0.0.1:1".into(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("127.0.0.1:1"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn already_listening_message() {
        let addr: SocketAddr = "127.0.0.1:8765".parse().unwrap();
        assert_eq!(
            ServerError::AlreadyListening(addr).to_string(),
            "server already listening on 127.0.0.1:8765"
        );
    }
}
