use async_trait::async_trait;
use hyper::StatusCode;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use crate::config::SessionConfig;

pub(crate) mod driver;
pub(crate) mod http_engine;
mod proxy;

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("io error: {1}")]
    Io(std::io::Error, String),
    #[error("http error: {1}")]
    Http(hyper::Error, String),
    #[error("invalid session request: {0}")]
    Request(hyper::http::Error),
    #[error("tunnel server rejected the session: {0}")]
    Rejected(StatusCode),
}

impl From<std::io::Error> for SessionError {
    fn from(value: std::io::Error) -> Self {
        let str_val = value.to_string();
        Self::Io(value, str_val)
    }
}
impl From<hyper::Error> for SessionError {
    fn from(value: hyper::Error) -> Self {
        let str_val = value.to_string();
        Self::Http(value, str_val)
    }
}
impl From<hyper::http::Error> for SessionError {
    fn from(value: hyper::http::Error) -> Self {
        Self::Request(value)
    }
}

/// One session = one connect-and-forward run against the tunnel server.
/// `Ok(())` means the session ended cleanly and the caller may start another;
/// any `Err` is fatal to the process. Reconnect policy, if an implementation
/// wants one, lives behind this trait.
#[cfg_attr(test, automock)]
#[async_trait]
pub(crate) trait TunnelEngine: Send + Sync {
    async fn run_session(&self, config: &SessionConfig) -> Result<(), SessionError>;
}
