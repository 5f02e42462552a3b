use std::{convert::Infallible, sync::Arc};

use async_trait::async_trait;
use bytes::Bytes;
use http_body_util::Empty;
use hyper::{
    Request, StatusCode,
    header::{AUTHORIZATION, CONNECTION, HOST, UPGRADE},
    service::service_fn,
};
use hyper_util::rt::TokioIo;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, info};

use crate::config::SessionConfig;

use super::{SessionError, TunnelEngine, proxy};

/// protocol name sent in the Upgrade header during the handshake
pub(crate) const UPGRADE_PROTOCOL: &str = "backhaul";

/// Default engine: dials the tunnel server, upgrades the connection and
/// serves the requests the server pushes down it, forwarding each one to the
/// upstream its host routes to.
pub(crate) struct HttpTunnelEngine {
    tls: TlsConnector,
}

impl HttpTunnelEngine {
    pub fn new() -> Self {
        HttpTunnelEngine {
            tls: tls_connector(),
        }
    }
}

pub(super) fn tls_connector() -> TlsConnector {
    let mut roots = rustls::RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());
    let config = rustls::ClientConfig::builder()
        .with_root_certificates(roots)
        .with_no_client_auth();
    TlsConnector::from(Arc::new(config))
}

#[async_trait]
impl TunnelEngine for HttpTunnelEngine {
    async fn run_session(&self, config: &SessionConfig) -> Result<(), SessionError> {
        let stream = TcpStream::connect(&config.remote).await?;
        let (mut sender, conn) =
            hyper::client::conn::http1::handshake(TokioIo::new(stream)).await?;
        tokio::spawn(async move {
            if let Err(err) = conn.with_upgrades().await {
                debug!("control connection closed: {err}");
            }
        });

        let mut request = Request::builder()
            .uri("/tunnel")
            .header(HOST, config.remote.as_str())
            .header(CONNECTION, "upgrade")
            .header(UPGRADE, UPGRADE_PROTOCOL);
        if !config.token.is_empty() {
            request = request.header(AUTHORIZATION, format!("Bearer {}", config.token));
        }
        let response = sender
            .send_request(request.body(Empty::<Bytes>::new())?)
            .await?;
        if response.status() != StatusCode::SWITCHING_PROTOCOLS {
            return Err(SessionError::Rejected(response.status()));
        }
        let upgraded = hyper::upgrade::on(response).await?;
        info!("session established with {}", config.remote);

        let tls = self.tls.clone();
        let routes = config.routes.clone();
        let strict = config.strict_forwarding;
        let service = service_fn(move |req| {
            let tls = tls.clone();
            let routes = routes.clone();
            async move { Ok::<_, Infallible>(proxy::forward(req, &tls, &routes, strict).await) }
        });
        hyper::server::conn::http1::Builder::new()
            .serve_connection(upgraded, service)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::TcpListener,
    };

    use super::*;
    use crate::upstream::RouteTable;

    fn session_config(remote: String) -> SessionConfig {
        SessionConfig {
            remote,
            routes: RouteTable::parse("http://127.0.0.1:3000"),
            token: String::from("secret"),
            strict_forwarding: true,
        }
    }

    #[tokio::test]
    async fn rejected_handshake_is_fatal_and_keeps_the_status() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 2048];
            let _ = socket.read(&mut buf).await;
            socket
                .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
        });

        let engine = HttpTunnelEngine::new();
        let err = engine
            .run_session(&session_config(addr.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Rejected(StatusCode::FORBIDDEN)));
    }

    #[tokio::test]
    async fn handshake_carries_the_bearer_token() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 2048];
            let n = socket.read(&mut buf).await.unwrap();
            socket
                .write_all(b"HTTP/1.1 403 Forbidden\r\ncontent-length: 0\r\n\r\n")
                .await
                .unwrap();
            String::from_utf8_lossy(&buf[..n]).to_lowercase()
        });

        let engine = HttpTunnelEngine::new();
        let _ = engine.run_session(&session_config(addr.to_string())).await;
        let handshake = server.await.unwrap();
        assert!(handshake.contains("authorization: bearer secret"));
        assert!(handshake.contains("upgrade: backhaul"));
    }

    #[tokio::test]
    async fn unreachable_remote_surfaces_an_io_error() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let engine = HttpTunnelEngine::new();
        let err = engine
            .run_session(&session_config(addr.to_string()))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::Io(_, _)));
    }
}
