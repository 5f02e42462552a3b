use std::fmt::Display;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::{
    Request, Response, StatusCode, Uri,
    body::Body,
    header::HOST,
};
use hyper_util::rt::TokioIo;
use rustls::pki_types::ServerName;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::{debug, warn};

use crate::upstream::RouteTable;

#[derive(Error, Debug)]
pub(super) enum ProxyError {
    #[error("invalid upstream url: {0}")]
    InvalidUpstream(String),
    #[error("io error: {1}")]
    Io(std::io::Error, String),
    #[error("http error: {1}")]
    Http(hyper::Error, String),
    #[error("invalid upstream request: {0}")]
    Request(hyper::http::Error),
    #[error("request body could not be read: {0}")]
    BodyRead(String),
    #[error("invalid tls server name: {0}")]
    ServerName(String),
}

impl From<std::io::Error> for ProxyError {
    fn from(value: std::io::Error) -> Self {
        let str_val = value.to_string();
        Self::Io(value, str_val)
    }
}
impl From<hyper::Error> for ProxyError {
    fn from(value: hyper::Error) -> Self {
        let str_val = value.to_string();
        Self::Http(value, str_val)
    }
}
impl From<hyper::http::Error> for ProxyError {
    fn from(value: hyper::http::Error) -> Self {
        Self::Request(value)
    }
}

/// Forwards one tunneled request to the upstream its host routes to.
/// Upstream trouble never ends the session: it turns into a 404/502 response
/// that travels back through the tunnel instead.
pub(super) async fn forward<B>(
    req: Request<B>,
    tls: &TlsConnector,
    routes: &RouteTable,
    strict: bool,
) -> Response<Full<Bytes>>
where
    B: Body,
    B::Error: Display,
{
    let host = req
        .headers()
        .get(HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let target = match routes.route_for(&host) {
        Some(url) => url.to_string(),
        None if strict || host.is_empty() => {
            debug!("no upstream configured for host {host:?}");
            return text_response(
                StatusCode::NOT_FOUND,
                "no upstream configured for this host",
            );
        }
        // strict forwarding off: take the requested host at face value
        None => format!("http://{host}"),
    };
    match proxy_request(req, tls, &target).await {
        Ok(response) => response,
        Err(err) => {
            warn!("failed to reach upstream {target}: {err}");
            text_response(StatusCode::BAD_GATEWAY, "upstream unreachable")
        }
    }
}

async fn proxy_request<B>(
    req: Request<B>,
    tls: &TlsConnector,
    target: &str,
) -> Result<Response<Full<Bytes>>, ProxyError>
where
    B: Body,
    B::Error: Display,
{
    let target_uri: Uri = target
        .parse()
        .map_err(|_| ProxyError::InvalidUpstream(target.to_string()))?;
    let authority = target_uri
        .authority()
        .ok_or_else(|| ProxyError::InvalidUpstream(target.to_string()))?
        .clone();
    let https = target_uri.scheme_str() == Some("https");
    let port = authority
        .port_u16()
        .unwrap_or(if https { 443 } else { 80 });

    let (parts, body) = req.into_parts();
    let body = body
        .collect()
        .await
        .map_err(|err| ProxyError::BodyRead(err.to_string()))?
        .to_bytes();

    let path = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or("/");
    let base = target_uri.path().trim_end_matches('/');

    let mut builder = Request::builder()
        .method(parts.method)
        .uri(format!("{base}{path}"));
    for (name, value) in parts.headers.iter() {
        if name != HOST {
            builder = builder.header(name, value);
        }
    }
    let outgoing = builder
        .header(HOST, authority.as_str())
        .body(Full::new(body))?;

    let stream = TcpStream::connect((authority.host(), port)).await?;
    if https {
        let server_name = ServerName::try_from(authority.host().to_string())
            .map_err(|_| ProxyError::ServerName(authority.host().to_string()))?;
        let stream = tls.connect(server_name, stream).await?;
        send(TokioIo::new(stream), outgoing).await
    } else {
        send(TokioIo::new(stream), outgoing).await
    }
}

async fn send<IO>(io: IO, req: Request<Full<Bytes>>) -> Result<Response<Full<Bytes>>, ProxyError>
where
    IO: hyper::rt::Read + hyper::rt::Write + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(io).await?;
    tokio::spawn(async move {
        if let Err(err) = conn.await {
            debug!("upstream connection closed: {err}");
        }
    });
    let response = sender.send_request(req).await?;
    let (parts, body) = response.into_parts();
    let body = body.collect().await?.to_bytes();
    Ok(Response::from_parts(parts, Full::new(body)))
}

fn text_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(message.to_string())));
    *response.status_mut() = status;
    response
}
