//! Pipeline connection manager.
//!
//! [`Connector`] performs a single dial or close. [`ReadLoop`] owns the live
//! socket and the backoff state, reads frames, and runs the reconnect state
//! machine until the shutdown token fires or a fatal dial error stops it.

use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use reqwest::Url;
use tokio::net::TcpStream;
use tokio::time::sleep;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::header::{HeaderValue, USER_AGENT};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use vrc_core::config::{AuthFailurePolicy, StreamConfig};
use vrc_core::constants::AUTH_TOKEN_PARAM;

use crate::backoff::Backoff;
use crate::dispatcher::Dispatcher;
use crate::error::{DialError, StreamError};
use crate::events::decode_envelope;
use crate::state::{ConnectionState, StateCell};

/// A live pipeline socket.
pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Dials and closes pipeline sockets.
#[derive(Debug, Clone)]
pub struct Connector {
    endpoint: String,
    user_agent: String,
    timeout: Duration,
}

impl Connector {
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            endpoint: config.endpoint.clone(),
            user_agent: config.user_agent.clone(),
            timeout: config.connect_timeout(),
        }
    }

    /// Endpoint URL with the session token attached.
    pub fn stream_url(&self, token: &str) -> Result<Url, DialError> {
        let mut url = Url::parse(&self.endpoint)
            .map_err(|e| DialError::InvalidEndpoint(format!("{}: {e}", self.endpoint)))?;
        if !matches!(url.scheme(), "ws" | "wss") {
            return Err(DialError::InvalidEndpoint(format!(
                "unsupported scheme {}",
                url.scheme()
            )));
        }
        url.query_pairs_mut().append_pair(AUTH_TOKEN_PARAM, token);
        Ok(url)
    }

    /// Open a socket authenticated with `token`.
    pub async fn dial(&self, token: &str) -> Result<WsStream, DialError> {
        let url = self.stream_url(token)?;
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| DialError::InvalidEndpoint(e.to_string()))?;
        let agent = HeaderValue::from_str(&self.user_agent)
            .map_err(|e| DialError::InvalidEndpoint(format!("user agent: {e}")))?;
        request.headers_mut().insert(USER_AGENT, agent);

        debug!("dialing {}", self.endpoint);
        match tokio::time::timeout(self.timeout, connect_async(request)).await {
            Ok(Ok((ws, _response))) => Ok(ws),
            Ok(Err(e)) => Err(classify(e)),
            Err(_) => Err(DialError::Timeout),
        }
    }

    /// Send a normal close frame.
    pub async fn close(&self, ws: &mut WsStream) -> Result<(), StreamError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client closing".into(),
        };
        match tokio::time::timeout(self.timeout, ws.close(Some(frame))).await {
            Ok(Ok(())) | Ok(Err(WsError::ConnectionClosed)) => Ok(()),
            Ok(Err(e)) => Err(StreamError::Close(e.to_string())),
            Err(_) => Err(StreamError::Close("timed out".into())),
        }
    }
}

fn classify(e: WsError) -> DialError {
    match e {
        WsError::Http(response) => {
            let status = response.status().as_u16();
            if status == 401 || status == 403 {
                DialError::Unauthorized { status }
            } else {
                DialError::Rejected { status }
            }
        }
        WsError::Url(e) => DialError::InvalidEndpoint(e.to_string()),
        WsError::HttpFormat(e) => DialError::InvalidEndpoint(e.to_string()),
        other => DialError::Network(other.to_string()),
    }
}

enum ReadOutcome {
    /// The socket broke or the server closed it.
    Lost,
    /// Shutdown was requested; the close frame has been sent.
    Shutdown,
}

/// Owner of the socket for the lifetime of the client.
pub(crate) struct ReadLoop {
    pub(crate) connector: Connector,
    pub(crate) token: String,
    pub(crate) backoff: Backoff,
    pub(crate) dispatcher: Dispatcher,
    pub(crate) state: Arc<StateCell>,
    pub(crate) shutdown: CancellationToken,
    pub(crate) policy: AuthFailurePolicy,
}

impl ReadLoop {
    /// Read from `socket`, reconnecting as needed, until shutdown or a fatal
    /// dial error. Always publishes `Closed` on the way out.
    pub(crate) async fn run(mut self, socket: WsStream) {
        let mut socket = Some(socket);
        loop {
            let ws = match socket.take() {
                Some(ws) => ws,
                None => match self.reconnect().await {
                    Some(ws) => ws,
                    None => break,
                },
            };

            match self.read(ws).await {
                ReadOutcome::Lost => {
                    self.state.set(ConnectionState::Disconnected);
                }
                ReadOutcome::Shutdown => break,
            }
        }

        debug!("read loop exiting");
        self.state.set(ConnectionState::Closed);
    }

    async fn read(&mut self, mut ws: WsStream) -> ReadOutcome {
        loop {
            let next = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => {
                    if let Err(e) = self.connector.close(&mut ws).await {
                        warn!("{e}");
                        self.state.report(&e);
                    }
                    return ReadOutcome::Shutdown;
                }
                next = ws.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => self.handle_frame(text.as_bytes()).await,
                Some(Ok(Message::Binary(data))) => self.handle_frame(&data).await,
                Some(Ok(Message::Close(frame))) => {
                    match frame {
                        Some(frame) => warn!("server closed the stream: {frame}"),
                        None => warn!("server closed the stream"),
                    }
                    self.state
                        .report(&StreamError::Read("closed by server".into()));
                    return ReadOutcome::Lost;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!("stream read failed: {e}");
                    self.state.report(&StreamError::Read(e.to_string()));
                    return ReadOutcome::Lost;
                }
                None => {
                    warn!("stream ended without a close frame");
                    self.state
                        .report(&StreamError::Read("stream ended".into()));
                    return ReadOutcome::Lost;
                }
            }
        }
    }

    async fn handle_frame(&self, frame: &[u8]) {
        match decode_envelope(frame) {
            Ok(raw) => {
                self.dispatcher.dispatch(raw).await;
            }
            Err(e) => {
                debug!("dropping frame: {e}");
                self.state.report(&StreamError::Decode(e));
            }
        }
    }

    /// Wait out the backoff and redial until a socket is open. Returns `None`
    /// on shutdown or when a fatal dial error ends the stream.
    async fn reconnect(&mut self) -> Option<WsStream> {
        loop {
            let delay = self.backoff.delay();
            info!("reconnecting in {:.1}s", delay.as_secs_f64());
            tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                _ = sleep(delay) => {}
            }

            self.state.set(ConnectionState::Connecting);
            let result = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return None,
                result = self.connector.dial(&self.token) => result,
            };

            match result {
                Ok(ws) => {
                    self.backoff.reset();
                    self.state.set(ConnectionState::Connected);
                    return Some(ws);
                }
                Err(e) => {
                    warn!("reconnect failed: {e}");
                    let stop = self.stops_on(&e);
                    self.state.report(&StreamError::Dial(e));
                    if stop {
                        error!("giving up on the stream");
                        return None;
                    }
                    self.state.set(ConnectionState::Disconnected);
                    self.backoff.record_failure();
                }
            }
        }
    }

    fn stops_on(&self, e: &DialError) -> bool {
        match e {
            DialError::InvalidEndpoint(_) => true,
            DialError::Unauthorized { .. } => self.policy == AuthFailurePolicy::Stop,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connector(endpoint: &str) -> Connector {
        Connector::new(&StreamConfig {
            endpoint: endpoint.into(),
            ..Default::default()
        })
    }

    #[test]
    fn test_stream_url_carries_token() {
        let url = connector("wss://pipeline.vrchat.cloud/")
            .stream_url("authcookie_abc")
            .unwrap();
        assert_eq!(url.as_str(), "wss://pipeline.vrchat.cloud/?authToken=authcookie_abc");
    }

    #[test]
    fn test_stream_url_encodes_and_keeps_query() {
        let url = connector("ws://127.0.0.1:9000/stream?v=2")
            .stream_url("a b&c")
            .unwrap();
        assert_eq!(url.as_str(), "ws://127.0.0.1:9000/stream?v=2&authToken=a+b%26c");
    }

    #[test]
    fn test_stream_url_rejects_bad_endpoints() {
        assert!(matches!(
            connector("not a url").stream_url("t"),
            Err(DialError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            connector("https://pipeline.vrchat.cloud/").stream_url("t"),
            Err(DialError::InvalidEndpoint(_))
        ));
    }

    #[tokio::test]
    async fn test_dial_refused_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = connector(&format!("ws://{addr}/")).dial("t").await.unwrap_err();
        assert!(matches!(err, DialError::Network(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_dial_timeout() {
        // Accepts TCP but never answers the handshake.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let _hold = tokio::spawn(async move {
            let (_socket, _) = listener.accept().await.unwrap();
            sleep(Duration::from_secs(5)).await;
        });

        let connector = Connector::new(&StreamConfig {
            endpoint: format!("ws://{addr}/"),
            connect_timeout_ms: 100,
            ..Default::default()
        });
        assert_eq!(connector.dial("t").await.unwrap_err(), DialError::Timeout);
    }

    #[tokio::test]
    async fn test_invalid_user_agent() {
        let connector = Connector::new(&StreamConfig {
            endpoint: "ws://127.0.0.1:1/".into(),
            user_agent: "bad\nagent".into(),
            ..Default::default()
        });
        let err = connector.dial("t").await.unwrap_err();
        assert!(matches!(err, DialError::InvalidEndpoint(_)));
    }
}
