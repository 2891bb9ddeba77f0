//! Shared test utilities for stream integration tests.
//!
//! [`MockPipeline`] is an in-process WebSocket server that records every
//! handshake, can refuse handshakes with a chosen HTTP status, and hands each
//! accepted connection to the test as a [`ServerConn`].

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{header::USER_AGENT, StatusCode};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_hdr_async, WebSocketStream};

use vrc_core::config::StreamConfig;
use vrc_socket::{ConnectionState, StreamError, StreamObserver};

/// Upper bound for anything a test waits on.
pub const WAIT: Duration = Duration::from_secs(5);

/// What the server saw on one opening handshake.
#[derive(Debug, Clone)]
pub struct Handshake {
    pub uri: String,
    pub user_agent: Option<String>,
    pub at: Instant,
}

/// In-process pipeline server.
pub struct MockPipeline {
    pub addr: SocketAddr,
    handshakes: Arc<Mutex<Vec<Handshake>>>,
    reject_status: Arc<AtomicU16>,
    conns: mpsc::UnboundedReceiver<ServerConn>,
}

impl MockPipeline {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind mock pipeline");
        let addr = listener.local_addr().expect("mock pipeline has no address");
        let handshakes = Arc::new(Mutex::new(Vec::new()));
        let reject_status = Arc::new(AtomicU16::new(0));
        let (tx, conns) = mpsc::unbounded_channel();

        let seen = handshakes.clone();
        let reject = reject_status.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let seen = seen.clone();
                let status = reject.load(Ordering::SeqCst);
                let tx = tx.clone();
                tokio::spawn(async move {
                    if let Some(ws) = handshake(stream, seen, status).await {
                        let _ = tx.send(ServerConn { ws });
                    }
                });
            }
        });

        Self {
            addr,
            handshakes,
            reject_status,
            conns,
        }
    }

    /// Refuse all following handshakes with `status`.
    pub fn reject_with(&self, status: u16) {
        self.reject_status.store(status, Ordering::SeqCst);
    }

    pub fn accept_all(&self) {
        self.reject_status.store(0, Ordering::SeqCst);
    }

    pub fn handshakes(&self) -> Vec<Handshake> {
        self.handshakes.lock().clone()
    }

    pub fn handshake_count(&self) -> usize {
        self.handshakes.lock().len()
    }

    /// Poll until at least `n` handshakes have been seen.
    pub async fn wait_for_handshakes(&self, n: usize) {
        let deadline = Instant::now() + WAIT;
        while self.handshake_count() < n {
            assert!(Instant::now() < deadline, "only {} handshakes arrived", self.handshake_count());
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Time between consecutive handshakes.
    pub fn handshake_gaps(&self) -> Vec<Duration> {
        self.handshakes
            .lock()
            .windows(2)
            .map(|pair| pair[1].at.duration_since(pair[0].at))
            .collect()
    }

    /// Next accepted connection.
    pub async fn next_connection(&mut self) -> ServerConn {
        tokio::time::timeout(WAIT, self.conns.recv())
            .await
            .expect("no connection arrived in time")
            .expect("mock pipeline stopped")
    }

    /// Stream config pointing at this server with short delays.
    pub fn config(&self) -> StreamConfig {
        StreamConfig {
            endpoint: format!("ws://{}/", self.addr),
            user_agent: "vrc-socket-tests/1.0".into(),
            base_delay_ms: 50,
            max_delay_ms: 200,
            connect_timeout_ms: 2_000,
            dispatch_workers: 4,
            dispatch_queue_capacity: 64,
            dispatch_timeout_ms: 500,
            ..Default::default()
        }
    }
}

async fn handshake(
    stream: TcpStream,
    seen: Arc<Mutex<Vec<Handshake>>>,
    reject_status: u16,
) -> Option<WebSocketStream<TcpStream>> {
    let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        seen.lock().push(Handshake {
            uri: req.uri().to_string(),
            user_agent: req
                .headers()
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            at: Instant::now(),
        });
        if reject_status != 0 {
            let mut err = ErrorResponse::new(Some("rejected".into()));
            *err.status_mut() =
                StatusCode::from_u16(reject_status).expect("invalid reject status");
            return Err(err);
        }
        Ok(resp)
    };
    accept_hdr_async(stream, callback).await.ok()
}

/// Server side of one accepted connection.
pub struct ServerConn {
    ws: WebSocketStream<TcpStream>,
}

impl ServerConn {
    /// Send a raw text frame.
    pub async fn send_frame(&mut self, frame: &str) {
        self.ws
            .send(Message::Text(frame.to_string()))
            .await
            .expect("failed to send frame");
    }

    /// Send a well-formed envelope with `payload` encoded into `content`.
    pub async fn send_event(&mut self, tag: &str, payload: serde_json::Value) {
        let frame = serde_json::json!({
            "type": tag,
            "content": payload.to_string(),
        });
        self.send_frame(&frame.to_string()).await;
    }

    /// Read until the client's close frame and return its code.
    pub async fn expect_close(&mut self) -> Option<u16> {
        let read = async {
            while let Some(msg) = self.ws.next().await {
                match msg {
                    Ok(Message::Close(frame)) => return frame.map(|f| u16::from(f.code)),
                    Ok(_) => continue,
                    Err(_) => return None,
                }
            }
            None
        };
        tokio::time::timeout(WAIT, read)
            .await
            .expect("client never sent a close frame")
    }
}

/// Observer that records everything it is told.
#[derive(Default)]
pub struct Recorder {
    pub states: Mutex<Vec<ConnectionState>>,
    pub errors: Mutex<Vec<String>>,
}

impl Recorder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn saw_state(&self, state: ConnectionState) -> bool {
        self.states.lock().contains(&state)
    }

    pub fn error_count(&self, needle: &str) -> usize {
        self.errors.lock().iter().filter(|e| e.contains(needle)).count()
    }
}

impl StreamObserver for Recorder {
    fn on_state_change(&self, state: ConnectionState) {
        self.states.lock().push(state);
    }

    fn on_error(&self, error: &StreamError) {
        self.errors.lock().push(error.to_string());
    }
}

/// Wait until the watched state equals `target`.
pub async fn wait_for_state(rx: &mut watch::Receiver<ConnectionState>, target: ConnectionState) {
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == target))
        .await
        .unwrap_or_else(|_| panic!("state never became {target}"))
        .expect("state channel closed");
}

/// Receive the next delivery from a callback channel.
pub async fn next_delivery<T>(rx: &mut mpsc::UnboundedReceiver<T>) -> T {
    tokio::time::timeout(WAIT, rx.recv())
        .await
        .expect("no delivery in time")
        .expect("delivery channel closed")
}

/// Assert nothing arrives on `rx` for a short while.
pub async fn assert_no_delivery<T: std::fmt::Debug>(rx: &mut mpsc::UnboundedReceiver<T>) {
    tokio::time::sleep(Duration::from_millis(150)).await;
    if let Ok(item) = rx.try_recv() {
        panic!("unexpected delivery: {item:?}");
    }
}
