//! Request/response correlation over a single MCP stdio connection.
//!
//! The tool server speaks JSON-RPC 2.0 over one pair of pipes, but several
//! tool calls may be in flight at once. [`MessageRouter`] runs a single
//! background reader task that owns the read side exclusively and hands each
//! response to the caller waiting for its `id`:
//!
//! ```text
//! request() ──▶ pending[id] = oneshot ──▶ write frame ──▶ server
//!                                                           │
//! caller ◀── oneshot ◀── pending.remove(id) ◀── reader task ◀┘
//! ```
//!
//! Whoever removes a pending entry first (reader, timeout, cancellation or
//! shutdown) decides the outcome; late responses find no entry and are dropped.
//! A reply that carries a pending id but is not a valid response fails that
//! request with [`McpError::UnexpectedResponse`].

use crate::mcp::error::{McpError, Result};
use crate::mcp::protocol::{
    JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, RpcError, error_codes,
};
use crate::mcp::transport::{MessageKind, classify_message, decode_frame, encode_frame};
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<JsonRpcResponse>>>>>;
type SharedWriter = Arc<Mutex<Option<BufWriter<Box<dyn AsyncWrite + Send + Unpin>>>>>;

/// Demultiplexes responses from one tool server to concurrent callers.
pub struct MessageRouter {
    /// Background reader task handle.
    _reader_handle: JoinHandle<()>,

    /// Request-response correlation (request id -> oneshot sender).
    pending: PendingMap,

    /// Serialized writes. `None` once the router has shut down, which also
    /// closes the server's stdin.
    writer: SharedWriter,

    /// Per-connection request id counter.
    next_id: AtomicU64,

    /// Set by `shutdown()` or when the server's stdout ends.
    closed: Arc<AtomicBool>,

    /// Stops the reader task.
    shutdown: CancellationToken,

    request_timeout: Duration,
}

impl MessageRouter {
    /// Build a router over a byte stream pair and start its reader task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<R, W>(reader: R, writer: W, request_timeout: Duration) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let boxed: Box<dyn AsyncWrite + Send + Unpin> = Box::new(writer);
        let writer: SharedWriter = Arc::new(Mutex::new(Some(BufWriter::new(boxed))));
        let closed = Arc::new(AtomicBool::new(false));
        let shutdown = CancellationToken::new();

        let reader_handle = tokio::spawn(Self::reader_loop(
            BufReader::new(reader),
            Arc::clone(&pending),
            Arc::clone(&writer),
            Arc::clone(&closed),
            shutdown.clone(),
        ));

        Self {
            _reader_handle: reader_handle,
            pending,
            writer,
            next_id: AtomicU64::new(1),
            closed,
            shutdown,
            request_timeout,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    /// Token that fires when the router shuts down.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Number of requests still waiting for a response.
    pub async fn pending_count(&self) -> usize {
        self.pending.lock().await.len()
    }

    /// Background reader loop. Sole owner of the read half.
    ///
    /// Runs until the server closes its stdout, a read fails, or the router
    /// shuts down. On exit the router is marked closed and every pending
    /// sender is dropped, which callers observe as [`McpError::TransportClosed`].
    async fn reader_loop<R>(
        mut reader: BufReader<R>,
        pending: PendingMap,
        writer: SharedWriter,
        closed: Arc<AtomicBool>,
        shutdown: CancellationToken,
    ) where
        R: AsyncRead + Unpin,
    {
        let mut line = Vec::new();

        loop {
            line.clear();
            let read = tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    debug!("Router: reader stopping on shutdown");
                    break;
                }
                read = reader.read_until(b'\n', &mut line) => read,
            };

            match read {
                Ok(0) => {
                    info!("Router: tool server closed its stdout");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Router: read error: {}", e);
                    break;
                }
            }

            let json = match decode_frame(&line) {
                None => continue,
                Some(Ok(json)) => json,
                Some(Err(e)) => {
                    warn!(
                        "Router: skipping malformed frame: {} ({})",
                        e,
                        String::from_utf8_lossy(&line).trim_end()
                    );
                    continue;
                }
            };
            trace!("Router received: {}", json);

            match classify_message(&json) {
                MessageKind::Response { id } => {
                    let response = serde_json::from_value::<JsonRpcResponse>(json).map_err(|e| {
                        warn!("Router: malformed response id={}: {}", id, e);
                        McpError::UnexpectedResponse(format!("malformed response id={}: {}", id, e))
                    });
                    let sender = pending.lock().await.remove(&id);
                    match sender {
                        Some(tx) => {
                            let _ = tx.send(response);
                        }
                        None => {
                            warn!("Router: dropping response for unknown or expired id={}", id);
                        }
                    }
                }
                MessageKind::IncomingRequest => {
                    Self::answer_server_request(json, &writer).await;
                }
                MessageKind::Notification => {
                    let method = json.get("method").and_then(|m| m.as_str()).unwrap_or("");
                    debug!("Router: server notification {}", method);
                }
                MessageKind::Invalid => {
                    warn!("Router: dropping message without usable id or method: {}", json);
                }
            }
        }

        closed.store(true, Ordering::SeqCst);
        let abandoned = {
            let mut pending = pending.lock().await;
            let count = pending.len();
            pending.clear();
            count
        };
        if abandoned > 0 {
            warn!("Router: reader ended with {} pending request(s)", abandoned);
        }
    }

    /// Reply to a request initiated by the server. Only `ping` is supported.
    async fn answer_server_request(json: Value, writer: &SharedWriter) {
        let request: JsonRpcRequest = match serde_json::from_value(json) {
            Ok(r) => r,
            Err(e) => {
                warn!("Router: failed to parse server request: {}", e);
                return;
            }
        };

        let response = if request.method == "ping" {
            JsonRpcResponse::success(request.id, Value::Object(Default::default()))
        } else {
            debug!("Router: rejecting server request method={}", request.method);
            JsonRpcResponse::failure(
                request.id,
                RpcError::new(
                    error_codes::METHOD_NOT_FOUND,
                    format!("Method not found: {}", request.method),
                ),
            )
        };

        if let Err(e) = Self::write_to(writer, &response).await {
            debug!("Router: could not answer server request: {}", e);
        }
    }

    async fn write_to<T: Serialize>(writer: &SharedWriter, message: &T) -> Result<()> {
        let frame = encode_frame(message)?;
        let mut guard = writer.lock().await;
        let writer = guard.as_mut().ok_or(McpError::TransportClosed)?;
        writer.write_all(&frame).await?;
        writer.flush().await?;
        Ok(())
    }

    /// Send a request and wait for its response.
    ///
    /// Resolves to the `result` value, or:
    /// - [`McpError::RpcError`] for an `error` response
    /// - [`McpError::UnexpectedResponse`] for a reply that is not valid JSON-RPC
    /// - [`McpError::Timeout`] when no response arrives within the request timeout
    /// - [`McpError::Cancelled`] when `cancel` fires first
    /// - [`McpError::TransportClosed`] when the connection goes away
    pub async fn request(
        &self,
        method: &str,
        params: Option<Value>,
        cancel: &CancellationToken,
    ) -> Result<Value> {
        if self.is_closed() {
            return Err(McpError::TransportClosed);
        }

        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);

        // The reader may have ended between the check above and the insert.
        if self.is_closed() {
            self.forget(id).await;
            return Err(McpError::TransportClosed);
        }

        let request = JsonRpcRequest::new(id, method, params);
        trace!("Router sending request id={} method={}", id, method);
        if let Err(e) = Self::write_to(&self.writer, &request).await {
            self.forget(id).await;
            return Err(e);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                self.forget(id).await;
                debug!("Router: request id={} ({}) cancelled", id, method);
                return Err(McpError::Cancelled);
            }
            outcome = tokio::time::timeout(self.request_timeout, rx) => match outcome {
                Ok(Ok(response)) => response?,
                Ok(Err(_)) => return Err(McpError::TransportClosed),
                Err(_) => {
                    self.forget(id).await;
                    warn!(
                        "Router: request id={} ({}) timed out after {:?}",
                        id, method, self.request_timeout
                    );
                    return Err(McpError::Timeout(self.request_timeout));
                }
            },
        };

        match response.error {
            Some(error) => Err(McpError::RpcError {
                code: error.code,
                message: error.message,
                data: error.data,
            }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        }
    }

    /// Send a notification (no response expected).
    pub async fn notify(&self, method: &str, params: Option<Value>) -> Result<()> {
        if self.is_closed() {
            return Err(McpError::TransportClosed);
        }
        Self::write_to(&self.writer, &JsonRpcNotification::new(method, params)).await
    }

    async fn forget(&self, id: u64) {
        self.pending.lock().await.remove(&id);
    }

    /// Stop routing: fail pending requests, stop the reader and close the
    /// write side. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.shutdown.cancel();

        let abandoned = {
            let mut pending = self.pending.lock().await;
            let count = pending.len();
            pending.clear();
            count
        };
        if abandoned > 0 {
            debug!("Router: failed {} pending request(s) on shutdown", abandoned);
        }

        let writer = self.writer.lock().await.take();
        if let Some(mut writer) = writer
            && let Err(e) = writer.shutdown().await
        {
            debug!("Router: error closing write side: {}", e);
        }
    }
}

impl Drop for MessageRouter {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
