//! MCP stdio client: the [`ToolTransport`] adapter.
//!
//! [`McpTransport`] spawns the tool server as a child process, routes
//! JSON-RPC traffic over its stdin/stdout through a [`MessageRouter`], and
//! forwards its stderr into `tracing`. The `initialize` handshake is performed
//! lazily by the first request, on a task of its own so that a caller giving
//! up does not leave the connection half-initialized.

use crate::mcp::error::{McpError, Result};
use crate::mcp::protocol::{
    CallToolParams, CallToolResult, InitializeParams, InitializeResult, ListToolsParams,
    ListToolsResult, McpTool, PROTOCOL_VERSION,
};
use crate::mcp::router::MessageRouter;
use async_trait::async_trait;
use std::ffi::OsStr;
use std::process::Stdio;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{Mutex, OnceCell};
use tokio_util::sync::CancellationToken;
use toolrelay_application::{ToolTransport, TransportError};
use toolrelay_domain::ToolDescriptor;
use tracing::{debug, info, warn};

/// Upper bound on `tools/list` pages, in case a server keeps handing out cursors.
const MAX_LIST_PAGES: usize = 100;

/// Connection settings for [`McpTransport`].
#[derive(Debug, Clone)]
pub struct McpTransportConfig {
    /// Deadline for each request.
    pub request_timeout: Duration,
    /// How long `close()` waits for the server to exit before killing it.
    pub shutdown_grace: Duration,
    /// Name announced in `clientInfo`.
    pub client_name: String,
}

impl Default for McpTransportConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_millis(30_000),
            shutdown_grace: Duration::from_millis(2_000),
            client_name: "toolrelay".to_string(),
        }
    }
}

impl McpTransportConfig {
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}

/// Connection to one MCP tool server over stdio.
pub struct McpTransport {
    router: Arc<MessageRouter>,
    /// Server process (killed on Drop to prevent orphans). `None` for
    /// in-memory connections and after `close()`.
    child: Mutex<Option<Child>>,
    server_info: Arc<OnceCell<InitializeResult>>,
    closed: AtomicBool,
    config: McpTransportConfig,
    label: String,
}

impl McpTransport {
    /// Spawn `command` with `args` and an environment overlay.
    ///
    /// Returns as soon as the process is running; nothing is exchanged with
    /// the server until the first request.
    pub async fn connect<I, K, V>(
        command: &str,
        args: &[String],
        env: I,
        config: McpTransportConfig,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<OsStr>,
        V: AsRef<OsStr>,
    {
        info!("Spawning tool server: {} {}", command, args.join(" "));

        let mut cmd = Command::new(command);
        cmd.args(args)
            .envs(env)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        // Linux: request kernel to send SIGTERM to child when parent dies.
        // This catches cases where Drop doesn't run (SIGKILL, OOM kill).
        #[cfg(target_os = "linux")]
        unsafe {
            cmd.pre_exec(|| {
                libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGTERM);
                Ok(())
            });
        }

        let spawn_error = |source: std::io::Error| McpError::SpawnError {
            command: command.to_string(),
            source,
        };

        let mut child = cmd.spawn().map_err(spawn_error)?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("Failed to capture stdin")))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_error(std::io::Error::other("Failed to capture stdout")))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_stderr(stderr, command.to_string()));
        }

        debug!("Tool server started (pid {:?})", child.id());
        let router = MessageRouter::new(stdout, stdin, config.request_timeout);

        Ok(Self {
            router: Arc::new(router),
            child: Mutex::new(Some(child)),
            server_info: Arc::new(OnceCell::new()),
            closed: AtomicBool::new(false),
            config,
            label: command.to_string(),
        })
    }

    /// Connect over an existing byte stream pair (no child process).
    pub fn from_streams<R, W>(reader: R, writer: W, config: McpTransportConfig) -> Self
    where
        R: AsyncRead + Send + Unpin + 'static,
        W: AsyncWrite + Send + Unpin + 'static,
    {
        Self {
            router: Arc::new(MessageRouter::new(reader, writer, config.request_timeout)),
            child: Mutex::new(None),
            server_info: Arc::new(OnceCell::new()),
            closed: AtomicBool::new(false),
            config,
            label: "in-memory".to_string(),
        }
    }

    /// Server identity, once the handshake has happened.
    pub fn server_info(&self) -> Option<&InitializeResult> {
        self.server_info.get()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) || self.router.is_closed()
    }

    /// Perform the `initialize` handshake exactly once.
    ///
    /// The exchange runs on a spawned task bound to the connection, not to
    /// `cancel`: a cancelled caller stops waiting while the handshake carries
    /// on for the next request. A failed attempt leaves the cell empty, so the
    /// next request retries.
    async fn ensure_initialized(&self, cancel: &CancellationToken) -> Result<&InitializeResult> {
        if let Some(info) = self.server_info.get() {
            return Ok(info);
        }

        let router = Arc::clone(&self.router);
        let cell = Arc::clone(&self.server_info);
        let client_name = self.config.client_name.clone();
        let handshake = tokio::spawn(async move {
            cell.get_or_try_init(|| initialize(&router, client_name))
                .await
                .map(|_| ())
        });

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(McpError::Cancelled),
            joined = handshake => {
                joined.map_err(|e| McpError::Io(std::io::Error::other(e)))??;
            }
        }
        self.server_info.get().ok_or(McpError::TransportClosed)
    }

    async fn handshake(&self, cancel: &CancellationToken) -> std::result::Result<(), TransportError> {
        self.ensure_initialized(cancel).await.map(|_| ()).map_err(|e| match e {
            McpError::RpcError { .. } | McpError::UnexpectedResponse(_) => {
                TransportError::Protocol(format!("MCP handshake failed: {}", e))
            }
            other => other.into(),
        })
    }

    /// Fetch every page of `tools/list`.
    async fn list_all_tools(&self) -> Result<Vec<McpTool>> {
        let never = CancellationToken::new();
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for page in 1..=MAX_LIST_PAGES {
            let params = serde_json::to_value(ListToolsParams {
                cursor: cursor.take(),
            })?;
            let result = self.router.request("tools/list", Some(params), &never).await?;
            let list: ListToolsResult = serde_json::from_value(result).map_err(|e| {
                McpError::UnexpectedResponse(format!("invalid tools/list result: {}", e))
            })?;
            debug!("tools/list page {}: {} tool(s)", page, list.tools.len());
            tools.extend(list.tools);

            match list.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        Err(McpError::UnexpectedResponse(format!(
            "tools/list did not finish within {} pages",
            MAX_LIST_PAGES
        )))
    }
}

#[async_trait]
impl ToolTransport for McpTransport {
    async fn list_tools(&self) -> std::result::Result<Vec<ToolDescriptor>, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.handshake(&CancellationToken::new()).await?;

        let tools = self.list_all_tools().await.map_err(|e| match e {
            McpError::RpcError { .. } => TransportError::Protocol(e.to_string()),
            other => other.into(),
        })?;
        Ok(tools.into_iter().map(McpTool::into_descriptor).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: &serde_json::Map<String, serde_json::Value>,
        cancel: &CancellationToken,
    ) -> std::result::Result<serde_json::Value, TransportError> {
        if self.is_closed() {
            return Err(TransportError::Closed);
        }
        self.handshake(cancel).await?;

        let params = serde_json::to_value(CallToolParams {
            name: name.to_string(),
            arguments: arguments.clone(),
        })
        .map_err(McpError::from)?;

        debug!("tools/call {}", name);
        let result = self
            .router
            .request("tools/call", Some(params), cancel)
            .await?;
        let result: CallToolResult = serde_json::from_value(result).map_err(|e| {
            TransportError::Protocol(format!("invalid tools/call result: {}", e))
        })?;

        if result.is_error {
            let message = result.text();
            let message = if message.is_empty() {
                format!("Tool '{}' reported an error", name)
            } else {
                message
            };
            return Err(McpError::ToolFailed(message).into());
        }

        Ok(result.into_value())
    }

    async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            debug!("Transport to {} already closed", self.label);
            return;
        }
        info!("Closing connection to {}", self.label);

        // Fails pending calls and closes the server's stdin.
        self.router.shutdown().await;

        let child = self.child.lock().await.take();
        let Some(mut child) = child else {
            return;
        };

        match tokio::time::timeout(self.config.shutdown_grace, child.wait()).await {
            Ok(Ok(status)) => debug!("Tool server exited: {}", status),
            Ok(Err(e)) => warn!("Failed to wait for tool server: {}", e),
            Err(_) => {
                warn!(
                    "Tool server did not exit within {:?}, killing it",
                    self.config.shutdown_grace
                );
                if let Err(e) = child.kill().await {
                    warn!("Failed to kill tool server: {}", e);
                }
            }
        }
    }
}

impl Drop for McpTransport {
    fn drop(&mut self) {
        if let Some(child) = self.child.get_mut().as_mut() {
            debug!("McpTransport dropping, killing tool server process");
            let _ = child.start_kill();
        }
    }
}

/// Send `initialize`, then `notifications/initialized`.
///
/// Bound to the router's lifetime: closing the connection aborts it.
async fn initialize(router: &MessageRouter, client_name: String) -> Result<InitializeResult> {
    let params = serde_json::to_value(InitializeParams::new(
        client_name,
        env!("CARGO_PKG_VERSION"),
    ))?;
    let result = router
        .request("initialize", Some(params), &router.shutdown_token())
        .await
        .map_err(|e| match e {
            McpError::Cancelled => McpError::TransportClosed,
            other => other,
        })?;
    let info: InitializeResult = serde_json::from_value(result).map_err(|e| {
        McpError::UnexpectedResponse(format!("invalid initialize result: {}", e))
    })?;
    if info.protocol_version != PROTOCOL_VERSION {
        debug!(
            "Server answered with protocol version {} (requested {})",
            info.protocol_version, PROTOCOL_VERSION
        );
    }
    router.notify("notifications/initialized", None).await?;
    info!(
        "MCP session initialized with {} {}",
        info.server_info.name, info.server_info.version
    );
    Ok(info)
}

/// Forward the server's stderr into tracing, one line per event.
async fn forward_stderr(stderr: ChildStderr, label: String) {
    let mut lines = BufReader::new(stderr).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => debug!(target: "toolrelay::server", "[{}] {}", label, line),
            Ok(None) => break,
            Err(e) => {
                debug!("Stopped reading stderr of {}: {}", label, e);
                break;
            }
        }
    }
}
