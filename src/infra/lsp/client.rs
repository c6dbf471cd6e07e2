//! One-shot LSP Client
//!
//! Starts a language server for exactly one operation and guarantees the
//! process is terminated before control returns, on every exit path:
//! success, protocol error, wall-clock timeout, or memory breach. There is
//! no server pool and no reuse; a leaked server is treated as a bug in this
//! module, not a tuning problem.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::time::timeout;

use super::memory::MemoryMonitor;
use super::protocol::{
    ClientCapabilities, ClientInfo, FileRename, InitializeParams, InitializeResult, Message,
    Notification, ReferenceContext, ReferenceParams, RenameFilesParams, RenameParams, Request,
    RequestId, Response, TextDocumentIdentifier, TextDocumentPositionParams,
};
use super::servers::LspServerConfig;
use super::transport::Transport;
use crate::error::LspError;
use crate::models::lsp::{LspLocation, Position, WorkspaceEdit, path_to_uri, uri_to_path};
use crate::models::symbol::Language;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// One semantic operation against a language server
#[derive(Debug, Clone)]
pub enum LspOperation {
    /// textDocument/rename at a position
    Rename {
        file: PathBuf,
        position: Position,
        new_name: String,
    },
    /// textDocument/references at a position
    References {
        file: PathBuf,
        position: Position,
        include_declaration: bool,
    },
    /// textDocument/definition at a position
    Definition { file: PathBuf, position: Position },
    /// workspace/willRenameFiles for a file move
    WillRenameFiles { from: PathBuf, to: PathBuf },
}

impl LspOperation {
    /// File whose content the server needs open before the request
    fn document(&self) -> Option<&Path> {
        match self {
            Self::Rename { file, .. }
            | Self::References { file, .. }
            | Self::Definition { file, .. } => Some(file),
            Self::WillRenameFiles { from, .. } => Some(from),
        }
    }
}

/// A resolved source location (1-indexed lines and columns)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: PathBuf,
    pub start_line: u32,
    pub start_column: u32,
    pub end_line: u32,
    pub end_column: u32,
}

impl SourceLocation {
    fn from_wire(location: &LspLocation) -> Option<Self> {
        let file = uri_to_path(&location.uri)?;
        Some(Self {
            file,
            start_line: location.range.start.line + 1,
            start_column: location.range.start.character + 1,
            end_line: location.range.end.line + 1,
            end_column: location.range.end.character + 1,
        })
    }
}

/// Result of one LSP operation
#[derive(Debug, Clone)]
pub enum LspOutcome {
    /// Rename and file-move operations yield a workspace edit
    Edit(WorkspaceEdit),
    /// Reference searches yield locations
    Locations(Vec<SourceLocation>),
    /// Definition lookup yields at most one location
    Definition(Option<SourceLocation>),
}

/// One-shot session runner for a configured server
pub struct OneShotClient {
    config: LspServerConfig,
    language: Language,
    root: PathBuf,
}

impl OneShotClient {
    pub fn new(config: LspServerConfig, language: Language, root: PathBuf) -> Self {
        Self {
            config,
            language,
            root,
        }
    }

    /// Run exactly one operation.
    ///
    /// The server process is started, initialized, queried, and terminated
    /// within this call. Two independent deadlines apply: the configured
    /// wall-clock timeout and the memory ceiling.
    pub async fn run(&self, operation: LspOperation) -> Result<LspOutcome, LspError> {
        if !self.config.is_installed() {
            return Err(LspError::Unavailable {
                language: self.language,
                name: self.config.name.clone(),
                install_hint: self.config.install_hint().to_string(),
            });
        }

        let mut session = Session::spawn(&self.config, &self.root)?;
        let mut monitor = MemoryMonitor::spawn(
            session.pid,
            self.config.memory_limit_mb,
            self.config.on_memory_breach,
            &self.config.name,
        );

        let armed = monitor.is_armed();
        let result = tokio::select! {
            outcome = timeout(self.config.timeout(), self.drive(&mut session, operation)) => {
                match outcome {
                    Ok(result) => result,
                    Err(_) => Err(LspError::Timeout {
                        name: self.config.name.clone(),
                        seconds: self.config.timeout_secs,
                    }),
                }
            }
            used_mb = monitor.breached(), if armed => {
                Err(LspError::MemoryExceeded {
                    name: self.config.name.clone(),
                    used_mb,
                    limit_mb: self.config.memory_limit_mb,
                })
            }
        };

        // Guaranteed termination on every exit path. The monitor task dies
        // with its scope; kill_on_drop backstops even a panic above.
        drop(monitor);
        session.terminate().await;

        result
    }

    async fn drive(
        &self,
        session: &mut Session,
        operation: LspOperation,
    ) -> Result<LspOutcome, LspError> {
        self.initialize(session).await?;

        if let Some(document) = operation.document() {
            session.open_document(document, self.language).await?;
        }

        let result = match operation {
            LspOperation::Rename {
                file,
                position,
                new_name,
            } => {
                let params = RenameParams {
                    text_document: TextDocumentIdentifier {
                        uri: path_to_uri(&file),
                    },
                    position,
                    new_name,
                };
                let value = session
                    .request("textDocument/rename", Some(serde_json::to_value(params)?))
                    .await?;
                LspOutcome::Edit(parse_workspace_edit(value)?)
            }
            LspOperation::References {
                file,
                position,
                include_declaration,
            } => {
                let params = ReferenceParams {
                    text_document: TextDocumentIdentifier {
                        uri: path_to_uri(&file),
                    },
                    position,
                    context: ReferenceContext {
                        include_declaration,
                    },
                };
                let value = session
                    .request(
                        "textDocument/references",
                        Some(serde_json::to_value(params)?),
                    )
                    .await?;
                LspOutcome::Locations(parse_locations(value)?)
            }
            LspOperation::Definition { file, position } => {
                let params = TextDocumentPositionParams {
                    text_document: TextDocumentIdentifier {
                        uri: path_to_uri(&file),
                    },
                    position,
                };
                let value = session
                    .request(
                        "textDocument/definition",
                        Some(serde_json::to_value(params)?),
                    )
                    .await?;
                LspOutcome::Definition(parse_definition(value)?)
            }
            LspOperation::WillRenameFiles { from, to } => {
                let params = RenameFilesParams {
                    files: vec![FileRename {
                        old_uri: path_to_uri(&from),
                        new_uri: path_to_uri(&to),
                    }],
                };
                let value = session
                    .request(
                        "workspace/willRenameFiles",
                        Some(serde_json::to_value(params)?),
                    )
                    .await?;
                LspOutcome::Edit(parse_workspace_edit(value)?)
            }
        };

        Ok(result)
    }

    /// Initialize handshake, bounded by the per-server init timeout.
    ///
    /// A slow or failed handshake is reported as `Unavailable` with the
    /// install hint so the failure is actionable without log diving.
    async fn initialize(&self, session: &mut Session) -> Result<(), LspError> {
        let params = InitializeParams {
            process_id: Some(std::process::id()),
            root_uri: Some(path_to_uri(&self.root)),
            capabilities: ClientCapabilities::one_shot(),
            client_info: Some(ClientInfo {
                name: "recast".to_string(),
                version: Some(env!("CARGO_PKG_VERSION").to_string()),
            }),
            initialization_options: self.config.initialization_options.clone(),
        };

        let handshake = async {
            let value = session
                .request("initialize", Some(serde_json::to_value(params)?))
                .await?;
            let _result: InitializeResult = serde_json::from_value(value)?;
            session
                .notify("initialized", Some(serde_json::json!({})))
                .await?;
            Ok::<(), LspError>(())
        };

        match timeout(self.config.init_timeout(), handshake).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => {
                tracing::warn!("{} handshake failed: {}", self.config.name, e);
                Err(LspError::Unavailable {
                    language: self.language,
                    name: self.config.name.clone(),
                    install_hint: self.config.install_hint().to_string(),
                })
            }
            Err(_) => Err(LspError::Unavailable {
                language: self.language,
                name: self.config.name.clone(),
                install_hint: self.config.install_hint().to_string(),
            }),
        }
    }
}

/// A spawned server process with its framed transport
struct Session {
    child: Child,
    transport: Transport,
    pid: u32,
    next_id: u64,
    name: String,
}

impl Session {
    fn spawn(config: &LspServerConfig, root: &Path) -> Result<Self, LspError> {
        tracing::info!("Starting {} for one-shot session", config.name);

        let mut child = Command::new(&config.command)
            .args(&config.args)
            .current_dir(root)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child.stdin.take().ok_or_else(|| {
            LspError::Protocol("server stdin unavailable".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            LspError::Protocol("server stdout unavailable".to_string())
        })?;

        // Drain stderr for diagnostics; never parsed for protocol content
        if let Some(stderr) = child.stderr.take() {
            let name = config.name.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    tracing::debug!("{} stderr: {}", name, line);
                }
            });
        }

        let pid = child.id().ok_or_else(|| LspError::Terminated {
            phase: "spawn".to_string(),
        })?;

        Ok(Self {
            child,
            transport: Transport::new(stdin, stdout),
            pid,
            next_id: 1,
            name: config.name.clone(),
        })
    }

    /// Send a request and read messages until its response arrives.
    ///
    /// Server-initiated requests are answered with a null result;
    /// notifications are logged and skipped. The session is sequential by
    /// design, so no pending-request map is needed.
    async fn request(&mut self, method: &str, params: Option<Value>) -> Result<Value, LspError> {
        let id = self.next_id;
        self.next_id += 1;

        self.transport
            .write_request(&Request::new(id, method, params))
            .await?;

        loop {
            let message = self.transport.read_message().await.map_err(|e| {
                if e.kind() == std::io::ErrorKind::UnexpectedEof {
                    LspError::Terminated {
                        phase: method.to_string(),
                    }
                } else {
                    LspError::Io(e)
                }
            })?;

            match message {
                Message::Response(response)
                    if response.id == Some(RequestId::Number(id)) =>
                {
                    return response.into_result().map_err(Into::into);
                }
                Message::Response(stale) => {
                    tracing::debug!("{}: dropping stale response {:?}", self.name, stale.id);
                }
                Message::Request(server_request) => {
                    self.transport
                        .write_response(&Response::null(server_request.id))
                        .await?;
                }
                Message::Notification(notification) => {
                    tracing::trace!("{}: {}", self.name, notification.method);
                }
            }
        }
    }

    async fn notify(&mut self, method: &str, params: Option<Value>) -> Result<(), LspError> {
        self.transport
            .write_notification(&Notification::new(method, params))
            .await?;
        Ok(())
    }

    /// Open a document so positional requests resolve against its content
    async fn open_document(&mut self, path: &Path, language: Language) -> Result<(), LspError> {
        let content = tokio::fs::read_to_string(path).await?;
        self.notify(
            "textDocument/didOpen",
            Some(serde_json::json!({
                "textDocument": {
                    "uri": path_to_uri(path),
                    "languageId": language.lsp_id(),
                    "version": 1,
                    "text": content,
                }
            })),
        )
        .await
    }

    /// Graceful shutdown -> exit, then kill whatever is left.
    async fn terminate(mut self) {
        let graceful = timeout(SHUTDOWN_GRACE, async {
            let _ = self.request("shutdown", None).await;
            let _ = self.notify("exit", None).await;
        })
        .await;

        if graceful.is_err() {
            tracing::debug!("{}: graceful shutdown timed out", self.name);
        }

        match timeout(SHUTDOWN_GRACE, self.child.wait()).await {
            Ok(Ok(status)) => {
                tracing::debug!("{} exited: {}", self.name, status);
            }
            _ => {
                let _ = self.child.start_kill();
                let _ = self.child.wait().await;
                tracing::debug!("{} killed after shutdown grace period", self.name);
            }
        }
    }
}

// ============================================================================
// Response parsing
// ============================================================================

fn parse_workspace_edit(value: Value) -> Result<WorkspaceEdit, LspError> {
    if value.is_null() {
        return Ok(WorkspaceEdit::default());
    }
    serde_json::from_value(value).map_err(Into::into)
}

fn parse_locations(value: Value) -> Result<Vec<SourceLocation>, LspError> {
    if value.is_null() {
        return Ok(Vec::new());
    }
    let wire: Vec<LspLocation> = serde_json::from_value(value)?;
    Ok(wire.iter().filter_map(SourceLocation::from_wire).collect())
}

/// Definition responses come as Location, Location[], or LocationLink[]
fn parse_definition(value: Value) -> Result<Option<SourceLocation>, LspError> {
    let first = match &value {
        Value::Null => return Ok(None),
        Value::Array(items) => match items.first() {
            Some(item) => item.clone(),
            None => return Ok(None),
        },
        _ => value.clone(),
    };

    if first.get("targetUri").is_some() {
        let uri = first["targetUri"].as_str().unwrap_or_default().to_string();
        let range = serde_json::from_value(
            first
                .get("targetSelectionRange")
                .cloned()
                .unwrap_or(Value::Null),
        )
        .unwrap_or_default();
        return Ok(SourceLocation::from_wire(&LspLocation { uri, range }));
    }

    let location: LspLocation = serde_json::from_value(first)?;
    Ok(SourceLocation::from_wire(&location))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::lsp::Range;

    #[test]
    fn test_parse_null_rename_result() {
        let edit = parse_workspace_edit(Value::Null).unwrap();
        assert!(edit.is_empty());
    }

    #[test]
    fn test_parse_locations() {
        let value = serde_json::json!([
            {
                "uri": "file:///repo/src/a.rs",
                "range": {
                    "start": {"line": 4, "character": 3},
                    "end": {"line": 4, "character": 9}
                }
            }
        ]);
        let locations = parse_locations(value).unwrap();
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].file, PathBuf::from("/repo/src/a.rs"));
        assert_eq!(locations[0].start_line, 5); // 1-indexed
        assert_eq!(locations[0].start_column, 4);
    }

    #[test]
    fn test_parse_definition_location_link() {
        let value = serde_json::json!([
            {
                "targetUri": "file:///repo/src/lib.rs",
                "targetRange": {
                    "start": {"line": 0, "character": 0},
                    "end": {"line": 10, "character": 0}
                },
                "targetSelectionRange": {
                    "start": {"line": 2, "character": 7},
                    "end": {"line": 2, "character": 13}
                }
            }
        ]);
        let location = parse_definition(value).unwrap().unwrap();
        assert_eq!(location.file, PathBuf::from("/repo/src/lib.rs"));
        assert_eq!(location.start_line, 3);
    }

    #[test]
    fn test_parse_definition_plain_location() {
        let value = serde_json::json!({
            "uri": "file:///repo/src/lib.rs",
            "range": {
                "start": {"line": 1, "character": 0},
                "end": {"line": 1, "character": 5}
            }
        });
        let location = parse_definition(value).unwrap().unwrap();
        assert_eq!(location.start_line, 2);
    }

    #[test]
    fn test_parse_definition_empty_array() {
        assert!(parse_definition(serde_json::json!([])).unwrap().is_none());
        assert!(parse_definition(Value::Null).unwrap().is_none());
    }

    #[test]
    fn test_source_location_rejects_non_file_uri() {
        let location = LspLocation {
            uri: "untitled:Untitled-1".to_string(),
            range: Range::default(),
        };
        assert!(SourceLocation::from_wire(&location).is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unresponsive_server_is_terminated_at_init_timeout() {
        use crate::infra::lsp::servers::{InstallInstructions, MemoryAction};
        use std::time::Instant;

        // `sleep` accepts stdin and never speaks LSP; the handshake must hit
        // the init timeout and the session must still terminate the process
        // before run() returns.
        let config = LspServerConfig {
            name: "sleeper".to_string(),
            command: "sleep".to_string(),
            args: vec!["60".to_string()],
            languages: vec![Language::Go],
            memory_limit_mb: 1024,
            on_memory_breach: MemoryAction::Ignore,
            timeout_secs: 30,
            init_timeout_secs: 1,
            install: InstallInstructions {
                macos: "coreutils".to_string(),
                linux: "coreutils".to_string(),
                windows: "n/a".to_string(),
            },
            initialization_options: None,
        };
        let client = OneShotClient::new(config, Language::Go, std::env::temp_dir());

        let started = Instant::now();
        let err = client
            .run(LspOperation::Definition {
                file: std::env::temp_dir().join("x.go"),
                position: Position::new(0, 0),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LspError::Unavailable { .. }), "{:?}", err);
        // Bounded by init timeout + shutdown grace, nowhere near sleep 60
        assert!(started.elapsed() < Duration::from_secs(20));
    }

    #[tokio::test]
    async fn test_missing_binary_fails_fast_with_hint() {
        use crate::infra::lsp::servers::{InstallInstructions, MemoryAction};

        let config = LspServerConfig {
            name: "ghost-ls".to_string(),
            command: "recast-no-such-language-server".to_string(),
            args: Vec::new(),
            languages: vec![Language::Rust],
            memory_limit_mb: 1024,
            on_memory_breach: MemoryAction::Kill,
            timeout_secs: 5,
            init_timeout_secs: 5,
            install: InstallInstructions {
                macos: "brew install ghost-ls".to_string(),
                linux: "apt install ghost-ls".to_string(),
                windows: "choco install ghost-ls".to_string(),
            },
            initialization_options: None,
        };
        let client = OneShotClient::new(config, Language::Rust, PathBuf::from("/tmp"));
        let err = client
            .run(LspOperation::Definition {
                file: PathBuf::from("/tmp/a.rs"),
                position: Position::new(0, 0),
            })
            .await
            .unwrap_err();

        match err {
            LspError::Unavailable { install_hint, .. } => {
                assert!(install_hint.contains("ghost-ls"));
            }
            other => panic!("expected Unavailable, got {:?}", other),
        }
    }
}
