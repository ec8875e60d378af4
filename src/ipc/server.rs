//! Unix domain socket server for IPC
//!
//! Provides request-response communication and push notifications for
//! session events to subscribed clients. State-changing requests are
//! forwarded to the session task; status reads use the published snapshot.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::UnixListener;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::events::SessionEvent;
use crate::state::{Command, SessionSnapshot};

use super::protocol::{read_frame, write_frame, Notification, Request, Response};

/// IPC Server handling client connections
pub struct Server {
    socket_path: PathBuf,
    listener: Option<UnixListener>,
    session: SessionHandle,
    shutdown_tx: broadcast::Sender<()>,
}

/// What a client handler needs to reach the session
#[derive(Clone)]
pub struct SessionHandle {
    pub command_tx: mpsc::Sender<Command>,
    pub event_tx: broadcast::Sender<SessionEvent>,
    pub snapshots: watch::Receiver<SessionSnapshot>,
}

/// A decoded request, or why decoding failed
type Incoming = Result<Request, String>;

/// Aborts the task when dropped, including when the owning future is cancelled
struct AbortOnDrop(JoinHandle<()>);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

enum Step {
    Incoming(Option<Incoming>),
    Event(Result<SessionEvent, broadcast::error::RecvError>),
}

impl Server {
    /// Create a new IPC server
    pub fn new(socket_path: &Path, session: SessionHandle) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = socket_path.parent() {
            std::fs::create_dir_all(parent).context("failed to create socket directory")?;
        }

        // Remove stale socket if it exists
        if socket_path.exists() {
            std::fs::remove_file(socket_path).context("failed to remove stale socket")?;
        }

        let listener = UnixListener::bind(socket_path).context("failed to bind Unix socket")?;

        // Set socket permissions to owner-only (0600)
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
        }

        let (shutdown_tx, _) = broadcast::channel(1);

        info!(?socket_path, "IPC server listening");

        Ok(Self {
            socket_path: socket_path.to_owned(),
            listener: Some(listener),
            session,
            shutdown_tx,
        })
    }

    /// Run the server, accepting connections
    pub async fn run(&self) -> Result<()> {
        let listener = self.listener.as_ref().context("server not initialized")?;

        loop {
            match listener.accept().await {
                Ok((stream, _addr)) => {
                    debug!("client connected");
                    let session = self.session.clone();
                    let mut shutdown_rx = self.shutdown_tx.subscribe();

                    tokio::spawn(async move {
                        tokio::select! {
                            result = handle_client(stream, session) => {
                                if let Err(e) = result {
                                    warn!(?e, "client handler error");
                                }
                            }
                            _ = shutdown_rx.recv() => {
                                debug!("client handler shutting down");
                            }
                        }
                    });
                }
                Err(e) => {
                    error!(?e, "accept error");
                }
            }
        }
    }

    /// Gracefully shutdown the server
    pub async fn shutdown(&self) {
        let _ = self.shutdown_tx.send(());

        // Remove socket file
        if self.socket_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.socket_path) {
                warn!(?e, "failed to remove socket file");
            }
        }

        info!("IPC server shutdown complete");
    }
}

/// Handle a single client connection
///
/// Frames are decoded on a separate task so waiting for the next request
/// can be raced against pushing notifications.
async fn handle_client<S>(stream: S, session: SessionHandle) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    let (mut reader, mut writer) = tokio::io::split(stream);
    let (request_tx, mut request_rx) = mpsc::channel::<Incoming>(8);

    // Holds the read half. Dropped with this future on shutdown.
    let _reader_task = AbortOnDrop(tokio::spawn(async move {
        loop {
            let incoming = match read_frame(&mut reader).await {
                Ok(Some(frame)) => {
                    serde_json::from_slice::<Request>(&frame).map_err(|e| e.to_string())
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(?e, "failed to read request, disconnecting");
                    break;
                }
            };
            if request_tx.send(incoming).await.is_err() {
                break;
            }
        }
    }));

    let mut events: Option<broadcast::Receiver<SessionEvent>> = None;

    loop {
        let step = tokio::select! {
            incoming = request_rx.recv() => Step::Incoming(incoming),
            event = next_event(&mut events) => Step::Event(event),
        };

        match step {
            Step::Incoming(Some(Ok(request))) => {
                debug!(?request, "received request");
                let (response, subscribe) = process_request(request, &session).await;
                if subscribe && events.is_none() {
                    events = Some(session.event_tx.subscribe());
                    debug!("client subscribed to notifications");
                }
                if let Err(e) = write_frame(&mut writer, &response).await {
                    break Err(e);
                }
            }
            Step::Incoming(Some(Err(reason))) => {
                debug!(%reason, "malformed request");
                let response = Response::error("bad_request", reason);
                if let Err(e) = write_frame(&mut writer, &response).await {
                    break Err(e);
                }
            }
            Step::Incoming(None) => {
                debug!("client disconnected");
                break Ok(());
            }
            Step::Event(Ok(event)) => {
                if let Err(e) = write_frame(&mut writer, &Notification::Event { event }).await {
                    break Err(e);
                }
            }
            Step::Event(Err(broadcast::error::RecvError::Lagged(n))) => {
                warn!(skipped = n, "notification receiver lagged");
            }
            Step::Event(Err(broadcast::error::RecvError::Closed)) => {
                events = None;
            }
        }
    }
}

/// Next event for a subscribed client, pending forever otherwise
async fn next_event(
    events: &mut Option<broadcast::Receiver<SessionEvent>>,
) -> Result<SessionEvent, broadcast::error::RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Process a request and return a response
/// Returns (Response, should_subscribe)
async fn process_request(request: Request, session: &SessionHandle) -> (Response, bool) {
    if let Some(action) = request.action() {
        let (command, reply) = Command::with_reply(action);
        if session.command_tx.send(command).await.is_err() {
            return (Response::error("session_closed", "session is not running"), false);
        }
        return match reply.await {
            Ok(snapshot) => (Response::Status { session: snapshot }, false),
            Err(_) => (Response::error("session_closed", "session dropped the request"), false),
        };
    }

    match request {
        Request::Ping => (Response::Pong, false),

        Request::GetStatus => {
            let snapshot = session.snapshots.borrow().clone();
            (Response::Status { session: snapshot }, false)
        }

        Request::Subscribe => (Response::Subscribed, true),

        // Requests with an action were handled above
        _ => (Response::error("unsupported", "unsupported request"), false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
    use tokio::sync::oneshot;

    use crate::accessibility::AccessibilityStatusMonitor;
    use crate::feedback::{Channels, FeedbackRouter, RouterOptions};
    use crate::state::{Category, Direction, SessionOptions, SessionStateMachine};
    use crate::testing::{FakeAudioSession, FakeStatusSource, RecordingChannels};

    /// Starts a session task and returns the handle clients use to reach it
    fn start_session() -> (SessionHandle, Arc<RecordingChannels>) {
        let source = Arc::new(FakeStatusSource::new(false));
        let monitor = Arc::new(AccessibilityStatusMonitor::new(source));
        let recorder = Arc::new(RecordingChannels::default());
        let router = FeedbackRouter::new(
            Channels {
                announcer: recorder.clone(),
                synthesizer: recorder.clone(),
                audio_session: Arc::new(FakeAudioSession::new(false)),
            },
            monitor.mode(),
            RouterOptions::default(),
        );
        let (event_tx, _) = broadcast::channel(16);
        let mut sm = SessionStateMachine::new(
            router,
            monitor,
            SessionOptions::default(),
            event_tx.clone(),
        );
        let (command_tx, command_rx) = mpsc::channel(8);
        let (_status_tx, status_rx) = mpsc::channel(1);
        let session = SessionHandle {
            command_tx,
            event_tx,
            snapshots: sm.subscribe_snapshots(),
        };

        tokio::spawn(async move { sm.run(command_rx, status_rx).await });
        (session, recorder)
    }

    /// Starts a session and a client handler on one end of a duplex pipe
    fn start() -> (DuplexStream, Arc<RecordingChannels>) {
        let (session, recorder) = start_session();
        let (client, server) = tokio::io::duplex(4096);
        tokio::spawn(handle_client(server, session));
        (client, recorder)
    }

    async fn call(client: &mut DuplexStream, request: &Request) -> Response {
        write_frame(client, request).await.unwrap();
        let frame = read_frame(client).await.unwrap().unwrap();
        serde_json::from_slice(&frame).unwrap()
    }

    fn session_of(response: Response) -> SessionSnapshot {
        match response {
            Response::Status { session } => session,
            other => panic!("expected status, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_ping() {
        let (mut client, _) = start();
        assert_eq!(call(&mut client, &Request::Ping).await, Response::Pong);
    }

    #[tokio::test]
    async fn test_actions_return_post_transition_state() {
        let (mut client, recorder) = start();

        let status = session_of(call(&mut client, &Request::ToggleRecording).await);
        assert!(status.is_recording);

        let status = session_of(
            call(
                &mut client,
                &Request::SelectCategory {
                    direction: Direction::Forward,
                },
            )
            .await,
        );
        assert_eq!(status.category, Category::Work);

        let status = session_of(call(&mut client, &Request::SetPlaybackSpeed { value: 2.0 }).await);
        assert_eq!(status.playback_speed, 2.0);

        let status = session_of(call(&mut client, &Request::GetStatus).await);
        assert!(status.is_recording);
        assert_eq!(status.category, Category::Work);

        assert_eq!(
            recorder.texts(),
            vec!["Recording Started", "Work", "Speed 2x"]
        );
    }

    #[tokio::test]
    async fn test_unknown_direction_is_a_no_op() {
        let (mut client, recorder) = start();

        write_frame(
            &mut client,
            &serde_json::json!({"type": "select_category", "direction": "up"}),
        )
        .await
        .unwrap();
        let frame = read_frame(&mut client).await.unwrap().unwrap();
        let status = session_of(serde_json::from_slice(&frame).unwrap());

        assert_eq!(status.category, Category::General);
        assert!(recorder.dispatches().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_request_gets_error() {
        let (mut client, _) = start();

        let body = b"not json";
        client
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .unwrap();
        client.write_all(body).await.unwrap();

        let frame = read_frame(&mut client).await.unwrap().unwrap();
        let response: Response = serde_json::from_slice(&frame).unwrap();
        assert!(matches!(response, Response::Error { code, .. } if code == "bad_request"));

        // Connection stays usable
        assert_eq!(call(&mut client, &Request::Ping).await, Response::Pong);
    }

    #[tokio::test]
    async fn test_subscribed_client_receives_events() {
        let (mut client, _) = start();
        assert_eq!(call(&mut client, &Request::Subscribe).await, Response::Subscribed);

        write_frame(&mut client, &Request::ToggleRecording).await.unwrap();

        let mut frames = Vec::new();
        for _ in 0..2 {
            let frame = read_frame(&mut client).await.unwrap().unwrap();
            frames.push(serde_json::from_slice::<serde_json::Value>(&frame).unwrap());
        }

        assert!(frames.iter().any(|f| f["type"] == "status"));
        assert!(frames
            .iter()
            .any(|f| f["type"] == "event" && f["event"]["type"] == "recording_started"));
    }

    #[tokio::test]
    async fn test_cancelled_handler_releases_connection() {
        let (session, _) = start_session();
        let (mut client, server) = tokio::io::duplex(4096);
        let (stop_tx, stop_rx) = oneshot::channel::<()>();

        let handler = tokio::spawn(async move {
            tokio::select! {
                _ = handle_client(server, session) => {}
                _ = stop_rx => {}
            }
        });
        assert_eq!(call(&mut client, &Request::Ping).await, Response::Pong);

        stop_tx.send(()).unwrap();
        handler.await.unwrap();

        // Both halves of the server end are gone, so the client sees EOF
        let mut buf = [0u8; 1];
        let n = tokio::time::timeout(Duration::from_secs(1), client.read(&mut buf))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_closed_session_reports_error() {
        let (event_tx, _) = broadcast::channel(4);
        let (command_tx, command_rx) = mpsc::channel(1);
        let (_snapshot_tx, snapshots) = watch::channel(SessionSnapshot {
            is_recording: false,
            category: Category::General,
            playback_speed: 1.0,
            assistive_mode: false,
        });
        drop(command_rx);

        let session = SessionHandle {
            command_tx,
            event_tx,
            snapshots,
        };
        let (response, _) = process_request(Request::ToggleRecording, &session).await;
        assert!(matches!(response, Response::Error { code, .. } if code == "session_closed"));
    }
}
