//! IPC message protocol definitions
//!
//! All messages are JSON-encoded, prefixed with a 4-byte little-endian length.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::events::SessionEvent;
use crate::state::{Action, Direction, SessionSnapshot, SpeedPreset};

/// Largest frame either side will accept
pub const MAX_FRAME_LEN: usize = 1024 * 1024;

/// Requests from the UI to the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    /// Ping to check connectivity
    Ping,

    /// Request the current session snapshot
    GetStatus,

    /// Start or pause recording
    ToggleRecording,

    /// Move to the next or previous category
    SelectCategory { direction: Direction },

    /// Set an arbitrary playback speed
    SetPlaybackSpeed { value: f64 },

    /// Set one of the preset playback speeds
    SelectSpeedPreset { preset: SpeedPreset },

    /// Subscribe to session event notifications
    Subscribe,
}

impl Request {
    /// Session action this request maps to, if it changes state
    pub fn action(&self) -> Option<Action> {
        match self {
            Request::ToggleRecording => Some(Action::ToggleRecording),
            Request::SelectCategory { direction } => Some(Action::SelectCategory(*direction)),
            Request::SetPlaybackSpeed { value } => Some(Action::SetPlaybackSpeed(*value)),
            Request::SelectSpeedPreset { preset } => Some(Action::SelectSpeedPreset(*preset)),
            Request::Ping | Request::GetStatus | Request::Subscribe => None,
        }
    }
}

/// Responses from the daemon to the UI
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Session snapshot, after the request was applied
    Status { session: SessionSnapshot },

    /// Pong response to ping
    Pong,

    /// Subscription confirmed
    Subscribed,

    /// Error response
    Error { code: String, message: String },
}

impl Response {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        Response::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// Push notification from daemon to UI (for subscribed clients)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// A session transition was committed
    Event { event: SessionEvent },
}

/// Read one frame, `None` on a clean disconnect
pub async fn read_frame<R: AsyncRead + Unpin>(reader: &mut R) -> Result<Option<Vec<u8>>> {
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf).await {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
        Err(e) => return Err(e.into()),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_LEN {
        bail!("frame of {} bytes exceeds limit", len);
    }

    let mut buf = vec![0u8; len];
    reader.read_exact(&mut buf).await?;
    Ok(Some(buf))
}

/// Write a length-prefixed JSON message
pub async fn write_frame<W, T>(writer: &mut W, msg: &T) -> Result<()>
where
    W: AsyncWrite + Unpin,
    T: Serialize,
{
    let msg_bytes = serde_json::to_vec(msg)?;
    let msg_len = (msg_bytes.len() as u32).to_le_bytes();

    writer.write_all(&msg_len).await?;
    writer.write_all(&msg_bytes).await?;
    writer.flush().await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Category;

    #[test]
    fn test_request_serialization() {
        let req = Request::SelectCategory {
            direction: Direction::Backward,
        };
        let json = serde_json::to_string(&req).unwrap();
        assert!(json.contains("select_category"));
        assert!(json.contains("backward"));
    }

    #[test]
    fn test_unknown_direction_still_parses() {
        let json = r#"{"type":"select_category","direction":"up"}"#;
        let req: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            req.action(),
            Some(Action::SelectCategory(Direction::Unknown))
        );
    }

    #[test]
    fn test_read_only_requests_have_no_action() {
        assert_eq!(Request::Ping.action(), None);
        assert_eq!(Request::GetStatus.action(), None);
        assert_eq!(Request::Subscribe.action(), None);
        assert_eq!(
            Request::SetPlaybackSpeed { value: 0.5 }.action(),
            Some(Action::SetPlaybackSpeed(0.5))
        );
    }

    #[test]
    fn test_response_serialization() {
        let resp = Response::Status {
            session: SessionSnapshot {
                is_recording: true,
                category: Category::Work,
                playback_speed: 2.0,
                assistive_mode: false,
            },
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains(r#""type":"status""#));
        assert!(json.contains(r#""category":"work""#));
    }

    #[test]
    fn test_notification_serialization() {
        let n = Notification::Event {
            event: SessionEvent::RecordingStarted,
        };
        let json = serde_json::to_string(&n).unwrap();
        assert_eq!(json, r#"{"type":"event","event":{"type":"recording_started"}}"#);
    }

    #[tokio::test]
    async fn test_frame_round_trip_and_eof() {
        let (mut a, mut b) = tokio::io::duplex(64);
        write_frame(&mut a, &Request::Ping).await.unwrap();
        drop(a);

        let frame = read_frame(&mut b).await.unwrap().unwrap();
        let req: Request = serde_json::from_slice(&frame).unwrap();
        assert_eq!(req, Request::Ping);
        assert!(read_frame(&mut b).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_oversized_frame_is_rejected() {
        let (mut a, mut b) = tokio::io::duplex(64);
        a.write_all(&((MAX_FRAME_LEN as u32) + 1).to_le_bytes())
            .await
            .unwrap();
        assert!(read_frame(&mut b).await.is_err());
    }
}
