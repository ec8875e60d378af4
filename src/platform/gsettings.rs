//! GNOME screen-reader status via `gsettings`

use std::io::Read;
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::accessibility::{AccessibilityError, AccessibilityStatusSource};

const SCHEMA: &str = "org.gnome.desktop.a11y.applications";
const KEY: &str = "screen-reader-enabled";

/// A point query that takes longer than this is killed
const QUERY_TIMEOUT: Duration = Duration::from_secs(2);
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Reads and watches `org.gnome.desktop.a11y.applications screen-reader-enabled`
pub struct GsettingsStatusSource {
    program: String,
    query_timeout: Duration,
}

impl GsettingsStatusSource {
    pub fn new() -> Self {
        Self {
            program: "gsettings".to_string(),
            query_timeout: QUERY_TIMEOUT,
        }
    }

    /// Run `gsettings get`, killing it if it outlasts `query_timeout`
    fn query(&self) -> Result<String, String> {
        let mut child = std::process::Command::new(&self.program)
            .args(["get", SCHEMA, KEY])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| format!("failed to run {}: {}", self.program, e))?;

        let deadline = Instant::now() + self.query_timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) if Instant::now() >= deadline => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(format!("no answer within {:?}", self.query_timeout));
                }
                Ok(None) => std::thread::sleep(POLL_INTERVAL),
                Err(e) => return Err(e.to_string()),
            }
        };

        if !status.success() {
            return Err(format!("exited with {}", status));
        }

        let mut stdout = String::new();
        if let Some(mut out) = child.stdout.take() {
            out.read_to_string(&mut stdout).map_err(|e| e.to_string())?;
        }
        Ok(stdout)
    }
}

impl Default for GsettingsStatusSource {
    fn default() -> Self {
        Self::new()
    }
}

impl AccessibilityStatusSource for GsettingsStatusSource {
    /// Blocks the calling thread for at most the query timeout
    fn is_assistive_mode_active(&self) -> bool {
        match self.query() {
            Ok(output) => parse_bool(&output),
            Err(reason) => {
                warn!(%reason, "gsettings query failed, assuming no screen reader");
                false
            }
        }
    }

    /// Runs `gsettings monitor` for as long as the receiver is alive.
    /// Every line it prints is one notification.
    fn subscribe(&self) -> Result<mpsc::Receiver<()>, AccessibilityError> {
        let mut child = Command::new(&self.program)
            .args(["monitor", SCHEMA, KEY])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| AccessibilityError::Subscribe(e.to_string()))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| AccessibilityError::Subscribe("no stdout from gsettings".to_string()))?;

        let (tx, rx) = mpsc::channel(8);

        tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();

            loop {
                tokio::select! {
                    line = lines.next_line() => match line {
                        Ok(Some(line)) => {
                            debug!(%line, "screen reader setting changed");
                            if tx.send(()).await.is_err() {
                                break;
                            }
                        }
                        Ok(None) => {
                            warn!("gsettings monitor exited");
                            break;
                        }
                        Err(e) => {
                            warn!(?e, "failed to read gsettings monitor output");
                            break;
                        }
                    },
                    _ = tx.closed() => break,
                }
            }

            // Dropping the child kills the monitor process
            drop(child);
            debug!("gsettings monitor released");
        });

        Ok(rx)
    }
}

fn parse_bool(output: &str) -> bool {
    output.trim() == "true"
}
