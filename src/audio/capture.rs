//! Capture subprocess lifecycle.
//!
//! One external capture tool (ffmpeg) is launched per recording, writing
//! mono 44.1 kHz WAV to a timestamp-named file. Stopping escalates:
//! close the control stream, interrupt, wait up to 3 seconds, force-kill.
//! The finished file is read back whole; it stays on disk until the
//! explicit bulk clear.

use async_trait::async_trait;
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use super::paths::{
    capture_file_path, create_recordings_dir, latest_capture_file, wav_duration_ms,
};

pub const DEFAULT_CAPTURE_PROGRAM: &str = "ffmpeg";

/// Bound on waiting for the capture process to exit after an interrupt.
const STOP_TIMEOUT: Duration = Duration::from_secs(3);

/// How often the exit watcher polls the child.
const WATCH_INTERVAL: Duration = Duration::from_millis(500);

/// Errors raised by the capture backend.
#[derive(Debug)]
pub enum CaptureError {
    /// The capture tool could not be launched.
    LaunchFailed(String),
    /// No capture backend for this platform.
    Unsupported,
    /// Stop was requested with no capture in progress.
    NotRecording,
    /// Stop finished but no capture file exists.
    NoAudio,
    /// The capture file exists but could not be read.
    ReadFailed(String),
}

impl std::fmt::Display for CaptureError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CaptureError::LaunchFailed(e) => write!(f, "Failed to start capture process: {}", e),
            CaptureError::Unsupported => {
                write!(f, "Audio capture is not supported on this platform")
            }
            CaptureError::NotRecording => write!(f, "No capture in progress"),
            CaptureError::NoAudio => write!(f, "No capture file was produced"),
            CaptureError::ReadFailed(e) => write!(f, "Failed to read capture file: {}", e),
        }
    }
}

impl std::error::Error for CaptureError {}

/// Capture backend seam. The production implementation drives an external
/// subprocess; tests substitute a stub.
#[async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Begin capturing from `device` (platform default when None). Returns
    /// the path the capture tool writes to.
    async fn start(&self, device: Option<&str>) -> Result<PathBuf, CaptureError>;

    /// Stop capturing and return the recorded bytes.
    async fn stop(&self) -> Result<Vec<u8>, CaptureError>;

    fn is_active(&self) -> bool;
}

/// Handle to one running capture subprocess. Exclusively owned by the
/// active session; fully released before the session settles back to Idle.
struct CaptureHandle {
    child: Arc<Mutex<Child>>,
    stdin: Option<ChildStdin>,
    output_path: PathBuf,
    watcher: JoinHandle<()>,
}

/// Subprocess-based capture backend.
pub struct CaptureProcess {
    program: String,
    recordings_dir: PathBuf,
    handle: Mutex<Option<CaptureHandle>>,
}

impl CaptureProcess {
    pub fn new(recordings_dir: PathBuf) -> Self {
        Self::with_program(DEFAULT_CAPTURE_PROGRAM, recordings_dir)
    }

    /// Use a specific capture tool binary instead of the default.
    pub fn with_program(program: impl Into<String>, recordings_dir: PathBuf) -> Self {
        Self {
            program: program.into(),
            recordings_dir,
            handle: Mutex::new(None),
        }
    }

    /// Terminate any stray capture-tool process left over from a previous
    /// run, matched by executable name.
    async fn kill_strays(&self) {
        let Some(name) = Path::new(&self.program)
            .file_name()
            .and_then(|n| n.to_str())
        else {
            return;
        };
        match Command::new("pkill").arg("-x").arg(name).status().await {
            Ok(status) if status.success() => {
                log::info!("terminated stray {} process", name);
            }
            Ok(_) => {}
            Err(e) => log::debug!("pkill unavailable: {}", e),
        }
    }
}

#[async_trait]
impl CaptureBackend for CaptureProcess {
    async fn start(&self, device: Option<&str>) -> Result<PathBuf, CaptureError> {
        let mut slot = self.handle.lock().await;

        self.kill_strays().await;

        create_recordings_dir(&self.recordings_dir)
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;
        let output_path = capture_file_path(&self.recordings_dir, Utc::now());

        let mut cmd = Command::new(&self.program);
        cmd.args(input_args(device)?);
        cmd.args(["-ac", "1", "-ar", "44100", "-y"]);
        cmd.arg(&output_path);
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| CaptureError::LaunchFailed(e.to_string()))?;
        let stdin = child.stdin.take();
        let pid = child.id();

        let child = Arc::new(Mutex::new(child));
        let watcher = spawn_exit_watcher(Arc::clone(&child), output_path.clone());

        *slot = Some(CaptureHandle {
            child,
            stdin,
            output_path: output_path.clone(),
            watcher,
        });

        log::info!(
            "capture started (pid {:?}, device {:?}): {:?}",
            pid,
            device,
            output_path
        );
        Ok(output_path)
    }

    async fn stop(&self) -> Result<Vec<u8>, CaptureError> {
        let handle = self
            .handle
            .lock()
            .await
            .take()
            .ok_or(CaptureError::NotRecording)?;

        // The watcher must not outlive the handle it observes.
        handle.watcher.abort();

        // Closing the control stream asks the tool to finalize its output.
        drop(handle.stdin);

        {
            let mut child = handle.child.lock().await;

            if !send_interrupt(&child).await {
                log::warn!("interrupt delivery failed, force-killing capture process");
                if let Err(e) = child.start_kill() {
                    log::warn!("force-kill failed: {}", e);
                }
            }

            match tokio::time::timeout(STOP_TIMEOUT, child.wait()).await {
                Ok(Ok(status)) => log::debug!("capture process exited with {}", status),
                Ok(Err(e)) => log::warn!("waiting for capture process failed: {}", e),
                Err(_) => {
                    log::warn!(
                        "capture process did not exit within {:?}, killing",
                        STOP_TIMEOUT
                    );
                    if let Err(e) = child.kill().await {
                        log::warn!("force-kill failed: {}", e);
                    }
                }
            }
        }

        // Sweep for anything the interrupt/kill escalation may have missed.
        self.kill_strays().await;

        let path = match latest_capture_file(&self.recordings_dir) {
            Some(path) => path,
            None => {
                log::warn!("no capture file found (expected {:?})", handle.output_path);
                return Err(CaptureError::NoAudio);
            }
        };
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| CaptureError::ReadFailed(e.to_string()))?;
        if bytes.is_empty() {
            log::warn!("capture file {:?} is empty", path);
            return Err(CaptureError::NoAudio);
        }

        match wav_duration_ms(&path) {
            Some(ms) => log::info!("captured {:?}: {} ms, {} bytes", path, ms, bytes.len()),
            None => log::info!("captured {:?}: {} bytes", path, bytes.len()),
        }
        Ok(bytes)
    }

    fn is_active(&self) -> bool {
        match self.handle.try_lock() {
            Ok(slot) => slot.is_some(),
            // Contention means a start or stop is mid-flight.
            Err(_) => true,
        }
    }
}

/// Platform-specific input arguments for the capture tool.
fn input_args(device: Option<&str>) -> Result<Vec<String>, CaptureError> {
    if cfg!(target_os = "macos") {
        let device = device.unwrap_or("0");
        Ok(vec![
            "-f".to_string(),
            "avfoundation".to_string(),
            "-i".to_string(),
            format!(":{}", device),
        ])
    } else if cfg!(unix) {
        let device = device.unwrap_or("default");
        Ok(vec![
            "-f".to_string(),
            "alsa".to_string(),
            "-i".to_string(),
            device.to_string(),
        ])
    } else {
        Err(CaptureError::Unsupported)
    }
}

/// Graceful-terminate signal. Returns false when delivery failed and the
/// caller should escalate straight to a kill.
async fn send_interrupt(child: &Child) -> bool {
    #[cfg(unix)]
    {
        let Some(pid) = child.id() else {
            // Already reaped; nothing to signal.
            return true;
        };
        match Command::new("kill")
            .arg("-INT")
            .arg(pid.to_string())
            .status()
            .await
        {
            Ok(status) => status.success(),
            Err(e) => {
                log::warn!("failed to run kill: {}", e);
                false
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child;
        false
    }
}

/// Watch for the capture process exiting on its own and log abnormal exit.
/// The task holds only a shared reference to the child and is aborted by
/// `stop()`, so it never keeps a finished handle alive.
fn spawn_exit_watcher(child: Arc<Mutex<Child>>, output_path: PathBuf) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(WATCH_INTERVAL).await;
            let mut guard = child.lock().await;
            match guard.try_wait() {
                Ok(Some(status)) if status.success() => {
                    log::debug!("capture process exited: {}", status);
                    break;
                }
                Ok(Some(status)) => {
                    log::warn!(
                        "capture process exited early with {} ({:?})",
                        status,
                        output_path
                    );
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("capture watcher failed to poll process: {}", e);
                    break;
                }
            }
        }
    })
}
