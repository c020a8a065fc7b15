use crate::camera::{CameraPanel, FacingMode, FrameCapturer};
use crate::encoded::EncodedImage;
use crate::error::{PaddyError, Result};
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode};
use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// How a capture prompt ended
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureOutcome {
    /// A still was taken; the camera is already released
    Captured(EncodedImage),
    /// The user backed out or the prompt was stopped
    Cancelled,
    /// The camera could not be opened; carries the message for the user
    Unavailable(String),
}

/// What a key press asks the prompt to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptAction {
    Capture,
    Cancel,
}

/// Map a key event onto a prompt action. Only presses count.
pub fn action_for(key: &KeyEvent) -> Option<PromptAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }

    match key.code {
        KeyCode::Char(' ') | KeyCode::Enter => Some(PromptAction::Capture),
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(PromptAction::Cancel)
        }
        KeyCode::Char('q') | KeyCode::Esc => Some(PromptAction::Cancel),
        _ => None,
    }
}

/// Interactive camera dialog driven from the terminal: SPACE takes the still,
/// ESC or q cancels. The camera is released on every way out.
pub struct CapturePrompt {
    capturer: Arc<FrameCapturer>,
    cancellation_token: CancellationToken,
}

impl CapturePrompt {
    pub fn new(capturer: Arc<FrameCapturer>) -> Self {
        Self {
            capturer,
            cancellation_token: CancellationToken::new(),
        }
    }

    /// Token that ends the prompt as a cancel when triggered
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation_token.clone()
    }

    /// Open the camera and wait for the user
    pub async fn run(&self, facing: FacingMode) -> Result<CaptureOutcome> {
        let capturer = Arc::clone(&self.capturer);
        let cancellation_token = self.cancellation_token.clone();

        task::spawn_blocking(move || run_blocking(&capturer, facing, &cancellation_token))
            .await
            .map_err(|e| PaddyError::system(format!("Capture prompt task failed: {}", e)))?
    }

    /// Stop the prompt; an open camera is released
    pub fn stop(&self) {
        info!("Stopping capture prompt");
        self.cancellation_token.cancel();
    }
}

/// Restores cooked mode however the loop exits
struct RawModeGuard;

impl RawModeGuard {
    fn enable() -> Result<Self> {
        enable_raw_mode()?;
        debug!("Raw mode enabled");
        Ok(Self)
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Err(e) = disable_raw_mode() {
            error!("Failed to disable raw mode: {}", e);
        } else {
            debug!("Raw mode disabled");
        }
    }
}

fn run_blocking(
    capturer: &FrameCapturer,
    facing: FacingMode,
    cancellation_token: &CancellationToken,
) -> Result<CaptureOutcome> {
    let mut panel = CameraPanel::open(capturer, facing);
    if let Some(message) = panel.error() {
        return Ok(CaptureOutcome::Unavailable(message.to_string()));
    }

    say(&format!(
        "Camera ready ({}). Press SPACE to capture, ESC or q to cancel.",
        panel.device_label().unwrap_or("camera")
    ));

    let _raw_mode = RawModeGuard::enable()?;

    loop {
        if cancellation_token.is_cancelled() {
            debug!("Capture prompt cancelled");
            panel.close();
            return Ok(CaptureOutcome::Cancelled);
        }

        match event::poll(Duration::from_millis(100)) {
            Ok(true) => {
                let key = match event::read() {
                    Ok(Event::Key(key)) => key,
                    Ok(_) => continue,
                    Err(e) => {
                        warn!("Error reading keyboard event: {}", e);
                        continue;
                    }
                };

                match action_for(&key) {
                    Some(PromptAction::Capture) => {
                        info!("Capture requested");
                        if let Some(still) = panel.capture() {
                            return Ok(CaptureOutcome::Captured(still));
                        }
                        if let Some(message) = panel.error() {
                            say(message);
                        }
                    }
                    Some(PromptAction::Cancel) => {
                        info!("Capture cancelled by user");
                        panel.close();
                        return Ok(CaptureOutcome::Cancelled);
                    }
                    None => debug!("Key pressed: {:?}", key.code),
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Error polling for keyboard events: {}", e);
            }
        }
    }
}

// raw mode needs an explicit carriage return
fn say(message: &str) {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "{}\r\n", message);
    let _ = stderr.flush();
}
