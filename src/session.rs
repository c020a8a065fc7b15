use crate::diagnosis::{Analysis, DiagnosisService};
use crate::encoded::EncodedImage;
use crate::error::{DiagnosisError, PaddyError, NO_IMAGE_MESSAGE};
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Result of one analyze trigger
#[derive(Debug, Clone, PartialEq)]
pub enum AnalyzeOutcome {
    /// The service produced a diagnosis, now stored as the current result
    Completed(Analysis),
    /// The service failed; its message is now the current error
    Failed(DiagnosisError),
    /// A diagnosis was already pending, nothing was sent
    AlreadyRunning,
    /// There is no image to analyze
    NoImage,
    /// The image was replaced or the session reset while the call was pending
    Superseded,
}

/// Point-in-time copy of the session slot
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub image: Option<EncodedImage>,
    pub analysis: Option<Analysis>,
    pub error: Option<String>,
    pub loading: bool,
}

#[derive(Default)]
struct SessionState {
    image: Option<EncodedImage>,
    analysis: Option<Analysis>,
    error: Option<String>,
    loading: bool,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl SessionState {
    /// Invalidate whatever call is pending
    fn supersede(&mut self) {
        self.generation = self.generation.wrapping_add(1);
        self.loading = false;
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
    }
}

/// Releases the busy flag of an analyze call that is dropped before it
/// finishes. Leaves a newer call's state alone.
struct PendingCall<'a> {
    session: &'a Session,
    generation: u64,
    armed: bool,
}

impl PendingCall<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for PendingCall<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        let mut state = self.session.state.lock();
        if state.generation == self.generation && state.loading {
            warn!("Diagnosis dropped before completion; releasing busy flag");
            state.loading = false;
            state.in_flight = None;
        }
    }
}

/// The caller-side slot: at most one current image, one result or one error,
/// and at most one diagnosis in flight.
#[derive(Default)]
pub struct Session {
    state: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `image` the current image. The image is stored before the old
    /// result and error are cleared; a pending diagnosis is abandoned.
    pub fn set_image(&self, image: EncodedImage) {
        let mut state = self.state.lock();
        debug!("New image ({}, {} bytes)", image.mime_type(), image.len());
        state.image = Some(image);
        state.analysis = None;
        state.error = None;
        state.supersede();
    }

    /// Record an acquisition failure as the current error, replacing any result
    pub fn record_error(&self, error: &PaddyError) {
        let mut state = self.state.lock();
        state.analysis = None;
        state.error = Some(error.user_message());
    }

    /// Clear image, result, error and loading together
    pub fn reset(&self) {
        let mut state = self.state.lock();
        info!("Resetting session");
        state.image = None;
        state.analysis = None;
        state.error = None;
        state.supersede();
    }

    pub fn is_loading(&self) -> bool {
        self.state.lock().loading
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state.lock();
        SessionSnapshot {
            image: state.image.clone(),
            analysis: state.analysis.clone(),
            error: state.error.clone(),
            loading: state.loading,
        }
    }

    /// Diagnose the current image.
    ///
    /// A trigger while a diagnosis is pending returns `AlreadyRunning` without
    /// calling the service. If the session is reset or given a new image before
    /// the service answers, the answer is dropped.
    pub async fn analyze(&self, service: &dyn DiagnosisService) -> AnalyzeOutcome {
        let (image, generation, token) = {
            let mut state = self.state.lock();

            if state.loading {
                debug!("Diagnosis already pending, ignoring trigger");
                return AnalyzeOutcome::AlreadyRunning;
            }

            let image = match state.image.clone() {
                Some(image) => image,
                None => {
                    warn!("Analyze requested with no image");
                    state.error = Some(NO_IMAGE_MESSAGE.to_string());
                    return AnalyzeOutcome::NoImage;
                }
            };

            let token = CancellationToken::new();
            state.loading = true;
            state.analysis = None;
            state.error = None;
            state.in_flight = Some(token.clone());
            (image, state.generation, token)
        };
        let pending = PendingCall {
            session: self,
            generation,
            armed: true,
        };

        let result = tokio::select! {
            biased;
            _ = token.cancelled() => {
                info!("Pending diagnosis abandoned");
                return AnalyzeOutcome::Superseded;
            }
            result = service.analyze(&image) => result,
        };
        pending.disarm();

        let mut state = self.state.lock();
        if state.generation != generation {
            info!("Dropping diagnosis for a replaced image");
            return AnalyzeOutcome::Superseded;
        }

        state.loading = false;
        state.in_flight = None;

        match result {
            Ok(analysis) => {
                state.analysis = Some(analysis.clone());
                AnalyzeOutcome::Completed(analysis)
            }
            Err(e) => {
                state.error = Some(e.user_message().to_string());
                AnalyzeOutcome::Failed(e)
            }
        }
    }
}
