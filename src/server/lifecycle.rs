use crate::{Error, Result};
use tracing::{debug, warn};

// Request states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestState {
    Received,
    Validated,
    Staged,
    Prompted,
    Generated,
    Responded,
    Failed,
}

// Request events
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestEvent {
    UploadAccepted,
    UploadStaged,
    PromptBuilt,
    GenerationFinished,
    ResponseSent,
    ErrorOccurred,
}

/// Tracks one `/infer` request from receipt to its terminal state.
#[derive(Debug)]
pub struct RequestLifecycle {
    id: String,
    state: RequestState,
}

impl RequestLifecycle {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            state: RequestState::Received,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn current_state(&self) -> RequestState {
        self.state
    }

    pub fn transition(&mut self, event: RequestEvent) -> Result<RequestState> {
        use RequestEvent::*;
        use RequestState::*;

        let new_state = match (self.state, event) {
            (Received, UploadAccepted) => Validated,
            (Validated, UploadStaged) => Staged,
            (Staged, PromptBuilt) => Prompted,
            (Prompted, GenerationFinished) => Generated,
            (Generated, ResponseSent) => Responded,
            (Received | Validated | Staged | Prompted | Generated, ErrorOccurred) => Failed,
            (state, event) => {
                warn!(
                    "Invalid request transition from {:?} with event {:?} ({})",
                    state, event, self.id
                );
                return Err(Error::InvalidTransition {
                    current: format!("{:?}", state),
                    requested: format!("{:?}", event),
                });
            }
        };

        debug!("Request {}: {:?} -> {:?}", self.id, self.state, new_state);
        self.state = new_state;
        Ok(new_state)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, RequestState::Responded | RequestState::Failed)
    }
}
