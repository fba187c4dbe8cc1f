use tracing::{debug, warn};

use crate::models::{EventValidation, LocationFix};

#[derive(Debug, Clone, Default, PartialEq)]
pub enum SubmissionPhase {
    #[default]
    Idle,
    ValidatingCode {
        event_code: String,
    },
    /// Code accepted and window active; the form is fillable and waits for Submit.
    CodeValidated {
        validation: EventValidation,
    },
    AwaitingLocation {
        validation: EventValidation,
    },
    ResolvingPlaceName {
        validation: EventValidation,
        fix: LocationFix,
    },
    Sending {
        validation: EventValidation,
        fix: LocationFix,
    },
    Success {
        event_code: String,
        message: String,
        token: String,
    },
    Failure {
        message: String,
    },
}

impl SubmissionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            SubmissionPhase::Idle => "idle",
            SubmissionPhase::ValidatingCode { .. } => "validating_code",
            SubmissionPhase::CodeValidated { .. } => "code_validated",
            SubmissionPhase::AwaitingLocation { .. } => "awaiting_location",
            SubmissionPhase::ResolvingPlaceName { .. } => "resolving_place_name",
            SubmissionPhase::Sending { .. } => "sending",
            SubmissionPhase::Success { .. } => "success",
            SubmissionPhase::Failure { .. } => "failure",
        }
    }

    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            SubmissionPhase::ValidatingCode { .. }
                | SubmissionPhase::AwaitingLocation { .. }
                | SubmissionPhase::ResolvingPlaceName { .. }
                | SubmissionPhase::Sending { .. }
        )
    }

    pub fn validated_code(&self) -> Option<&str> {
        match self {
            SubmissionPhase::CodeValidated { validation } => Some(validation.event_code.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IllegalTransition {
    pub action: &'static str,
    pub from: &'static str,
}

impl std::fmt::Display for IllegalTransition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "cannot {} while {}", self.action, self.from)
    }
}

impl std::error::Error for IllegalTransition {}

/// Explicit state for one attendance attempt. Every change goes through a
/// named action; an action that does not apply leaves the phase untouched.
#[derive(Debug, Default)]
pub struct SubmissionFlow {
    phase: SubmissionPhase,
}

impl SubmissionFlow {
    pub fn phase(&self) -> &SubmissionPhase {
        &self.phase
    }

    fn transition(
        &mut self,
        action: &'static str,
        step: impl FnOnce(SubmissionPhase) -> Result<SubmissionPhase, SubmissionPhase>,
    ) -> Result<(), IllegalTransition> {
        let from = self.phase.name();
        let current = std::mem::take(&mut self.phase);
        match step(current) {
            Ok(next) => {
                debug!("Submission phase: {} -> {} ({})", from, next.name(), action);
                self.phase = next;
                Ok(())
            }
            Err(unchanged) => {
                warn!("Rejected action {} in phase {}", action, from);
                self.phase = unchanged;
                Err(IllegalTransition { action, from })
            }
        }
    }

    pub fn gate_check(&mut self, event_code: &str) -> Result<(), IllegalTransition> {
        let event_code = event_code.trim().to_string();
        self.transition("gate_check", |phase| match phase {
            SubmissionPhase::Idle | SubmissionPhase::CodeValidated { .. } => {
                Ok(SubmissionPhase::ValidatingCode { event_code })
            }
            other => Err(other),
        })
    }

    pub fn validate_ok(&mut self, validation: EventValidation) -> Result<(), IllegalTransition> {
        self.transition("validate_ok", |phase| match phase {
            SubmissionPhase::ValidatingCode { .. } => {
                Ok(SubmissionPhase::CodeValidated { validation })
            }
            other => Err(other),
        })
    }

    /// Invalid code, closed window or unreachable service: back to idle,
    /// nothing retained. The caller reports `reason` to the user.
    pub fn validate_fail(&mut self, reason: &str) -> Result<(), IllegalTransition> {
        debug!("Validation failed: {}", reason);
        self.transition("validate_fail", |phase| match phase {
            SubmissionPhase::ValidatingCode { .. } => Ok(SubmissionPhase::Idle),
            other => Err(other),
        })
    }

    pub fn begin_locate(&mut self) -> Result<(), IllegalTransition> {
        self.transition("begin_locate", |phase| match phase {
            SubmissionPhase::CodeValidated { validation } => {
                Ok(SubmissionPhase::AwaitingLocation { validation })
            }
            other => Err(other),
        })
    }

    pub fn locate_ok(&mut self, fix: LocationFix) -> Result<(), IllegalTransition> {
        self.transition("locate_ok", |phase| match phase {
            SubmissionPhase::AwaitingLocation { validation } => {
                Ok(SubmissionPhase::ResolvingPlaceName { validation, fix })
            }
            other => Err(other),
        })
    }

    /// Geolocation errors abort the attempt from any in-progress phase.
    pub fn locate_fail(&mut self, message: impl Into<String>) -> Result<(), IllegalTransition> {
        let message = message.into();
        self.transition("locate_fail", |phase| {
            if phase.is_busy() {
                Ok(SubmissionPhase::Failure { message })
            } else {
                Err(phase)
            }
        })
    }

    pub fn geocode_done(&mut self, resolved_name: String) -> Result<(), IllegalTransition> {
        self.transition("geocode_done", |phase| match phase {
            SubmissionPhase::ResolvingPlaceName { validation, mut fix } => {
                fix.resolved_name = Some(resolved_name);
                Ok(SubmissionPhase::Sending { validation, fix })
            }
            other => Err(other),
        })
    }

    pub fn submit_ok(&mut self, message: String, token: String) -> Result<(), IllegalTransition> {
        self.transition("submit_ok", |phase| match phase {
            SubmissionPhase::Sending { validation, .. } => Ok(SubmissionPhase::Success {
                event_code: validation.event_code,
                message,
                token,
            }),
            other => Err(other),
        })
    }

    pub fn submit_fail(&mut self, message: impl Into<String>) -> Result<(), IllegalTransition> {
        let message = message.into();
        self.transition("submit_fail", |phase| match phase {
            SubmissionPhase::Sending { .. } | SubmissionPhase::CodeValidated { .. } => {
                Ok(SubmissionPhase::Failure { message })
            }
            other => Err(other),
        })
    }

    pub fn acknowledge(&mut self) -> Result<(), IllegalTransition> {
        self.transition("acknowledge", |phase| match phase {
            SubmissionPhase::Success { .. } | SubmissionPhase::Failure { .. } => {
                Ok(SubmissionPhase::Idle)
            }
            other => Err(other),
        })
    }
}
