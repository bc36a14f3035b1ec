//! Routing of task failures.

use crate::actor::{ERROR, OUTPUT};
use crate::director::DirectorHandle;
use crate::observability::EXECUTION_TRACE_TARGET;
use gangway_core::error::{ErrorCode, Result};
use gangway_core::message::{Message, headers};
use gangway_core::types::ActorId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What a task-based actor does with a failed or timed-out task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorControlStrategy {
    /// Forward the original message on the output port as if the task succeeded.
    ContinueViaOutput,
    /// Forward the original message on the error port.
    ContinueViaErrorPort,
    /// Emit an error message, caused by the original, on the error port.
    #[default]
    ErrorViaErrorPort,
}

impl ErrorControlStrategy {
    /// Display name, as used in flow definitions.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ContinueViaOutput => "Continue via output port",
            Self::ContinueViaErrorPort => "Continue via error port",
            Self::ErrorViaErrorPort => "Error via error port",
        }
    }

    /// Route a failure of the work started for `message`.
    ///
    /// Returns the number of destinations reached.
    pub fn route(
        &self,
        director: &DirectorHandle,
        actor: &ActorId,
        message: &Message,
        code: ErrorCode,
        text: &str,
    ) -> Result<usize> {
        tracing::error!(
            target: EXECUTION_TRACE_TARGET,
            actor = %actor,
            code = %code,
            strategy = self.as_str(),
            "{text}"
        );
        match self {
            Self::ContinueViaOutput => director.send(&actor.port(OUTPUT), message.clone()),
            Self::ContinueViaErrorPort => director.send(&actor.port(ERROR), message.clone()),
            Self::ErrorViaErrorPort => {
                let error = message
                    .caused_copy()
                    .with_header(headers::ERROR_CODE, code.as_str())
                    .with_header(headers::ERROR_MESSAGE, text);
                director.send(&actor.port(ERROR), error)
            }
        }
    }
}

impl fmt::Display for ErrorControlStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ErrorControlStrategy {
    type Err = std::convert::Infallible;

    /// Unknown names select the default.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s.trim() {
            "Continue via output port" | "continue_via_output" => Self::ContinueViaOutput,
            "Continue via error port" | "continue_via_error_port" => Self::ContinueViaErrorPort,
            _ => Self::ErrorViaErrorPort,
        })
    }
}
