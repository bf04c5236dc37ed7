//! Exit, batch and repeat status types.

use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;

/// The outcome tag of a step, and the only value flow transitions look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ExitStatus {
    /// The step finished normally.
    Completed,
    /// The step aborted or was forced to fail.
    Failed,
    /// Any other code chosen by a step for flow control.
    Custom(String),
}

impl ExitStatus {
    /// Creates a custom exit status.
    #[must_use]
    pub fn custom(code: impl Into<String>) -> Self {
        Self::from(code.into())
    }

    /// Returns the status code as used in transition tables.
    #[must_use]
    pub fn code(&self) -> &str {
        match self {
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
            Self::Custom(code) => code,
        }
    }

    /// Returns true for the `FAILED` code.
    #[must_use]
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

impl Default for ExitStatus {
    fn default() -> Self {
        Self::Completed
    }
}

impl fmt::Display for ExitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl From<String> for ExitStatus {
    fn from(code: String) -> Self {
        match code.as_str() {
            "COMPLETED" => Self::Completed,
            "FAILED" => Self::Failed,
            _ => Self::Custom(code),
        }
    }
}

impl From<&str> for ExitStatus {
    fn from(code: &str) -> Self {
        Self::from(code.to_string())
    }
}

impl From<ExitStatus> for String {
    fn from(status: ExitStatus) -> Self {
        status.code().to_string()
    }
}

impl FromStr for ExitStatus {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

/// Lifecycle status of a step or job execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchStatus {
    /// Created, not yet running.
    Starting,
    /// Currently running.
    Started,
    /// Finished successfully.
    Completed,
    /// Finished with a failure.
    Failed,
}

impl Default for BatchStatus {
    fn default() -> Self {
        Self::Starting
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Starting => write!(f, "STARTING"),
            Self::Started => write!(f, "STARTED"),
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

impl BatchStatus {
    /// Returns true if the status represents a terminal state.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Returns true if the status indicates success.
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// What a tasklet wants to happen after one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RepeatStatus {
    /// The tasklet is done.
    Finished,
    /// Invoke the tasklet again.
    Continuable,
}

impl RepeatStatus {
    /// Returns true if the tasklet asked to run again.
    #[must_use]
    pub fn is_continuable(&self) -> bool {
        matches!(self, Self::Continuable)
    }
}
