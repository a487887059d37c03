//! Results of best-effort steps.
//!
//! Provisioning the IFB device and every teardown deletion swallow their failures. [`Outcome`]
//! records what actually happened so callers can tell "already there" or "nothing to delete"
//! apart from a genuine error, without changing what the shaper does next.

use std::fmt;

use crate::command;

/// What a best-effort step ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The command succeeded.
    Done,
    /// The object to create was already present.
    Exists,
    /// The object to delete (or the device it lives on) was absent.
    NotFound,
    /// Any other failure, with the reason.
    Failed(String),
    /// The step was not attempted because an earlier one made it impossible.
    Skipped,
}

/// Fragments of `tc`/`ip`/`modprobe` stderr meaning the object already exists.
const EXISTS: &[&str] = &["File exists", "Exclusivity flag on"];

/// Fragments meaning the object (or its device) is missing.
const NOT_FOUND: &[&str] = &[
    "No such file or directory",
    "Cannot find device",
    "Cannot delete qdisc with handle of zero",
    "Cannot find specified qdisc",
    "Invalid handle",
    "No such device",
];

impl Outcome {
    /// Classifies the result of a privileged command.
    pub fn from_result<T>(result: &command::Result<T>) -> Self {
        match result {
            Ok(_) => Self::Done,
            Err(err) => Self::from_error(err),
        }
    }

    /// Classifies a command error from its captured stderr.
    pub fn from_error(err: &command::Error) -> Self {
        let Some(stderr) = err.stderr() else {
            return Self::Failed(err.to_string());
        };

        if EXISTS.iter().any(|needle| stderr.contains(needle)) {
            Self::Exists
        } else if NOT_FOUND.iter().any(|needle| stderr.contains(needle)) {
            Self::NotFound
        } else {
            Self::Failed(stderr.trim().to_string())
        }
    }

    /// `true` unless the step failed for a reason other than presence/absence.
    pub fn is_benign(&self) -> bool {
        !matches!(self, Self::Failed(_))
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Done => f.write_str("done"),
            Self::Exists => f.write_str("already present"),
            Self::NotFound => f.write_str("not found"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
            Self::Skipped => f.write_str("skipped"),
        }
    }
}
