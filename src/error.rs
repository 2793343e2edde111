//! Errors that abort a scheduling call.
//!
//! Per-slot constraint violations and unusable availability data are not
//! errors: they surface as [`ValidationError`] values and unscheduled
//! units. Only structurally broken input, bad configuration and explicit
//! timeout checkpoints abort.

use thiserror::Error;

use crate::config::ConfigError;
use crate::timeout::TimeoutExceeded;
use crate::validation::ValidationError;

/// Scheduling error.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("invalid input ({} problem(s)): {}", .0.len(), summarize(.0))]
    InvalidInput(Vec<ValidationError>),

    #[error("unknown course: {0}")]
    UnknownCourse(String),

    #[error("unknown classroom: {0}")]
    UnknownClassroom(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Timeout(#[from] TimeoutExceeded),
}

fn summarize(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ClassroomRecord, CourseRecord};
    use crate::validation::validate_input;

    #[test]
    fn test_invalid_input_message() {
        let courses = vec![CourseRecord::new("C1"), CourseRecord::new("C1")];
        let rooms: Vec<ClassroomRecord> = Vec::new();
        let errors = validate_input(&courses, &rooms).unwrap_err();
        let err = ScheduleError::InvalidInput(errors);
        let text = err.to_string();
        assert!(text.starts_with("invalid input (1 problem(s))"));
        assert!(text.contains("C1"));
    }

    #[test]
    fn test_from_conversions() {
        let err: ScheduleError = ConfigError::UnknownPreset("turbo".into()).into();
        assert_eq!(err.to_string(), "Unknown preset: turbo");

        let err: ScheduleError = TimeoutExceeded {
            limit_ms: 10,
            elapsed_ms: 12,
        }
        .into();
        assert!(matches!(err, ScheduleError::Timeout(_)));
    }
}
