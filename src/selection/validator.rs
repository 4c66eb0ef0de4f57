use std::fmt;
use thiserror::Error;

pub const LABEL_PATTERN: &str = "[a-zA-Z0-9]+";
pub const OTHER_DATA_TYPE_PATTERN: &str = "[a-z]+";

/// Which text field a label belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LabelField {
    Subject,
    Session,
    DataTypeOther,
}

impl LabelField {
    pub fn name(self) -> &'static str {
        match self {
            LabelField::Subject => "subject label",
            LabelField::Session => "session label",
            LabelField::DataTypeOther => "other data type",
        }
    }

    pub fn pattern(self) -> &'static str {
        match self {
            LabelField::Subject | LabelField::Session => LABEL_PATTERN,
            LabelField::DataTypeOther => OTHER_DATA_TYPE_PATTERN,
        }
    }

    pub fn is_valid(self, candidate: &str) -> bool {
        match self {
            LabelField::Subject => is_valid_subject_label(candidate),
            LabelField::Session => is_valid_session_label(candidate),
            LabelField::DataTypeOther => is_valid_data_type_other(candidate),
        }
    }

    /// Inline message for an invalid candidate.
    pub fn check(self, candidate: &str) -> Result<(), LabelError> {
        if candidate.is_empty() {
            Err(LabelError::Empty(self))
        } else if self.is_valid(candidate) {
            Ok(())
        } else {
            Err(LabelError::Malformed(self))
        }
    }
}

impl fmt::Display for LabelField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn pattern_of(field: &LabelField) -> &'static str {
    field.pattern()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LabelError {
    #[error("Please input your {0}")]
    Empty(LabelField),

    #[error("Must be of form {}", pattern_of(.0))]
    Malformed(LabelField),

    #[error("Cannot set the {0} before the previous step is complete")]
    NotUnlocked(LabelField),

    #[error("Select a project first")]
    NoProject,

    #[error("Select a session first")]
    NoSession,

    #[error("Unknown data type: {0}")]
    UnknownDataType(String),
}

pub fn is_valid_subject_label(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_valid_session_label(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_valid_data_type_other(candidate: &str) -> bool {
    !candidate.is_empty() && candidate.chars().all(|c| c.is_ascii_lowercase())
}

/// Value to keep after `candidate` failed validation: an emptied field is
/// cleared, anything else falls back to the last accepted value.
pub fn revert_or_clear(candidate: &str, previous: &str) -> String {
    if candidate.is_empty() {
        String::new()
    } else {
        previous.to_string()
    }
}
