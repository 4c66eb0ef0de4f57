use super::validator::{revert_or_clear, LabelError, LabelField};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Fixed data types offered in the data type picker, besides "other".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Mri,
    Meg,
    Eeg,
    Ieeg,
    Beh,
}

pub const OTHER_DATA_TYPE: &str = "other";

impl DataType {
    pub const ALL: [DataType; 5] = [
        DataType::Mri,
        DataType::Meg,
        DataType::Eeg,
        DataType::Ieeg,
        DataType::Beh,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::Mri => "mri",
            DataType::Meg => "meg",
            DataType::Eeg => "eeg",
            DataType::Ieeg => "ieeg",
            DataType::Beh => "beh",
        }
    }

    /// Every entry of the picker, in display order.
    pub fn choices() -> impl Iterator<Item = &'static str> {
        Self::ALL
            .iter()
            .map(|data_type| data_type.as_str())
            .chain(std::iter::once(OTHER_DATA_TYPE))
    }
}

impl FromStr for DataType {
    type Err = LabelError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|data_type| data_type.as_str() == value)
            .ok_or_else(|| LabelError::UnknownDataType(value.to_string()))
    }
}

/// Data type of a complete destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataTypeValue {
    Fixed(DataType),
    /// Free text entered after choosing "other".
    Other(String),
}

impl DataTypeValue {
    pub fn as_str(&self) -> &str {
        match self {
            DataTypeValue::Fixed(data_type) => data_type.as_str(),
            DataTypeValue::Other(text) => text,
        }
    }
}

impl fmt::Display for DataTypeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Position in the project → subject → session → data type wizard.
///
/// Each variant carries exactly the fields that are valid at that step, so a
/// session without a subject cannot be represented.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SelectionState {
    #[default]
    NoProject,
    ProjectSelected {
        project: String,
    },
    SubjectSet {
        project: String,
        subject: String,
    },
    SessionSet {
        project: String,
        subject: String,
        session: String,
    },
    DataTypeOtherPending {
        project: String,
        subject: String,
        session: String,
    },
    DataTypeSet {
        project: String,
        subject: String,
        session: String,
        data_type: DataTypeValue,
    },
}

impl SelectionState {
    fn project(&self) -> Option<&str> {
        match self {
            SelectionState::NoProject => None,
            SelectionState::ProjectSelected { project }
            | SelectionState::SubjectSet { project, .. }
            | SelectionState::SessionSet { project, .. }
            | SelectionState::DataTypeOtherPending { project, .. }
            | SelectionState::DataTypeSet { project, .. } => Some(project),
        }
    }

    fn subject(&self) -> Option<(&str, &str)> {
        match self {
            SelectionState::SubjectSet { project, subject }
            | SelectionState::SessionSet {
                project, subject, ..
            }
            | SelectionState::DataTypeOtherPending {
                project, subject, ..
            }
            | SelectionState::DataTypeSet {
                project, subject, ..
            } => Some((project, subject)),
            _ => None,
        }
    }

    fn session(&self) -> Option<(&str, &str, &str)> {
        match self {
            SelectionState::SessionSet {
                project,
                subject,
                session,
            }
            | SelectionState::DataTypeOtherPending {
                project,
                subject,
                session,
            }
            | SelectionState::DataTypeSet {
                project,
                subject,
                session,
                ..
            } => Some((project, subject, session)),
            _ => None,
        }
    }
}

/// Destination path as far as it is set; used for display.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionPath {
    pub project_number: Option<String>,
    pub subject_label: Option<String>,
    pub session_label: Option<String>,
    pub data_type: Option<String>,
}

impl fmt::Display for SelectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let segments = [
            self.project_number.clone(),
            self.subject_label.as_ref().map(|s| format!("sub-{}", s)),
            self.session_label.as_ref().map(|s| format!("ses-{}", s)),
            self.data_type.clone(),
        ];
        let path: Vec<String> = segments.into_iter().map_while(|segment| segment).collect();
        f.write_str(&path.join(" / "))
    }
}

/// A complete destination, only obtainable once the data type is set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub project_number: String,
    pub subject_label: String,
    pub session_label: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionEvent {
    SelectProject(String),
    SubjectChanged(String),
    SessionChanged(String),
    DataTypeSelected(String),
    DataTypeOtherChanged(String),
}

/// Gating wizard for the upload destination.
///
/// Besides the state, it keeps the last accepted text of each label field so
/// an invalid edit can fall back to it.
#[derive(Debug, Clone, Default)]
pub struct SelectionMachine {
    state: SelectionState,
    subject_value: String,
    session_value: String,
    data_type_other_value: String,
}

impl SelectionMachine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SelectionState {
        &self.state
    }

    /// Single transition function. On an invalid label the machine still
    /// moves (backwards) and the returned error is the inline message.
    pub fn apply(&mut self, event: SelectionEvent) -> Result<(), LabelError> {
        debug!("Selection event: {:?}", event);
        match event {
            SelectionEvent::SelectProject(project) => self.select_project(project),
            SelectionEvent::SubjectChanged(label) => self.change_subject(label),
            SelectionEvent::SessionChanged(label) => self.change_session(label),
            SelectionEvent::DataTypeSelected(value) => self.select_data_type(&value),
            SelectionEvent::DataTypeOtherChanged(text) => self.change_data_type_other(text),
        }
    }

    fn select_project(&mut self, project: String) -> Result<(), LabelError> {
        self.subject_value.clear();
        self.session_value.clear();
        self.data_type_other_value.clear();
        if project.is_empty() {
            self.state = SelectionState::NoProject;
            return Err(LabelError::NoProject);
        }
        self.state = SelectionState::ProjectSelected { project };
        Ok(())
    }

    fn change_subject(&mut self, label: String) -> Result<(), LabelError> {
        let project = self
            .state
            .project()
            .ok_or(LabelError::NoProject)?
            .to_string();

        self.session_value.clear();
        self.data_type_other_value.clear();

        match LabelField::Subject.check(&label) {
            Ok(()) => {
                self.subject_value = label.clone();
                self.state = SelectionState::SubjectSet {
                    project,
                    subject: label,
                };
                Ok(())
            }
            Err(err) => {
                self.subject_value = revert_or_clear(&label, &self.subject_value);
                self.state = SelectionState::ProjectSelected { project };
                Err(err)
            }
        }
    }

    fn change_session(&mut self, label: String) -> Result<(), LabelError> {
        let (project, subject) = self
            .state
            .subject()
            .map(|(p, s)| (p.to_string(), s.to_string()))
            .ok_or(LabelError::NotUnlocked(LabelField::Session))?;

        self.data_type_other_value.clear();

        match LabelField::Session.check(&label) {
            Ok(()) => {
                self.session_value = label.clone();
                self.state = SelectionState::SessionSet {
                    project,
                    subject,
                    session: label,
                };
                Ok(())
            }
            Err(err) => {
                self.session_value = revert_or_clear(&label, &self.session_value);
                self.state = SelectionState::SubjectSet { project, subject };
                Err(err)
            }
        }
    }

    fn select_data_type(&mut self, value: &str) -> Result<(), LabelError> {
        let (project, subject, session) = self
            .state
            .session()
            .map(|(p, sub, ses)| (p.to_string(), sub.to_string(), ses.to_string()))
            .ok_or(LabelError::NoSession)?;

        let next = if value == OTHER_DATA_TYPE {
            SelectionState::DataTypeOtherPending {
                project,
                subject,
                session,
            }
        } else {
            SelectionState::DataTypeSet {
                data_type: DataTypeValue::Fixed(value.parse()?),
                project,
                subject,
                session,
            }
        };

        self.data_type_other_value.clear();
        self.state = next;
        Ok(())
    }

    fn change_data_type_other(&mut self, text: String) -> Result<(), LabelError> {
        let other_selected = matches!(
            &self.state,
            SelectionState::DataTypeOtherPending { .. }
                | SelectionState::DataTypeSet {
                    data_type: DataTypeValue::Other(_),
                    ..
                }
        );
        if !other_selected {
            return Err(LabelError::NotUnlocked(LabelField::DataTypeOther));
        }
        let (project, subject, session) = self
            .state
            .session()
            .map(|(p, sub, ses)| (p.to_string(), sub.to_string(), ses.to_string()))
            .ok_or(LabelError::NoSession)?;

        match LabelField::DataTypeOther.check(&text) {
            Ok(()) => {
                self.data_type_other_value = text.clone();
                self.state = SelectionState::DataTypeSet {
                    project,
                    subject,
                    session,
                    data_type: DataTypeValue::Other(text),
                };
                Ok(())
            }
            Err(err) => {
                self.data_type_other_value =
                    revert_or_clear(&text, &self.data_type_other_value);
                self.state = SelectionState::DataTypeOtherPending {
                    project,
                    subject,
                    session,
                };
                Err(err)
            }
        }
    }

    pub fn subject_unlocked(&self) -> bool {
        self.state.project().is_some()
    }

    pub fn session_unlocked(&self) -> bool {
        self.state.subject().is_some()
    }

    pub fn data_type_unlocked(&self) -> bool {
        self.state.session().is_some()
    }

    /// Whether the free-text field for "other" should be shown.
    pub fn data_type_other_unlocked(&self) -> bool {
        matches!(
            &self.state,
            SelectionState::DataTypeOtherPending { .. }
                | SelectionState::DataTypeSet {
                    data_type: DataTypeValue::Other(_),
                    ..
                }
        )
    }

    /// Entry currently shown in the data type picker.
    pub fn selected_data_type(&self) -> Option<&str> {
        match &self.state {
            SelectionState::DataTypeOtherPending { .. } => Some(OTHER_DATA_TYPE),
            SelectionState::DataTypeSet { data_type, .. } => Some(match data_type {
                DataTypeValue::Fixed(data_type) => data_type.as_str(),
                DataTypeValue::Other(_) => OTHER_DATA_TYPE,
            }),
            _ => None,
        }
    }

    /// Last accepted text of a label field, kept for display even when the
    /// state has regressed past it.
    pub fn label_value(&self, field: LabelField) -> &str {
        match field {
            LabelField::Subject => &self.subject_value,
            LabelField::Session => &self.session_value,
            LabelField::DataTypeOther => &self.data_type_other_value,
        }
    }

    pub fn path(&self) -> SelectionPath {
        let mut path = SelectionPath {
            project_number: self.state.project().map(str::to_string),
            ..SelectionPath::default()
        };
        if let Some((_, subject)) = self.state.subject() {
            path.subject_label = Some(subject.to_string());
        }
        if let Some((_, _, session)) = self.state.session() {
            path.session_label = Some(session.to_string());
        }
        if let SelectionState::DataTypeSet { data_type, .. } = &self.state {
            path.data_type = Some(data_type.to_string());
        }
        path
    }

    pub fn destination(&self) -> Option<Destination> {
        match &self.state {
            SelectionState::DataTypeSet {
                project,
                subject,
                session,
                data_type,
            } => Some(Destination {
                project_number: project.clone(),
                subject_label: subject.clone(),
                session_label: session.clone(),
                data_type: data_type.to_string(),
            }),
            _ => None,
        }
    }

    /// Upload needs a complete destination and at least one file.
    pub fn upload_permitted(&self, file_count: usize) -> bool {
        self.destination().is_some() && file_count > 0
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
