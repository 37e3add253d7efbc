//! To-do tasks (iCal `VTODO` item)

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use url::Url;

use crate::item::TaskId;
use crate::error::{Error, Result};

/// Progress of a task, as shown to the user.
///
/// On the wire, this is the `STATUS` property. Values that this crate does not know (e.g. `CANCELLED`) are read as `NotStarted`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl Default for TaskStatus {
    fn default() -> Self {
        TaskStatus::NotStarted
    }
}

impl TaskStatus {
    /// Map a `STATUS` value. Missing or unknown values degrade to `NotStarted`
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().to_ascii_uppercase()).as_deref() {
            Some("IN-PROCESS") => TaskStatus::InProgress,
            Some("COMPLETED") => TaskStatus::Completed,
            Some("NEEDS-ACTION") | None => TaskStatus::NotStarted,
            Some(other) => {
                log::debug!("Unsupported task status {:?}, using NEEDS-ACTION", other);
                TaskStatus::NotStarted
            },
        }
    }

    pub fn as_wire(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "NEEDS-ACTION",
            TaskStatus::InProgress => "IN-PROCESS",
            TaskStatus::Completed => "COMPLETED",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::NotStarted => "Todo",
            TaskStatus::InProgress => "Started",
            TaskStatus::Completed => "Completed",
        }
    }

    /// Reverse of [`Self::label`], for UI collaborators that hand back the selected combo text
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "Todo" => Some(TaskStatus::NotStarted),
            "Started" => Some(TaskStatus::InProgress),
            "Completed" => Some(TaskStatus::Completed),
            _ => None,
        }
    }

    pub fn is_completed(&self) -> bool {
        *self == TaskStatus::Completed
    }
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}


/// Priority of a task.
///
/// RFC5545 uses 1 (highest) to 9 (lowest), 0 meaning "undefined". This crate writes 1, 5 and 9, and reads the RFC bands.
/// Priorities are ordered by importance: `High > Medium > Low > Unset`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
    Unset,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Unset
    }
}

impl Priority {
    /// Map a `PRIORITY` value. Missing or unparsable values degrade to `Unset`
    pub fn from_wire(value: Option<&str>) -> Self {
        match value.map(|v| v.trim().parse::<u8>()) {
            None => Priority::Unset,
            Some(Ok(number)) => Self::from_number(number),
            Some(Err(_)) => {
                log::debug!("Unparsable task priority {:?}", value);
                Priority::Unset
            },
        }
    }

    pub fn from_number(number: u8) -> Self {
        match number {
            1..=4 => Priority::High,
            5 => Priority::Medium,
            6..=9 => Priority::Low,
            _ => Priority::Unset,
        }
    }

    /// The `PRIORITY` value to write, if any
    pub fn as_wire(&self) -> Option<u8> {
        match self {
            Priority::High => Some(1),
            Priority::Medium => Some(5),
            Priority::Low => Some(9),
            Priority::Unset => None,
        }
    }

    /// Sort rank: the higher, the more important
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 3,
            Priority::Medium => 2,
            Priority::Low => 1,
            Priority::Unset => 0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
            Priority::Unset => "Not Set",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "High" => Some(Priority::High),
            "Medium" => Some(Priority::Medium),
            "Low" => Some(Priority::Low),
            "Not Set" => Some(Priority::Unset),
            _ => None,
        }
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}
impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Display for Priority {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}


/// The user-editable part of a task, as handed over by an "add" or "edit" command
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TaskFields {
    pub summary: String,
    pub status: TaskStatus,
    pub priority: Priority,
    pub due: Option<DateTime<Utc>>,
    pub description: Option<String>,
    /// Only taken into account when creating a task
    pub parent_id: Option<TaskId>,
}

impl TaskFields {
    pub fn new<S: ToString>(summary: S) -> Self {
        Self { summary: summary.to_string(), ..Self::default() }
    }

    /// A task cannot be sent to the server without a summary
    pub fn validate(&self) -> Result<()> {
        if self.summary.trim().is_empty() {
            return Err(Error::Validation("Tasks need a summary".to_string()));
        }
        Ok(())
    }
}


/// A to-do task
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Persistent, globally unique identifier (iCal `UID`)
    id: TaskId,
    /// The display name of the task
    summary: String,
    description: Option<String>,
    status: TaskStatus,
    priority: Priority,
    due: Option<DateTime<Utc>>,
    /// The `RELATED-TO` link to the parent task. It may point to a task that does not exist (anymore)
    parent_id: Option<TaskId>,
    /// The last time this item was modified
    last_modified: DateTime<Utc>,

    /// Where this task lives on the server. `None` until it has been fetched at least once
    #[serde(skip)]
    server_location: Option<Url>,
}

impl Task {
    /// Create a brand new Task that is not on a server yet.
    /// This will pick a new (random) task ID.
    pub fn new(fields: TaskFields) -> Self {
        let TaskFields { summary, status, priority, due, description, parent_id } = fields;
        Self::new_with_parameters(TaskId::random(), trim_text(summary), description.map(trim_text),
                                  status, priority, due, parent_id, Utc::now())
    }

    /// Create a new Task instance, that may be synced on the server already
    #[allow(clippy::too_many_arguments)]
    pub fn new_with_parameters(id: TaskId, summary: String, description: Option<String>,
                               status: TaskStatus, priority: Priority, due: Option<DateTime<Utc>>,
                               parent_id: Option<TaskId>, last_modified: DateTime<Utc>,
                            ) -> Self
    {
        Self {
            id,
            summary,
            description,
            status,
            priority,
            due,
            parent_id,
            last_modified,
            server_location: None,
        }
    }

    pub fn id(&self) -> &TaskId         { &self.id          }
    pub fn summary(&self) -> &str       { &self.summary     }
    pub fn status(&self) -> TaskStatus  { self.status       }
    pub fn priority(&self) -> Priority  { self.priority     }
    pub fn completed(&self) -> bool     { self.status.is_completed() }
    pub fn due(&self) -> Option<&DateTime<Utc>>       { self.due.as_ref() }
    pub fn description(&self) -> Option<&str>         { self.description.as_deref() }
    pub fn parent_id(&self) -> Option<&TaskId>        { self.parent_id.as_ref() }
    pub fn last_modified(&self) -> &DateTime<Utc>     { &self.last_modified }
    pub fn server_location(&self) -> Option<&Url>     { self.server_location.as_ref() }

    pub fn set_server_location(&mut self, location: Option<Url>) {
        self.server_location = location;
    }

    /// Apply the content of an edit command.
    /// The ID and the parent link are kept. This updates the "last modified" field
    pub fn apply(&mut self, fields: TaskFields) {
        self.summary = trim_text(fields.summary);
        self.status = fields.status;
        self.priority = fields.priority;
        self.due = fields.due;
        self.description = fields.description.map(trim_text);
        self.last_modified = Utc::now();
    }

    /// Whether both tasks would be encoded the same way, ignoring the modification time and the sub-second part of the due date
    #[cfg(test)]
    pub fn has_same_observable_content_as(&self, other: &Task) -> bool {
           self.id == other.id
        && self.summary == other.summary
        && self.description == other.description
        && self.status == other.status
        && self.priority == other.priority
        && self.parent_id == other.parent_id
        && self.due.map(|d| d.timestamp()) == other.due.map(|d| d.timestamp())
    }
}


/// Content lines lose their trailing whitespace on the server
fn trim_text(text: String) -> String {
    match text.trim_end().len() {
        len if len == text.len() => text,
        len => text[..len].to_string(),
    }
}
