use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Label reported when the server health check succeeds
pub const UP: &str = "up";
/// Sentinel label for a failed server health check
pub const DOWN: &str = "down";
/// Sentinel label for a setting the settings store reports as absent
pub const NOT_SET: &str = "not set";

/// Table-shaped run or validation result: rows of cells
pub type StatusTable = Vec<Vec<String>>;

/// Health or result of one tracked dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    /// Free-form label such as "up", "down" or "not set"
    Label(String),
    /// Most recent scenario run/validation rows
    Table(StatusTable),
}

/// Variant tag of a [`Status`], used to type-check slot writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusKind {
    Label,
    Table,
}

impl Status {
    pub fn label<S: Into<String>>(label: S) -> Self {
        Status::Label(label.into())
    }

    pub fn table(rows: StatusTable) -> Self {
        Status::Table(rows)
    }

    pub fn up() -> Self {
        Status::label(UP)
    }

    pub fn down() -> Self {
        Status::label(DOWN)
    }

    pub fn not_set() -> Self {
        Status::label(NOT_SET)
    }

    pub fn kind(&self) -> StatusKind {
        match self {
            Status::Label(_) => StatusKind::Label,
            Status::Table(_) => StatusKind::Table,
        }
    }

    pub fn as_label(&self) -> Option<&str> {
        match self {
            Status::Label(label) => Some(label),
            Status::Table(_) => None,
        }
    }

    pub fn as_table(&self) -> Option<&StatusTable> {
        match self {
            Status::Table(rows) => Some(rows),
            Status::Label(_) => None,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Label(label) => f.write_str(label),
            Status::Table(rows) if rows.len() == 1 => f.write_str("1 row"),
            Status::Table(rows) => write!(f, "{} rows", rows.len()),
        }
    }
}

/// The six dimensions tracked by the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotName {
    Server,
    RunStatus,
    ValidationStatus,
    ScenariosDirectory,
    GridpathDatabase,
    PythonEnvironment,
}

impl SlotName {
    /// All slots in display order
    pub const ALL: [SlotName; 6] = [
        SlotName::Server,
        SlotName::RunStatus,
        SlotName::ValidationStatus,
        SlotName::ScenariosDirectory,
        SlotName::GridpathDatabase,
        SlotName::PythonEnvironment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotName::Server => "server",
            SlotName::RunStatus => "run_status",
            SlotName::ValidationStatus => "validation_status",
            SlotName::ScenariosDirectory => "scenarios_directory",
            SlotName::GridpathDatabase => "gridpath_database",
            SlotName::PythonEnvironment => "python_environment",
        }
    }

    /// The status variant this slot accepts
    pub fn kind(&self) -> StatusKind {
        match self {
            SlotName::RunStatus | SlotName::ValidationStatus => StatusKind::Table,
            _ => StatusKind::Label,
        }
    }
}

impl fmt::Display for SlotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SlotName::ALL
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| format!("unknown status slot '{}'", s))
    }
}
