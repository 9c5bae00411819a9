use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Permission {
    #[default]
    Default,
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Installing,
    Installed,
    Activating,
    Active,
}

/// Platform-side record of the installed background worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerRegistration {
    pub scope: String,
    pub script_url: String,
    pub state: WorkerState,
}

impl WorkerRegistration {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == WorkerState::Active
    }
}

/// Notification status as rendered by the settings UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SwStatus {
    Active,
    Inactive,
    Unsupported,
}
