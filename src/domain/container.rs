use std::fmt;

/// Runtime state of a service container, queried on demand
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceStatus {
    Running,
    Stopped,
    NotCreated,
    Unknown,
}

impl ServiceStatus {
    /// Maps the engine's `.State.Status` string
    pub fn from_engine_state(state: &str) -> Self {
        match state.trim().to_ascii_lowercase().as_str() {
            "running" => Self::Running,
            "exited" | "stopped" | "created" | "configured" | "paused" | "dead" => Self::Stopped,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Running => "running",
            Self::Stopped => "stopped",
            Self::NotCreated => "not-created",
            Self::Unknown => "unknown",
        };
        f.pad(label)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContainerHealthStatus {
    Healthy,
    Unhealthy,
    Starting,
    Unknown,
    NotApplicable, // No healthcheck configured
}

impl ContainerHealthStatus {
    pub fn from_engine_health(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "healthy" => Self::Healthy,
            "unhealthy" => Self::Unhealthy,
            "starting" => Self::Starting,
            "" | "<no value>" | "none" => Self::NotApplicable,
            _ => Self::Unknown,
        }
    }
}
