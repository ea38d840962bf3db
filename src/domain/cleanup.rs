use super::target::TargetRequest;
use std::fmt;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Container,
    Image,
    Volume,
    Network,
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Container => "container",
            Self::Image => "image",
            Self::Volume => "volume",
            Self::Network => "network",
        };
        f.pad(label)
    }
}

/// Why a resource qualified for removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupCriterion {
    OlderThan { days: u32 },
    LargerThan { size_mb: u64, limit_mb: u64 },
    Orphaned,
    Unused,
    /// Volumes of one registry service, removed with `compose down -v`
    ServiceVolumes { compose_file: PathBuf },
}

impl fmt::Display for CleanupCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OlderThan { days } => write!(f, "mais antigo que {days} dia(s)"),
            Self::LargerThan { size_mb, limit_mb } => {
                write!(f, "{size_mb} MB (limite {limit_mb} MB)")
            }
            Self::Orphaned => f.write_str("órfão"),
            Self::Unused => f.write_str("não utilizado"),
            Self::ServiceVolumes { compose_file } => {
                write!(f, "volumes do serviço ({})", compose_file.display())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CandidateAction {
    Planned,
    Removed,
    Skipped { reason: String },
    Failed { reason: String },
}

/// A resource considered by the cleanup planner. Prune-based steps use `*`
/// as identifier because the engine does not report exact counts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupCandidate {
    pub kind: ResourceKind,
    pub id: String,
    pub criterion: CleanupCriterion,
    pub action: CandidateAction,
}

impl CleanupCandidate {
    pub fn planned(kind: ResourceKind, id: impl Into<String>, criterion: CleanupCriterion) -> Self {
        Self {
            kind,
            id: id.into(),
            criterion,
            action: CandidateAction::Planned,
        }
    }

    pub fn skipped(
        kind: ResourceKind,
        id: impl Into<String>,
        criterion: CleanupCriterion,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            id: id.into(),
            criterion,
            action: CandidateAction::Skipped {
                reason: reason.into(),
            },
        }
    }

    pub fn is_approximate(&self) -> bool {
        self.id == "*"
    }
}

/// Flags driving one cleanup run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupOptions {
    pub remove_containers: bool,
    pub remove_images: bool,
    pub remove_volumes: bool,
    pub remove_networks: bool,
    pub older_than_days: Option<u32>,
    pub cleanup_large_volumes: bool,
    pub max_volume_size_mb: u64,
    pub max_volumes_to_remove: usize,
    pub cleanup_orphans: bool,
    /// `compose down -v` for every service selected by `targets`
    pub cleanup_service_volumes: bool,
    pub targets: TargetRequest,
    pub preserve_data: bool,
    pub preserve_volumes: bool,
}

impl CleanupOptions {
    pub const DEFAULT_MAX_VOLUME_SIZE_MB: u64 = 1024;
    pub const DEFAULT_MAX_VOLUMES_TO_REMOVE: usize = 5;

    pub fn none() -> Self {
        Self {
            max_volume_size_mb: Self::DEFAULT_MAX_VOLUME_SIZE_MB,
            max_volumes_to_remove: Self::DEFAULT_MAX_VOLUMES_TO_REMOVE,
            ..Default::default()
        }
    }

    /// Volume removal is vetoed by either safety flag, whatever else is set
    pub fn volumes_protected(&self) -> bool {
        self.preserve_data || self.preserve_volumes
    }

    pub fn is_empty(&self) -> bool {
        !self.remove_containers
            && !self.remove_images
            && !self.remove_volumes
            && !self.remove_networks
            && self.older_than_days.is_none()
            && !self.cleanup_large_volumes
            && !self.cleanup_orphans
            && !self.cleanup_service_volumes
    }
}
