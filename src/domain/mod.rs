pub mod cleanup;
pub mod command;
mod container;
pub mod registry;
pub mod target;
pub mod traits;

pub use cleanup::{
    CandidateAction, CleanupCandidate, CleanupCriterion, CleanupOptions, ResourceKind,
};
pub use command::{CommandOutput, ComposeFlavor, EngineCli, EngineCommand, EngineKind};
pub use container::{ContainerHealthStatus, ServiceStatus};
pub use registry::{Direction, ServiceCategory, ServiceFileRef, ServiceRegistry};
pub use target::{
    CategoryPlan, OperationTarget, ResolvedPath, ResolvedTargets, ServiceSelection,
    TargetRequest, split_list,
};
pub use traits::{Confirmation, ContainerEngine};
