pub mod config;
pub mod confirm;
pub mod engine_adapter;
pub mod path_resolver;
pub mod registry_loader;

pub use confirm::{FixedConfirmation, TerminalConfirmation, confirmation_for};
pub use engine_adapter::{EngineAdapter, RuntimePreference, detect_engine};
pub use path_resolver::{PathOverrides, PathResolver};
