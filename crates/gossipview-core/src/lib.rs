pub mod display;
pub mod error;
pub mod normalize;
pub mod report;
pub mod settings;
pub mod source;

pub use error::{SettingsError, SourceError};
pub use normalize::normalize;
pub use report::{node_keys, NodeReport, RepoStatus, TaskStatus};
pub use settings::Settings;
pub use source::GossipTarget;
