pub mod app_config;
pub mod probe_config;

pub use app_config::{AgentConfig, ConfigError, load_config};
pub use probe_config::TargetSet;
