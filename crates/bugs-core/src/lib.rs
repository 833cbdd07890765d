pub mod color;
pub mod config;
pub mod dsl;
pub mod error;
pub mod snapshot;
pub mod world;

pub use color::Color;
pub use config::{BugsConfig, ConfigError, LogFormat, LoggingConfig, WorldConfig};
pub use dsl::{parse_program, recognize, Bug, BugState, Program};
pub use error::{BugsError, Result};
pub use snapshot::{AgentFailure, AgentView, Command, WorldSnapshot, WorldState};
pub use world::World;
