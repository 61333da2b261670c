pub mod components;
pub mod config;
pub mod error;
pub mod features;
pub mod kernel;
pub mod logging;
pub mod packages;
pub mod planner;
pub mod resolver;
pub mod sources;
pub mod target;

pub use error::{Error, Result};
pub use resolver::{BuildRequest, ResolvedConfig, resolve, resolve_str};
pub use target::{Architecture, BuildProfile, LibcVariant};
