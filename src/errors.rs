mod config;
mod context;
mod inject;
mod registry;

pub use config::ConfigErrorKind;
pub use context::ContextErrorKind;
pub use inject::{InjectErrorKind, TagErrorKind};
pub use registry::RegistryErrorKind;
