pub(crate) mod any;
pub(crate) mod binder;
pub(crate) mod config;
pub(crate) mod context;
pub(crate) mod errors;
pub(crate) mod inject;
pub(crate) mod lifetime;
pub(crate) mod registry;
pub(crate) mod resolver;
pub(crate) mod service;

pub use any::{TypeInfo, TypeKind};
pub use binder::{Bindings, FieldBinding, Injectable};
pub use config::{ConfigSource, JsonConfig};
pub use context::{ServiceContext, ServiceFactory, State};
pub use errors::{ConfigErrorKind, ContextErrorKind, InjectErrorKind, RegistryErrorKind, TagErrorKind};
pub use inject::{Injected, InjectionTag};
pub use lifetime::Lifetime;
pub use registry::TypeRegistry;
pub use resolver::Resolver;
pub use service::{Joinable, Runnable, Service, ServiceBuilder};

#[cfg(feature = "macros")]
pub use servicewire_macros::Injectable;
