use std::error::Error;

use super::InjectErrorKind;
use crate::context::State;

#[derive(thiserror::Error, Debug)]
pub enum ContextErrorKind {
    #[error("Get services config section {section} error")]
    Section {
        section: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("Get service {service} config error")]
    Config {
        service: String,
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    #[error("Create service {service} error")]
    Factory {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Inject service {service} with type {type_name} failed")]
    Inject {
        service: String,
        type_name: &'static str,
        #[source]
        source: InjectErrorKind,
    },
    #[error("Start service {service} failed")]
    Start {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Service {service} stopped with error")]
    Join {
        service: String,
        #[source]
        source: anyhow::Error,
    },
    #[error("Can't {operation} service context in state {actual:?}, expected {expected:?}")]
    InvalidState {
        operation: &'static str,
        expected: State,
        actual: State,
    },
}
