//! Dispatcher errors
//!
//! Only raised while building sinks; once running, a failing sink is
//! counted in its metrics and never surfaces here.

use contracts::ContractError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DispatcherError {
    #[error("no sinks configured")]
    NoSinks,

    #[error("cannot create sink '{name}'")]
    SinkCreation {
        name: String,
        #[source]
        source: ContractError,
    },
}

impl DispatcherError {
    pub fn sink_creation(name: impl Into<String>, source: impl Into<ContractError>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Name of the sink that failed, if any
    pub fn sink_name(&self) -> Option<&str> {
        match self {
            Self::SinkCreation { name, .. } => Some(name),
            Self::NoSinks => None,
        }
    }
}
