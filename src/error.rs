/*!
Error handling for the provider negotiation protocol.

Negotiation failures and parameter type mismatches are returned to the
immediate caller. Unknown parameter names and unregistered operation
categories are not errors and never show up here.
*/

use std::fmt;
use thiserror::Error;

use crate::dispatch::ids::{CoreCapability, ProviderCapability};
use crate::params::ParamType;

/// Result type for the provider protocol
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the provider protocol
#[derive(Error, Debug)]
pub enum Error {
    /// Negotiation with a provider failed
    #[error("Provider negotiation failed: {0}")]
    Negotiation(#[from] NegotiationError),

    /// Parameter request could not be satisfied
    #[error(transparent)]
    Param(#[from] ParamError),

    /// A captured capability was invoked but is absent or failed
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// Algorithm lookup failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Algorithm invocation failed
    #[error(transparent)]
    Algorithm(#[from] AlgorithmError),

    /// Function table is malformed
    #[error("Malformed function table: {0}")]
    Table(#[from] TableError),

    /// Configuration rejected
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// No built-in provider registered under the name
    #[error("Unknown provider: {0}")]
    UnknownProvider(String),
}

/// Failures of the external negotiation entry point.
///
/// Any of these leaves the provider fully uninitialized: no context is
/// outstanding and no table has been handed out.
#[derive(Error, Debug)]
pub enum NegotiationError {
    /// The provider context could not be allocated
    #[error("context allocation failed: {0}")]
    ContextAllocation(#[source] CapabilityError),

    /// The known-answer self-check did not pass
    #[error("self-check failed for {algorithm}: {reason}")]
    SelfCheck {
        algorithm: String,
        reason: SelfCheckFailure,
    },

    /// The supplied configuration was rejected before any allocation
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why a self-check did not pass
#[derive(Debug)]
pub enum SelfCheckFailure {
    /// The algorithm could not be fetched through the internal path
    Unavailable(FetchError),
    /// The algorithm was found but computing the digest failed
    Computation(AlgorithmError),
    /// The computed value differs from the expected one
    Mismatch,
}

impl fmt::Display for SelfCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelfCheckFailure::Unavailable(err) => write!(f, "algorithm unavailable ({})", err),
            SelfCheckFailure::Computation(err) => write!(f, "computation failed ({})", err),
            SelfCheckFailure::Mismatch => write!(f, "known-answer mismatch"),
        }
    }
}

/// Parameter protocol errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParamError {
    /// The requested type does not match the parameter's actual type
    #[error("type mismatch for parameter '{key}': requested {expected}, actual {actual}")]
    TypeMismatch {
        key: String,
        expected: ParamType,
        actual: ParamType,
    },
}

/// Errors from invoking a captured capability
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CapabilityError {
    /// The host never supplied this capability
    #[error("host capability {0} was not supplied")]
    MissingCore(CoreCapability),

    /// The provider never supplied this capability
    #[error("provider capability {0} was not supplied")]
    MissingProvider(ProviderCapability),

    /// The host allocator refused the request
    #[error("host allocator refused {size} bytes")]
    AllocationFailed { size: usize },
}

/// Algorithm lookup errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// No descriptor matched the name and property query
    #[error("no algorithm '{name}' matching properties '{properties}'")]
    NotFound { name: String, properties: String },

    /// The descriptor's function table lacks a required entry
    #[error("algorithm {algorithm} does not provide {function}")]
    MissingFunction {
        algorithm: &'static str,
        function: &'static str,
    },

    /// The descriptor's table belongs to a different operation
    #[error("algorithm {0} is not implemented for this operation")]
    WrongOperation(&'static str),

    /// The property query could not be parsed
    #[error("invalid property query: {0}")]
    InvalidPropertyQuery(String),

    /// Querying the provider required a capability it did not supply
    #[error(transparent)]
    Capability(#[from] CapabilityError),
}

/// Errors raised by algorithm implementations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmError {
    /// Output buffer is shorter than the algorithm's output
    #[error("output buffer too small: need {needed} bytes, have {available}")]
    BufferTooSmall { needed: usize, available: usize },

    /// Operation requires an initialized context
    #[error("context not initialized")]
    NotInitialized,

    /// Context was already finalized
    #[error("context already finalized")]
    Finalized,

    /// Context was created by a different algorithm
    #[error("context belongs to a different algorithm")]
    WrongContext,

    /// A context could not be created
    #[error("context creation failed")]
    ContextCreation,

    /// Host capability failure while running the algorithm
    #[error(transparent)]
    Capability(#[from] CapabilityError),

    /// A nested fetch failed
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// A parameter had the wrong type
    #[error(transparent)]
    Param(#[from] ParamError),
}

/// Function table well-formedness errors
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableError {
    /// No terminator entry was found
    #[error("table is not terminated")]
    Unterminated,

    /// A non-zero id appears more than once
    #[error("duplicate function id {0}")]
    DuplicateId(u32),
}

/// Convert a string to an Error::Config
pub fn config_err<T, S: Into<String>>(msg: S) -> Result<T> {
    Err(Error::Config(msg.into()))
}
