/*!
Algorithm registry.

Each operation category maps to a static, terminated list of
[`AlgorithmDescriptor`]s. A descriptor names an algorithm, carries the
property definition consumers select on and exposes the algorithm's own
function table.
*/

pub mod digest;
pub mod fetch;
pub mod hmac;

use std::fmt;

#[cfg(feature = "serde-support")]
use serde::Serialize;

use crate::dispatch::{FunctionTable, Terminated, terminated};
use crate::error::FetchError;
use crate::property::PropertyQuery;

pub use digest::{DigestCtx, DigestDispatch};
pub use fetch::{DigestContext, DigestMethod, MacContext, MacMethod};
pub use hmac::{MacCtx, MacDispatch};

/// Operation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde-support", derive(Serialize))]
#[repr(u32)]
pub enum OperationId {
    Digest = 1,
    Cipher = 2,
    Mac = 3,
    Kdf = 4,
    KeyManagement = 10,
    KeyExchange = 11,
    Signature = 12,
}

impl OperationId {
    pub const fn id(self) -> u32 {
        self as u32
    }

    pub fn from_id(id: u32) -> Option<Self> {
        match id {
            1 => Some(OperationId::Digest),
            2 => Some(OperationId::Cipher),
            3 => Some(OperationId::Mac),
            4 => Some(OperationId::Kdf),
            10 => Some(OperationId::KeyManagement),
            11 => Some(OperationId::KeyExchange),
            12 => Some(OperationId::Signature),
            _ => None,
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationId::Digest => "digest",
            OperationId::Cipher => "cipher",
            OperationId::Mac => "mac",
            OperationId::Kdf => "kdf",
            OperationId::KeyManagement => "keymgmt",
            OperationId::KeyExchange => "keyexch",
            OperationId::Signature => "signature",
        };
        write!(f, "{}", name)
    }
}

/// The function table behind a descriptor, typed by operation
#[derive(Debug, Clone, Copy)]
pub enum AlgorithmImpl {
    Digest(FunctionTable<'static, DigestDispatch>),
    Mac(FunctionTable<'static, MacDispatch>),
    /// Terminator
    None,
}

/// One algorithm offered for an operation
#[derive(Debug, Clone, Copy)]
pub struct AlgorithmDescriptor {
    /// Colon-separated names, the first being canonical
    pub names: &'static str,
    /// Property definition
    pub properties: &'static str,
    pub implementation: AlgorithmImpl,
}

impl AlgorithmDescriptor {
    /// List terminator
    pub const END: AlgorithmDescriptor = AlgorithmDescriptor {
        names: "",
        properties: "",
        implementation: AlgorithmImpl::None,
    };

    pub const fn new(names: &'static str, properties: &'static str, implementation: AlgorithmImpl) -> Self {
        Self {
            names,
            properties,
            implementation,
        }
    }

    /// Canonical name
    pub fn name(&self) -> &'static str {
        self.names.split(':').next().unwrap_or(self.names)
    }

    /// Whether `name` is one of this algorithm's names (case-insensitive)
    pub fn has_name(&self, name: &str) -> bool {
        self.names.split(':').any(|n| n.eq_ignore_ascii_case(name))
    }
}

impl Terminated for AlgorithmDescriptor {
    fn is_terminator(&self) -> bool {
        self.names.is_empty()
    }
}

/// Answer to an operation query
#[derive(Debug, Clone, Copy)]
pub struct QueryResult {
    algorithms: &'static [AlgorithmDescriptor],
    no_cache: bool,
}

impl QueryResult {
    pub fn new(algorithms: &'static [AlgorithmDescriptor], no_cache: bool) -> Self {
        Self { algorithms, no_cache }
    }

    /// Descriptors up to the terminator
    pub fn iter(self) -> impl Iterator<Item = &'static AlgorithmDescriptor> {
        terminated(self.algorithms)
    }

    /// The raw list, terminator included
    pub fn as_slice(&self) -> &'static [AlgorithmDescriptor] {
        self.algorithms
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// True when the host may keep this answer for the process lifetime
    pub fn is_cacheable(&self) -> bool {
        !self.no_cache
    }

    /// Select by name and property query; first registered match wins
    pub fn select(&self, name: &str, properties: &str) -> Result<&'static AlgorithmDescriptor, FetchError> {
        select(self.iter(), name, properties)
    }
}

/// Pick the first descriptor named `name` whose properties satisfy the query
pub fn select<'a>(
    algorithms: impl IntoIterator<Item = &'a AlgorithmDescriptor>,
    name: &str,
    properties: &str,
) -> Result<&'a AlgorithmDescriptor, FetchError> {
    let query: PropertyQuery = properties.parse()?;
    algorithms
        .into_iter()
        .find(|d| d.has_name(name) && query.matches(d.properties))
        .ok_or_else(|| FetchError::NotFound {
            name: name.to_string(),
            properties: properties.to_string(),
        })
}

/// Static descriptor list for an operation; empty for unregistered ones
pub fn algorithms_for(operation: OperationId) -> &'static [AlgorithmDescriptor] {
    match operation {
        OperationId::Digest => &digest::DIGESTS,
        OperationId::Mac => &hmac::MACS,
        _ => &[],
    }
}
