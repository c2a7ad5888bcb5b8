/*!
Host-to-provider function table ("upcalls").

The host passes a [`CoreDispatch`] table to the provider's entry point.
The provider captures what it recognises into [`CoreCapabilities`]. Missing
capabilities are tolerated during the scan and only fail when invoked.
*/

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use super::ids::CoreCapability;
use super::{DispatchEntry, FunctionTable, ScanReport, is_foreign_id};
use crate::error::{CapabilityError, ParamError};
use crate::memory::secure_zero_memory;
use crate::params::{ParamDescriptor, ParamRequest};

/// Host-side object identifying one loaded provider instance.
///
/// The host creates it before negotiation; the provider keeps a clone and
/// passes it back on upcalls that need to know which instance is asking.
#[derive(Clone)]
pub struct CoreHandle {
    inner: Arc<HandleInner>,
}

struct HandleInner {
    name: String,
    config: Vec<(String, String)>,
}

impl CoreHandle {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_config(name, Vec::<(String, String)>::new())
    }

    /// Handle carrying provider-specific configuration values
    pub fn with_config<K, V>(name: impl Into<String>, config: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            inner: Arc::new(HandleInner {
                name: name.into(),
                config: config.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
            }),
        }
    }

    /// Name the host loaded this provider under
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Configuration value by key
    pub fn config_value(&self, key: &str) -> Option<&str> {
        self.inner
            .config
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// All configuration values
    pub fn config(&self) -> &[(String, String)] {
        &self.inner.config
    }
}

impl fmt::Debug for CoreHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoreHandle").field("name", &self.name()).finish()
    }
}

pub type CoreGetParamTypesFn = fn(&CoreHandle) -> &'static [ParamDescriptor];
pub type CoreGetParamsFn = fn(&CoreHandle, &mut [ParamRequest<'_>]) -> Result<(), ParamError>;
pub type CorePutErrorFn = fn(library: u32, reason: u32, file: &'static str, line: u32);
pub type CoreAddErrorDataFn = fn(&str);
pub type CoreMallocFn = fn(usize) -> Option<Vec<u8>>;
pub type CoreZallocFn = fn(usize) -> Option<Vec<u8>>;
pub type CoreFreeFn = fn(Vec<u8>);
pub type CoreClearFreeFn = fn(Vec<u8>);
pub type CoreSecureZallocFn = fn(usize) -> Option<Vec<u8>>;
pub type CoreSecureClearFreeFn = fn(Vec<u8>);
pub type CoreSecureMallocInitializedFn = fn() -> bool;
pub type CoreCleanseFn = fn(&mut [u8]);

/// One entry of the host's function table
#[derive(Clone, Copy)]
pub enum CoreDispatch {
    GetParamTypes(CoreGetParamTypesFn),
    GetParams(CoreGetParamsFn),
    PutError(CorePutErrorFn),
    AddErrorData(CoreAddErrorDataFn),
    Malloc(CoreMallocFn),
    Zalloc(CoreZallocFn),
    Free(CoreFreeFn),
    ClearFree(CoreClearFreeFn),
    SecureZalloc(CoreSecureZallocFn),
    SecureClearFree(CoreSecureClearFreeFn),
    SecureMallocInitialized(CoreSecureMallocInitializedFn),
    Cleanse(CoreCleanseFn),
    /// An id from a newer protocol revision. The id must not be zero or
    /// one of the ids `CoreCapability` assigns.
    Unknown { id: u32 },
    End,
}

impl CoreDispatch {
    /// The capability this entry carries, if known
    pub fn capability(&self) -> Option<CoreCapability> {
        CoreCapability::from_id(self.function_id())
    }
}

impl DispatchEntry for CoreDispatch {
    fn function_id(&self) -> u32 {
        let capability = match self {
            CoreDispatch::GetParamTypes(_) => CoreCapability::GetParamTypes,
            CoreDispatch::GetParams(_) => CoreCapability::GetParams,
            CoreDispatch::PutError(_) => CoreCapability::PutError,
            CoreDispatch::AddErrorData(_) => CoreCapability::AddErrorData,
            CoreDispatch::Malloc(_) => CoreCapability::Malloc,
            CoreDispatch::Zalloc(_) => CoreCapability::Zalloc,
            CoreDispatch::Free(_) => CoreCapability::Free,
            CoreDispatch::ClearFree(_) => CoreCapability::ClearFree,
            CoreDispatch::SecureZalloc(_) => CoreCapability::SecureZalloc,
            CoreDispatch::SecureClearFree(_) => CoreCapability::SecureClearFree,
            CoreDispatch::SecureMallocInitialized(_) => CoreCapability::SecureMallocInitialized,
            CoreDispatch::Cleanse(_) => CoreCapability::Cleanse,
            CoreDispatch::Unknown { id } => return *id,
            CoreDispatch::End => return super::ids::END,
        };
        capability.id()
    }
}

impl fmt::Debug for CoreDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capability() {
            Some(capability) => write!(f, "CoreDispatch({})", capability),
            None if self.is_end() => write!(f, "CoreDispatch(END)"),
            None => write!(f, "CoreDispatch(unknown {})", self.function_id()),
        }
    }
}

/// Provider-side registry of host capabilities captured during negotiation
#[derive(Clone, Copy, Default)]
pub struct CoreCapabilities {
    get_param_types: Option<CoreGetParamTypesFn>,
    get_params: Option<CoreGetParamsFn>,
    put_error: Option<CorePutErrorFn>,
    add_error_data: Option<CoreAddErrorDataFn>,
    malloc: Option<CoreMallocFn>,
    zalloc: Option<CoreZallocFn>,
    free: Option<CoreFreeFn>,
    clear_free: Option<CoreClearFreeFn>,
    secure_zalloc: Option<CoreSecureZallocFn>,
    secure_clear_free: Option<CoreSecureClearFreeFn>,
    secure_malloc_initialized: Option<CoreSecureMallocInitializedFn>,
    cleanse: Option<CoreCleanseFn>,
}

impl CoreCapabilities {
    /// Scan a host table and capture every recognised entry.
    ///
    /// Unknown ids are skipped. Nothing is validated beyond the id.
    pub fn capture(table: FunctionTable<'_, CoreDispatch>) -> (Self, ScanReport) {
        let mut caps = Self::default();
        let mut report = ScanReport::default();

        for entry in table.entries() {
            match *entry {
                CoreDispatch::GetParamTypes(f) => caps.get_param_types = Some(f),
                CoreDispatch::GetParams(f) => caps.get_params = Some(f),
                CoreDispatch::PutError(f) => caps.put_error = Some(f),
                CoreDispatch::AddErrorData(f) => caps.add_error_data = Some(f),
                CoreDispatch::Malloc(f) => caps.malloc = Some(f),
                CoreDispatch::Zalloc(f) => caps.zalloc = Some(f),
                CoreDispatch::Free(f) => caps.free = Some(f),
                CoreDispatch::ClearFree(f) => caps.clear_free = Some(f),
                CoreDispatch::SecureZalloc(f) => caps.secure_zalloc = Some(f),
                CoreDispatch::SecureClearFree(f) => caps.secure_clear_free = Some(f),
                CoreDispatch::SecureMallocInitialized(f) => caps.secure_malloc_initialized = Some(f),
                CoreDispatch::Cleanse(f) => caps.cleanse = Some(f),
                CoreDispatch::Unknown { id } => {
                    debug_assert!(
                        is_foreign_id(id, CoreCapability::from_id(id).is_some()),
                        "unknown core entry reuses id {id}"
                    );
                    report.ignored += 1;
                    continue;
                }
                CoreDispatch::End => {
                    report.ignored += 1;
                    continue;
                }
            }
            report.captured += 1;
        }

        debug!(
            captured = report.captured,
            ignored = report.ignored,
            "scanned core dispatch table"
        );
        (caps, report)
    }

    /// Whether the host supplied a capability
    pub fn has(&self, capability: CoreCapability) -> bool {
        match capability {
            CoreCapability::GetParamTypes => self.get_param_types.is_some(),
            CoreCapability::GetParams => self.get_params.is_some(),
            CoreCapability::PutError => self.put_error.is_some(),
            CoreCapability::AddErrorData => self.add_error_data.is_some(),
            CoreCapability::Malloc => self.malloc.is_some(),
            CoreCapability::Zalloc => self.zalloc.is_some(),
            CoreCapability::Free => self.free.is_some(),
            CoreCapability::ClearFree => self.clear_free.is_some(),
            CoreCapability::SecureZalloc => self.secure_zalloc.is_some(),
            CoreCapability::SecureClearFree => self.secure_clear_free.is_some(),
            CoreCapability::SecureMallocInitialized => self.secure_malloc_initialized.is_some(),
            CoreCapability::Cleanse => self.cleanse.is_some(),
        }
    }

    /// Number of distinct capabilities captured
    pub fn captured_count(&self) -> usize {
        CoreCapability::ALL.iter().filter(|c| self.has(**c)).count()
    }

    fn require<T>(f: Option<T>, capability: CoreCapability) -> Result<T, CapabilityError> {
        f.ok_or(CapabilityError::MissingCore(capability))
    }

    pub fn get_param_types(&self, handle: &CoreHandle) -> Result<&'static [ParamDescriptor], CapabilityError> {
        let f = Self::require(self.get_param_types, CoreCapability::GetParamTypes)?;
        Ok(f(handle))
    }

    /// Ask the host to fill parameter slots
    pub fn get_params(&self, handle: &CoreHandle, params: &mut [ParamRequest<'_>]) -> crate::Result<()> {
        let f = Self::require(self.get_params, CoreCapability::GetParams)?;
        f(handle, params)?;
        Ok(())
    }

    /// Report an error to the host's error queue
    pub fn put_error(&self, library: u32, reason: u32, file: &'static str, line: u32) -> Result<(), CapabilityError> {
        let f = Self::require(self.put_error, CoreCapability::PutError)?;
        f(library, reason, file, line);
        Ok(())
    }

    /// Attach data to the most recently reported error
    pub fn add_error_data(&self, data: &str) -> Result<(), CapabilityError> {
        let f = Self::require(self.add_error_data, CoreCapability::AddErrorData)?;
        f(data);
        Ok(())
    }

    pub fn malloc(&self, size: usize) -> Result<Vec<u8>, CapabilityError> {
        let f = Self::require(self.malloc, CoreCapability::Malloc)?;
        f(size).ok_or(CapabilityError::AllocationFailed { size })
    }

    pub fn zalloc(&self, size: usize) -> Result<Vec<u8>, CapabilityError> {
        let f = Self::require(self.zalloc, CoreCapability::Zalloc)?;
        f(size).ok_or(CapabilityError::AllocationFailed { size })
    }

    pub fn free(&self, block: Vec<u8>) -> Result<(), CapabilityError> {
        let f = Self::require(self.free, CoreCapability::Free)?;
        f(block);
        Ok(())
    }

    pub fn clear_free(&self, block: Vec<u8>) -> Result<(), CapabilityError> {
        let f = Self::require(self.clear_free, CoreCapability::ClearFree)?;
        f(block);
        Ok(())
    }

    pub fn secure_zalloc(&self, size: usize) -> Result<Vec<u8>, CapabilityError> {
        let f = Self::require(self.secure_zalloc, CoreCapability::SecureZalloc)?;
        f(size).ok_or(CapabilityError::AllocationFailed { size })
    }

    pub fn secure_clear_free(&self, block: Vec<u8>) -> Result<(), CapabilityError> {
        let f = Self::require(self.secure_clear_free, CoreCapability::SecureClearFree)?;
        f(block);
        Ok(())
    }

    pub fn secure_malloc_initialized(&self) -> Result<bool, CapabilityError> {
        let f = Self::require(self.secure_malloc_initialized, CoreCapability::SecureMallocInitialized)?;
        Ok(f())
    }

    /// Cleanse through the host, or locally when the host has no cleanse
    pub fn cleanse(&self, buf: &mut [u8]) {
        match self.cleanse {
            Some(f) => f(buf),
            None => secure_zero_memory(buf),
        }
    }
}

impl fmt::Debug for CoreCapabilities {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<&str> = CoreCapability::ALL
            .iter()
            .filter(|c| self.has(**c))
            .map(|c| c.name())
            .collect();
        f.debug_struct("CoreCapabilities").field("present", &present).finish()
    }
}
