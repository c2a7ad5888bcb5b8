/*!
Provider-to-host function table.

The provider's entry point returns a [`ProviderDispatch`] table. The host
captures it into [`ProviderFunctions`] and calls through it from then on,
always passing the provider context it received alongside the table.
*/

use std::fmt;

use tracing::debug;

use super::ids::ProviderCapability;
use super::{DispatchEntry, FunctionTable, ScanReport, is_foreign_id};
use crate::algorithms::{OperationId, QueryResult};
use crate::error::{CapabilityError, ParamError};
use crate::params::{ParamDescriptor, ParamRequest};
use crate::provider::ProviderContext;

pub type ProviderTeardownFn = fn(ProviderContext);
pub type ProviderGetParamTypesFn = fn(&ProviderContext) -> &'static [ParamDescriptor];
pub type ProviderGetParamsFn = fn(&ProviderContext, &mut [ParamRequest<'_>]) -> Result<(), ParamError>;
pub type ProviderQueryOperationFn = fn(&ProviderContext, OperationId) -> QueryResult;

/// One entry of a provider's function table
#[derive(Clone, Copy)]
pub enum ProviderDispatch {
    Teardown(ProviderTeardownFn),
    GetParamTypes(ProviderGetParamTypesFn),
    GetParams(ProviderGetParamsFn),
    QueryOperation(ProviderQueryOperationFn),
    /// An id from a newer protocol revision. The id must not be zero or
    /// one of the ids `ProviderCapability` assigns.
    Unknown { id: u32 },
    End,
}

impl ProviderDispatch {
    /// The capability this entry carries, if known
    pub fn capability(&self) -> Option<ProviderCapability> {
        ProviderCapability::from_id(self.function_id())
    }
}

impl DispatchEntry for ProviderDispatch {
    fn function_id(&self) -> u32 {
        match self {
            ProviderDispatch::Teardown(_) => ProviderCapability::Teardown.id(),
            ProviderDispatch::GetParamTypes(_) => ProviderCapability::GetParamTypes.id(),
            ProviderDispatch::GetParams(_) => ProviderCapability::GetParams.id(),
            ProviderDispatch::QueryOperation(_) => ProviderCapability::QueryOperation.id(),
            ProviderDispatch::Unknown { id } => *id,
            ProviderDispatch::End => super::ids::END,
        }
    }
}

impl fmt::Debug for ProviderDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.capability() {
            Some(capability) => write!(f, "ProviderDispatch({})", capability),
            None if self.is_end() => write!(f, "ProviderDispatch(END)"),
            None => write!(f, "ProviderDispatch(unknown {})", self.function_id()),
        }
    }
}

/// Consumer-side registry of a provider's capabilities
#[derive(Clone, Copy, Default)]
pub struct ProviderFunctions {
    teardown: Option<ProviderTeardownFn>,
    get_param_types: Option<ProviderGetParamTypesFn>,
    get_params: Option<ProviderGetParamsFn>,
    query_operation: Option<ProviderQueryOperationFn>,
}

impl ProviderFunctions {
    /// Scan a provider table and capture every recognised entry
    pub fn capture(table: FunctionTable<'_, ProviderDispatch>) -> (Self, ScanReport) {
        let mut functions = Self::default();
        let mut report = ScanReport::default();

        for entry in table.entries() {
            match *entry {
                ProviderDispatch::Teardown(f) => functions.teardown = Some(f),
                ProviderDispatch::GetParamTypes(f) => functions.get_param_types = Some(f),
                ProviderDispatch::GetParams(f) => functions.get_params = Some(f),
                ProviderDispatch::QueryOperation(f) => functions.query_operation = Some(f),
                ProviderDispatch::Unknown { id } => {
                    debug_assert!(
                        is_foreign_id(id, ProviderCapability::from_id(id).is_some()),
                        "unknown provider entry reuses id {id}"
                    );
                    report.ignored += 1;
                    continue;
                }
                ProviderDispatch::End => {
                    report.ignored += 1;
                    continue;
                }
            }
            report.captured += 1;
        }

        debug!(
            captured = report.captured,
            ignored = report.ignored,
            "scanned provider dispatch table"
        );
        (functions, report)
    }

    /// Whether the provider supplied a capability
    pub fn has(&self, capability: ProviderCapability) -> bool {
        match capability {
            ProviderCapability::Teardown => self.teardown.is_some(),
            ProviderCapability::GetParamTypes => self.get_param_types.is_some(),
            ProviderCapability::GetParams => self.get_params.is_some(),
            ProviderCapability::QueryOperation => self.query_operation.is_some(),
        }
    }

    fn require<T>(f: Option<T>, capability: ProviderCapability) -> Result<T, CapabilityError> {
        f.ok_or(CapabilityError::MissingProvider(capability))
    }

    /// Release the provider context.
    ///
    /// Without a teardown capability the context is simply dropped.
    pub fn teardown(&self, context: ProviderContext) {
        match self.teardown {
            Some(f) => f(context),
            None => drop(context),
        }
    }

    pub fn get_param_types(&self, context: &ProviderContext) -> Result<&'static [ParamDescriptor], CapabilityError> {
        let f = Self::require(self.get_param_types, ProviderCapability::GetParamTypes)?;
        Ok(f(context))
    }

    pub fn get_params(&self, context: &ProviderContext, params: &mut [ParamRequest<'_>]) -> crate::Result<()> {
        let f = Self::require(self.get_params, ProviderCapability::GetParams)?;
        f(context, params)?;
        Ok(())
    }

    pub fn query_operation(&self, context: &ProviderContext, operation: OperationId) -> Result<QueryResult, CapabilityError> {
        let f = Self::require(self.query_operation, ProviderCapability::QueryOperation)?;
        Ok(f(context, operation))
    }
}

impl fmt::Debug for ProviderFunctions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let present: Vec<&str> = ProviderCapability::ALL
            .iter()
            .filter(|c| self.has(**c))
            .map(|c| c.name())
            .collect();
        f.debug_struct("ProviderFunctions").field("present", &present).finish()
    }
}
