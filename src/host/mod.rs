/*!
The host side of negotiation.

A [`Core`] owns the capability table it offers to providers. Loading a
provider runs its external entry point and captures the returned table into
a [`LoadedProvider`], which from then on is the only way the host talks to
that provider. Dropping a `LoadedProvider` tears the provider down.
*/

mod core_fns;
pub mod errors;
pub mod store;

use std::collections::HashMap;
use std::fmt;
use std::sync::{PoisonError, RwLock};

use tracing::{debug, info};

use crate::algorithms::{DigestMethod, MacMethod, OperationId, QueryResult};
use crate::dispatch::{CoreDispatch, CoreHandle, FunctionTable, ProviderFunctions};
use crate::error::{Error, ParamError, Result};
use crate::params::{ParamDescriptor, ParamRequest, ParamResolution, ParamType};
use crate::provider::{ProviderContext, ProviderInitFn};

pub use errors::{ErrorRecord, take_errors};

/// The host core
#[derive(Debug, Clone, Copy)]
pub struct Core {
    table: FunctionTable<'static, CoreDispatch>,
}

impl Default for Core {
    fn default() -> Self {
        Self::new()
    }
}

impl Core {
    /// Core offering the default capability table
    pub fn new() -> Self {
        Self::with_dispatch(FunctionTable::new(&core_fns::CORE_DISPATCH))
    }

    /// Core offering a caller-built capability table
    pub fn with_dispatch(table: FunctionTable<'static, CoreDispatch>) -> Self {
        Self { table }
    }

    /// The table handed to providers
    pub fn dispatch_table(&self) -> FunctionTable<'static, CoreDispatch> {
        self.table
    }

    /// Load a built-in provider by name
    pub fn load(&self, name: &str) -> Result<LoadedProvider> {
        let init = store::lookup(name).ok_or_else(|| Error::UnknownProvider(name.to_string()))?;
        self.load_with(CoreHandle::new(name), init)
    }

    /// Negotiate with a provider through the given entry point
    pub fn load_with(&self, handle: CoreHandle, init: ProviderInitFn) -> Result<LoadedProvider> {
        let negotiated = init(&handle, self.table)?;
        let (functions, report) = ProviderFunctions::capture(negotiated.table);

        info!(
            provider = handle.name(),
            session = negotiated.context.session_id(),
            functions = report.captured,
            "provider loaded"
        );

        Ok(LoadedProvider {
            handle,
            functions,
            context: negotiated.context,
            cache: RwLock::new(HashMap::new()),
        })
    }
}

/// A negotiated provider as seen by the host
pub struct LoadedProvider {
    handle: CoreHandle,
    functions: ProviderFunctions,
    context: ProviderContext,
    cache: RwLock<HashMap<OperationId, QueryResult>>,
}

impl LoadedProvider {
    /// Name the provider was loaded under
    pub fn name(&self) -> &str {
        self.handle.name()
    }

    /// The provider's context handle
    pub fn context(&self) -> &ProviderContext {
        &self.context
    }

    /// The provider's captured capabilities
    pub fn functions(&self) -> &ProviderFunctions {
        &self.functions
    }

    /// Static list of parameters the provider answers
    pub fn param_types(&self) -> Result<&'static [ParamDescriptor]> {
        Ok(self.functions.get_param_types(&self.context)?)
    }

    /// Fill parameter slots from the provider
    pub fn get_params(&self, requests: &mut [ParamRequest<'_>]) -> Result<()> {
        self.functions.get_params(&self.context, requests)
    }

    /// Resolve each `(key, type)` pair to a value, an absence or a type mismatch
    pub fn resolve_params(&self, keys: &[(&str, ParamType)]) -> Result<Vec<ParamResolution>> {
        let mut resolved = Vec::with_capacity(keys.len());

        for (key, data_type) in keys {
            let mut request = [ParamRequest::new(key, *data_type)];
            let resolution = match self.get_params(&mut request) {
                Ok(()) => match request[0].take() {
                    Some(value) => ParamResolution::Value(value),
                    None => ParamResolution::Absent,
                },
                Err(Error::Param(ParamError::TypeMismatch { expected, actual, .. })) => {
                    ParamResolution::TypeMismatch { expected, actual }
                }
                Err(err) => return Err(err),
            };
            resolved.push(resolution);
        }

        Ok(resolved)
    }

    /// Algorithms the provider offers for an operation.
    ///
    /// Answers the provider marks cacheable are kept and reused; the others
    /// are fetched again on every call.
    pub fn query(&self, operation: OperationId) -> Result<QueryResult> {
        if let Some(cached) = self
            .cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&operation)
        {
            return Ok(*cached);
        }

        let result = self.functions.query_operation(&self.context, operation)?;
        debug!(
            provider = self.name(),
            operation = %operation,
            cacheable = result.is_cacheable(),
            "queried provider"
        );

        if result.is_cacheable() {
            self.cache
                .write()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(operation, result);
        }
        Ok(result)
    }

    /// Fetch a digest by name and property query
    pub fn fetch_digest(&self, name: &str, properties: &str) -> Result<DigestMethod> {
        let descriptor = self.query(OperationId::Digest)?.select(name, properties)?;
        Ok(DigestMethod::from_descriptor(descriptor, &self.context)?)
    }

    /// Fetch a MAC by name and property query
    pub fn fetch_mac(&self, name: &str, properties: &str) -> Result<MacMethod> {
        let descriptor = self.query(OperationId::Mac)?.select(name, properties)?;
        Ok(MacMethod::from_descriptor(descriptor, &self.context)?)
    }

    /// Tear the provider down. Nothing may be called on it afterwards.
    pub fn teardown(self) {
        drop(self);
    }
}

impl Drop for LoadedProvider {
    fn drop(&mut self) {
        self.functions.teardown(self.context.clone());
    }
}

impl fmt::Debug for LoadedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadedProvider")
            .field("name", &self.name())
            .field("context", &self.context)
            .field("functions", &self.functions)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::params;
    use crate::params::ParamValue;

    #[test]
    fn test_load_builtin() {
        let provider = Core::new().load("fips").unwrap();
        assert_eq!(provider.name(), "fips");
        assert!(provider.context().is_active());
        assert!(provider.context().core_version().is_some());
    }

    #[test]
    fn test_unknown_provider() {
        assert!(matches!(
            Core::new().load("legacy"),
            Err(Error::UnknownProvider(name)) if name == "legacy"
        ));
    }

    #[test]
    fn test_resolve_params() {
        let provider = Core::new().load("fips").unwrap();
        let resolved = provider
            .resolve_params(&[
                (params::NAME, ParamType::Utf8Ptr),
                ("no-such-param", ParamType::Integer),
                (params::VERSION, ParamType::Utf8String),
            ])
            .unwrap();

        assert!(matches!(resolved[0], ParamResolution::Value(ParamValue::Utf8Ptr(_))));
        assert_eq!(resolved[1], ParamResolution::Absent);
        assert_eq!(
            resolved[2],
            ParamResolution::TypeMismatch {
                expected: ParamType::Utf8String,
                actual: ParamType::Utf8Ptr,
            }
        );
    }

    #[test]
    fn test_cacheable_answers_are_reused() {
        let provider = Core::new().load("fips").unwrap();
        let first = provider.query(OperationId::Digest).unwrap();
        assert!(first.is_cacheable());
        assert!(provider.cache.read().unwrap().contains_key(&OperationId::Digest));

        let second = provider.query(OperationId::Digest).unwrap();
        assert!(std::ptr::eq(first.as_slice(), second.as_slice()));
    }

    thread_local! {
        static QUERIES: std::cell::Cell<usize> = const { std::cell::Cell::new(0) };
    }

    fn counting_query(context: &ProviderContext, operation: OperationId) -> QueryResult {
        QUERIES.with(|q| q.set(q.get() + 1));
        QueryResult::new(crate::algorithms::algorithms_for(operation), !context.config().cacheable)
    }

    static COUNTING_PROVIDER: [crate::dispatch::ProviderDispatch; 3] = [
        crate::dispatch::ProviderDispatch::Teardown(std::mem::drop::<ProviderContext>),
        crate::dispatch::ProviderDispatch::QueryOperation(counting_query),
        crate::dispatch::ProviderDispatch::End,
    ];

    fn uncached_provider_init(
        handle: &CoreHandle,
        table: FunctionTable<'_, CoreDispatch>,
    ) -> std::result::Result<crate::provider::Negotiated, crate::error::NegotiationError> {
        let config = crate::config::ProviderConfig::without_self_check().uncached();
        let negotiated = crate::provider::provider_init_with_config(handle, table, config)?;
        Ok(crate::provider::Negotiated {
            table: FunctionTable::new(&COUNTING_PROVIDER),
            context: negotiated.context,
        })
    }

    #[test]
    fn test_uncacheable_answers_are_queried_every_time() {
        let provider = Core::new()
            .load_with(CoreHandle::new("fips"), uncached_provider_init)
            .unwrap();
        let before = QUERIES.with(std::cell::Cell::get);

        let first = provider.query(OperationId::Digest).unwrap();
        assert!(!first.is_cacheable());
        assert!(!first.is_empty());
        let second = provider.query(OperationId::Digest).unwrap();
        assert!(!second.is_cacheable());

        assert_eq!(QUERIES.with(std::cell::Cell::get), before + 2);
        assert!(!provider.cache.read().unwrap().contains_key(&OperationId::Digest));
    }

    #[test]
    fn test_teardown_deactivates_context() {
        let provider = Core::new().load("fips").unwrap();
        let context = provider.context().clone();
        provider.teardown();
        assert!(!context.is_active());
    }
}
