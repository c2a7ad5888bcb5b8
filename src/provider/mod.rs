/*!
The provider side of negotiation.

[`provider_init`] is the external entry point: it captures the host's
capabilities, creates the one [`ProviderContext`] for the session, runs the
self-check and only then hands out the provider's function table. Any
failure leaves nothing behind.

The crate-internal entry point reuses an existing context and returns a
restricted table. Composite algorithms and the self-check use it to reach
the provider's own algorithms without negotiating again.
*/

mod context;
mod self_check;

pub use context::ProviderContext;

use tracing::{debug, info, trace, warn};

use crate::algorithms::{DigestMethod, OperationId, QueryResult, algorithms_for};
use crate::config::ProviderConfig;
use crate::constants::{BUILD_INFO, PROVIDER_NAME, VERSION_STR, errors, params};
use crate::dispatch::{CoreCapabilities, CoreDispatch, CoreHandle, FunctionTable, ProviderDispatch, ProviderFunctions};
use crate::error::{FetchError, NegotiationError, ParamError, SelfCheckFailure};
use crate::params::{Param, ParamDescriptor, ParamRequest, ParamType, ParamValue, fill_params};

/// What a successful negotiation hands back to the host
#[derive(Debug)]
pub struct Negotiated {
    /// The provider's outgoing function table
    pub table: FunctionTable<'static, ProviderDispatch>,
    /// Context to pass back on every call through `table`
    pub context: ProviderContext,
}

/// Signature of a provider's external entry point
pub type ProviderInitFn = fn(&CoreHandle, FunctionTable<'_, CoreDispatch>) -> Result<Negotiated, NegotiationError>;

static PROVIDER_PARAM_TYPES: [ParamDescriptor; 5] = [
    ParamDescriptor::new(ParamType::Utf8Ptr, params::NAME),
    ParamDescriptor::new(ParamType::Utf8Ptr, params::VERSION),
    ParamDescriptor::new(ParamType::Utf8Ptr, params::BUILDINFO),
    ParamDescriptor::new(ParamType::Integer, params::STATUS),
    ParamDescriptor::END,
];

static PROVIDER_DISPATCH: [ProviderDispatch; 5] = [
    ProviderDispatch::Teardown(provider_teardown),
    ProviderDispatch::GetParamTypes(provider_gettable_params),
    ProviderDispatch::GetParams(provider_get_params),
    ProviderDispatch::QueryOperation(provider_query),
    ProviderDispatch::End,
];

static INTERN_DISPATCH: [ProviderDispatch; 2] = [
    ProviderDispatch::QueryOperation(provider_query),
    ProviderDispatch::End,
];

/// External entry point with the default configuration
pub fn provider_init(
    handle: &CoreHandle,
    core_table: FunctionTable<'_, CoreDispatch>,
) -> Result<Negotiated, NegotiationError> {
    provider_init_with_config(handle, core_table, ProviderConfig::default())
}

/// External entry point.
///
/// On error no context is outstanding and no table has been returned.
pub fn provider_init_with_config(
    handle: &CoreHandle,
    core_table: FunctionTable<'_, CoreDispatch>,
    config: ProviderConfig,
) -> Result<Negotiated, NegotiationError> {
    config
        .validate()
        .map_err(|err| NegotiationError::InvalidConfig(err.to_string()))?;

    let (core, report) = CoreCapabilities::capture(core_table);
    let core_version = read_core_version(&core, handle);

    let context = ProviderContext::new(handle, core, config, core_version).map_err(|err| {
        warn!(provider = handle.name(), error = %err, "provider context allocation failed");
        NegotiationError::ContextAllocation(err)
    })?;

    if let Err(err) = self_check::run(&context) {
        report_failure(&core, &err);
        warn!(
            provider = handle.name(),
            session = context.session_id(),
            error = %err,
            "provider self-check failed"
        );
        drop(context);
        return Err(err);
    }

    context.activate();
    info!(
        provider = handle.name(),
        session = context.session_id(),
        captured = report.captured,
        ignored = report.ignored,
        "provider negotiated"
    );

    Ok(Negotiated {
        table: FunctionTable::new(&PROVIDER_DISPATCH),
        context,
    })
}

/// Internal entry point.
///
/// Takes a context produced by a prior external negotiation and returns
/// only the table needed to query the provider's own algorithms. No context
/// is created and the self-check does not run.
pub(crate) fn intern_provider_init(context: &ProviderContext) -> FunctionTable<'static, ProviderDispatch> {
    trace!(session = context.session_id(), "internal provider entry");
    FunctionTable::new(&INTERN_DISPATCH)
}

/// Fetch one of the provider's own digests through the internal entry point
pub(crate) fn fetch_digest_internal(
    context: &ProviderContext,
    name: &str,
    properties: &str,
) -> Result<DigestMethod, FetchError> {
    let (functions, _) = ProviderFunctions::capture(intern_provider_init(context));
    let algorithms = functions.query_operation(context, OperationId::Digest)?;
    let descriptor = algorithms.select(name, properties)?;
    DigestMethod::from_descriptor(descriptor, context)
}

fn read_core_version(core: &CoreCapabilities, handle: &CoreHandle) -> Option<String> {
    let mut request = [ParamRequest::utf8_ptr(params::CORE_VERSION)];
    match core.get_params(handle, &mut request) {
        Ok(()) => request[0].take().and_then(|v| v.as_str().map(str::to_string)),
        Err(err) => {
            debug!(error = %err, "core version unavailable");
            None
        }
    }
}

fn report_failure(core: &CoreCapabilities, err: &NegotiationError) {
    let reason = match err {
        NegotiationError::SelfCheck {
            reason: SelfCheckFailure::Unavailable(_),
            ..
        } => errors::REASON_ALGORITHM_UNAVAILABLE,
        _ => errors::REASON_SELF_CHECK_FAILURE,
    };

    if core.put_error(errors::LIB_PROVIDER, reason, file!(), line!()).is_ok() {
        // a host without AddErrorData still gets the bare error
        let _ = core.add_error_data(&err.to_string());
    }
}

fn provider_teardown(context: ProviderContext) {
    context.deactivate();
    info!(
        provider = context.handle().name(),
        session = context.session_id(),
        "provider torn down"
    );
}

fn provider_gettable_params(_context: &ProviderContext) -> &'static [ParamDescriptor] {
    &PROVIDER_PARAM_TYPES
}

fn provider_get_params(context: &ProviderContext, requests: &mut [ParamRequest<'_>]) -> Result<(), ParamError> {
    let known = [
        Param::utf8_ptr(params::NAME, PROVIDER_NAME),
        Param::utf8_ptr(params::VERSION, VERSION_STR),
        Param::utf8_ptr(params::BUILDINFO, BUILD_INFO),
        Param::new(params::STATUS, ParamValue::Integer(i64::from(context.is_active()))),
    ];
    fill_params(requests, &known)
}

fn provider_query(context: &ProviderContext, operation: OperationId) -> QueryResult {
    let algorithms = algorithms_for(operation);
    debug!(session = context.session_id(), operation = %operation, "provider query");
    QueryResult::new(algorithms, !context.config().cacheable)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnownAnswerTest;
    use crate::dispatch::ids::ProviderCapability;
    use crate::dispatch::terminated;
    use std::cell::Cell;

    thread_local! {
        static ALLOCATIONS: Cell<usize> = const { Cell::new(0) };
        static ERRORS: Cell<usize> = const { Cell::new(0) };
    }

    fn zalloc(size: usize) -> Option<Vec<u8>> {
        ALLOCATIONS.with(|a| a.set(a.get() + 1));
        Some(vec![0; size])
    }

    fn refuse(_size: usize) -> Option<Vec<u8>> {
        None
    }

    fn put_error(_library: u32, _reason: u32, _file: &'static str, _line: u32) {
        ERRORS.with(|e| e.set(e.get() + 1));
    }

    static CORE: [CoreDispatch; 3] = [
        CoreDispatch::Zalloc(zalloc),
        CoreDispatch::PutError(put_error),
        CoreDispatch::End,
    ];

    fn handle() -> CoreHandle {
        CoreHandle::new("fips")
    }

    fn allocations() -> usize {
        ALLOCATIONS.with(Cell::get)
    }

    #[test]
    fn test_negotiation_returns_full_table() {
        let negotiated = provider_init(&handle(), FunctionTable::new(&CORE)).unwrap();
        assert!(negotiated.context.is_active());

        let (functions, report) = ProviderFunctions::capture(negotiated.table);
        assert_eq!(report.captured, ProviderCapability::ALL.len());
        for capability in ProviderCapability::ALL {
            assert!(functions.has(*capability));
        }
        functions.teardown(negotiated.context);
    }

    #[test]
    fn test_intern_entry_creates_no_context() {
        let negotiated = provider_init(&handle(), FunctionTable::new(&CORE)).unwrap();
        let before = allocations();

        let table = intern_provider_init(&negotiated.context);
        let (functions, _) = ProviderFunctions::capture(table);
        assert!(functions.has(ProviderCapability::QueryOperation));
        assert!(!functions.has(ProviderCapability::Teardown));

        let method = fetch_digest_internal(&negotiated.context, "SHA256", "fips=yes").unwrap();
        assert_eq!(method.name(), "SHA2-256");
        assert_eq!(allocations(), before);
    }

    #[test]
    fn test_allocation_failure() {
        static REFUSING: [CoreDispatch; 2] = [CoreDispatch::Zalloc(refuse), CoreDispatch::End];
        let err = provider_init(&handle(), FunctionTable::new(&REFUSING)).unwrap_err();
        assert!(matches!(err, NegotiationError::ContextAllocation(_)));
    }

    #[test]
    fn test_failed_self_check_is_reported_and_distinct() {
        let mut test = KnownAnswerTest::sha256();
        test.expected[0] ^= 0xff;
        let errors_before = ERRORS.with(Cell::get);

        let err = provider_init_with_config(
            &handle(),
            FunctionTable::new(&CORE),
            ProviderConfig::with_known_answer(test),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            NegotiationError::SelfCheck {
                reason: SelfCheckFailure::Mismatch,
                ..
            }
        ));
        // CORE has no AddErrorData, the error itself still reaches the host
        assert_eq!(ERRORS.with(Cell::get), errors_before + 1);
    }

    #[test]
    fn test_self_check_with_unknown_algorithm() {
        let mut test = KnownAnswerTest::sha256();
        test.algorithm = "MD5".into();

        let err = provider_init_with_config(
            &handle(),
            FunctionTable::new(&CORE),
            ProviderConfig::with_known_answer(test),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            NegotiationError::SelfCheck {
                reason: SelfCheckFailure::Unavailable(FetchError::NotFound { .. }),
                ..
            }
        ));
    }

    #[test]
    fn test_status_follows_lifecycle() {
        let negotiated = provider_init(&handle(), FunctionTable::new(&CORE)).unwrap();
        let mut request = [ParamRequest::integer(params::STATUS)];
        provider_get_params(&negotiated.context, &mut request).unwrap();
        assert_eq!(request[0].value().and_then(ParamValue::as_i64), Some(1));
    }

    #[test]
    fn test_query_cacheability_follows_config() {
        let negotiated = provider_init_with_config(
            &handle(),
            FunctionTable::new(&CORE),
            ProviderConfig::without_self_check().uncached(),
        )
        .unwrap();

        let result = provider_query(&negotiated.context, OperationId::Digest);
        assert!(!result.is_cacheable());
        assert!(terminated(result.as_slice()).count() >= 1);
    }
}
