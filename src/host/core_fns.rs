/*!
The host's default capability table.

Memory comes from the global allocator with fallible reservation, errors
go to the per-thread queue in [`super::errors`], and the parameters the
core answers are its own version and the name the provider was loaded
under. Any other key is looked up in the handle's configuration.
*/

use crate::constants::{VERSION_STR, params};
use crate::dispatch::{CoreDispatch, CoreHandle};
use crate::error::ParamError;
use crate::memory::{Zeroize, secure_zero_memory};
use crate::params::{Param, ParamDescriptor, ParamRequest, ParamType, ParamValue, fill_params, locate};

use super::errors;

static CORE_PARAM_TYPES: [ParamDescriptor; 3] = [
    ParamDescriptor::new(ParamType::Utf8Ptr, params::CORE_VERSION),
    ParamDescriptor::new(ParamType::Utf8String, params::CORE_PROV_NAME),
    ParamDescriptor::END,
];

/// Table handed to every provider loaded through [`super::Core::new`]
pub(crate) static CORE_DISPATCH: [CoreDispatch; 13] = [
    CoreDispatch::GetParamTypes(core_gettable_params),
    CoreDispatch::GetParams(core_get_params),
    CoreDispatch::PutError(errors::put),
    CoreDispatch::AddErrorData(errors::add_data),
    CoreDispatch::Malloc(core_malloc),
    CoreDispatch::Zalloc(core_zalloc),
    CoreDispatch::Free(core_free),
    CoreDispatch::ClearFree(core_clear_free),
    CoreDispatch::SecureZalloc(core_zalloc),
    CoreDispatch::SecureClearFree(core_clear_free),
    CoreDispatch::SecureMallocInitialized(core_secure_malloc_initialized),
    CoreDispatch::Cleanse(secure_zero_memory),
    CoreDispatch::End,
];

fn core_gettable_params(_handle: &CoreHandle) -> &'static [ParamDescriptor] {
    &CORE_PARAM_TYPES
}

fn is_core_param(key: &str) -> bool {
    key == params::CORE_VERSION || key == params::CORE_PROV_NAME
}

fn core_get_params(handle: &CoreHandle, requests: &mut [ParamRequest<'_>]) -> Result<(), ParamError> {
    // configuration values are answered as owned strings
    for (key, _) in handle.config() {
        if is_core_param(key) {
            continue;
        }
        if let Some(slot) = locate(requests, key) {
            slot.check_type(ParamType::Utf8String)?;
        }
    }

    let known = [
        Param::utf8_ptr(params::CORE_VERSION, VERSION_STR),
        Param::utf8_string(params::CORE_PROV_NAME, handle.name()),
    ];
    fill_params(requests, &known)?;

    for (key, value) in handle.config() {
        if is_core_param(key) {
            continue;
        }
        // the first entry for a key wins
        if let Some(slot) = locate(requests, key).filter(|slot| !slot.is_filled()) {
            slot.set(ParamValue::Utf8String(value.clone()))?;
        }
    }
    Ok(())
}

fn core_malloc(size: usize) -> Option<Vec<u8>> {
    let mut block = Vec::new();
    block.try_reserve_exact(size).ok()?;
    block.resize(size, 0);
    Some(block)
}

fn core_zalloc(size: usize) -> Option<Vec<u8>> {
    core_malloc(size)
}

fn core_free(block: Vec<u8>) {
    drop(block);
}

fn core_clear_free(mut block: Vec<u8>) {
    block.zeroize();
}

fn core_secure_malloc_initialized() -> bool {
    false
}
