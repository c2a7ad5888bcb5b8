/*!
HMAC.

The MAC is composed from a digest that it fetches from its own provider
through the internal entry point. No second provider context is created;
the HMAC context shares the one it was created under.
*/

use std::fmt;

use tracing::trace;

use super::fetch::{DigestContext, DigestMethod};
use super::{AlgorithmDescriptor, AlgorithmImpl};
use crate::constants::{FIPS_PROPERTIES, params};
use crate::dispatch::ids::MacCapability;
use crate::dispatch::{DispatchEntry, FunctionTable};
use crate::error::{AlgorithmError, ParamError};
use crate::memory::HostBlock;
use crate::params::{Param, ParamType};
use crate::provider::{ProviderContext, fetch_digest_internal};

pub type MacNewCtxFn = fn(&ProviderContext) -> Option<MacCtx>;
pub type MacInitFn = fn(&mut MacCtx, &[u8]) -> Result<(), AlgorithmError>;
pub type MacUpdateFn = fn(&mut MacCtx, &[u8]) -> Result<(), AlgorithmError>;
pub type MacFinalFn = fn(&mut MacCtx, &mut [u8]) -> Result<usize, AlgorithmError>;
pub type MacFreeCtxFn = fn(MacCtx);
pub type MacDupCtxFn = fn(&MacCtx) -> Option<MacCtx>;
pub type MacSetCtxParamsFn = fn(&mut MacCtx, &[Param]) -> Result<(), AlgorithmError>;
pub type MacSizeFn = fn(&MacCtx) -> usize;

/// Digest used when none is configured
pub const DEFAULT_DIGEST: &str = "SHA256";

const IPAD: u8 = 0x36;
const OPAD: u8 = 0x5c;

/// One entry of a MAC algorithm's function table
#[derive(Clone, Copy)]
pub enum MacDispatch {
    NewCtx(MacNewCtxFn),
    Init(MacInitFn),
    Update(MacUpdateFn),
    Final(MacFinalFn),
    FreeCtx(MacFreeCtxFn),
    DupCtx(MacDupCtxFn),
    SetCtxParams(MacSetCtxParamsFn),
    Size(MacSizeFn),
    /// An id from a newer protocol revision. The id must not be zero or
    /// one of the ids `MacCapability` assigns.
    Unknown { id: u32 },
    End,
}

impl DispatchEntry for MacDispatch {
    fn function_id(&self) -> u32 {
        let capability = match self {
            MacDispatch::NewCtx(_) => MacCapability::NewCtx,
            MacDispatch::Init(_) => MacCapability::Init,
            MacDispatch::Update(_) => MacCapability::Update,
            MacDispatch::Final(_) => MacCapability::Final,
            MacDispatch::FreeCtx(_) => MacCapability::FreeCtx,
            MacDispatch::DupCtx(_) => MacCapability::DupCtx,
            MacDispatch::SetCtxParams(_) => MacCapability::SetCtxParams,
            MacDispatch::Size(_) => MacCapability::Size,
            MacDispatch::Unknown { id } => return *id,
            MacDispatch::End => return crate::dispatch::ids::END,
        };
        capability.id()
    }
}

impl fmt::Debug for MacDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match MacCapability::from_id(self.function_id()) {
            Some(capability) => write!(f, "MacDispatch({})", capability),
            None => write!(f, "MacDispatch({})", self.function_id()),
        }
    }
}

/// Opaque per-operation HMAC state
pub struct MacCtx {
    provctx: ProviderContext,
    digest_name: String,
    properties: String,
    digest: DigestMethod,
    keyed: Option<Keyed>,
}

struct Keyed {
    inner: DigestContext,
    outer_key: HostBlock,
    finalized: bool,
}

impl MacCtx {
    fn keyed_mut(&mut self) -> Result<&mut Keyed, AlgorithmError> {
        self.keyed.as_mut().ok_or(AlgorithmError::NotInitialized)
    }
}

impl fmt::Debug for MacCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacCtx")
            .field("digest", &self.digest.name())
            .field("keyed", &self.keyed.is_some())
            .finish()
    }
}

fn newctx(provctx: &ProviderContext) -> Option<MacCtx> {
    let digest = fetch_digest_internal(provctx, DEFAULT_DIGEST, "").ok()?;
    Some(MacCtx {
        provctx: provctx.clone(),
        digest_name: DEFAULT_DIGEST.to_string(),
        properties: String::new(),
        digest,
        keyed: None,
    })
}

fn init(ctx: &mut MacCtx, key: &[u8]) -> Result<(), AlgorithmError> {
    let core = ctx.provctx.core();
    let block_size = ctx.digest.block_size()?;

    let mut k0 = HostBlock::secure_zalloc(core, block_size)?;
    if key.len() > block_size {
        let hashed = ctx.digest.digest(key)?;
        k0[..hashed.len()].copy_from_slice(&hashed);
    } else {
        k0[..key.len()].copy_from_slice(key);
    }

    let mut pad = HostBlock::secure_zalloc(core, block_size)?;
    for (p, k) in pad.iter_mut().zip(k0.iter()) {
        *p = k ^ IPAD;
    }
    let mut inner = ctx.digest.new_context()?;
    inner.update(&pad)?;

    for (p, k) in pad.iter_mut().zip(k0.iter()) {
        *p = k ^ OPAD;
    }

    ctx.keyed = Some(Keyed {
        inner,
        outer_key: pad,
        finalized: false,
    });
    trace!(digest = ctx.digest.name(), "hmac keyed");
    Ok(())
}

fn update(ctx: &mut MacCtx, data: &[u8]) -> Result<(), AlgorithmError> {
    let keyed = ctx.keyed_mut()?;
    if keyed.finalized {
        return Err(AlgorithmError::Finalized);
    }
    keyed.inner.update(data)
}

fn finalize(ctx: &mut MacCtx, out: &mut [u8]) -> Result<usize, AlgorithmError> {
    let needed = ctx.digest.size();
    if out.len() < needed {
        return Err(AlgorithmError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    let core = *ctx.provctx.core();
    let mut outer = ctx.digest.new_context()?;
    let keyed = ctx.keyed_mut()?;
    if keyed.finalized {
        return Err(AlgorithmError::Finalized);
    }

    let mut inner_hash = keyed.inner.finalize()?;
    outer.update(&keyed.outer_key)?;
    outer.update(&inner_hash)?;
    core.cleanse(&mut inner_hash);

    let written = outer.finalize_into(out)?;
    keyed.finalized = true;
    Ok(written)
}

fn freectx(ctx: MacCtx) {
    drop(ctx);
}

fn dupctx(ctx: &MacCtx) -> Option<MacCtx> {
    let keyed = match &ctx.keyed {
        Some(keyed) => Some(Keyed {
            inner: keyed.inner.try_clone().ok()?,
            outer_key: keyed.outer_key.try_clone().ok()?,
            finalized: keyed.finalized,
        }),
        None => None,
    };
    Some(MacCtx {
        provctx: ctx.provctx.clone(),
        digest_name: ctx.digest_name.clone(),
        properties: ctx.properties.clone(),
        digest: ctx.digest.clone(),
        keyed,
    })
}

fn string_param(param: &Param) -> Result<&str, AlgorithmError> {
    param.value.as_str().ok_or_else(|| {
        AlgorithmError::Param(ParamError::TypeMismatch {
            key: param.key.to_string(),
            expected: ParamType::Utf8String,
            actual: param.value.param_type(),
        })
    })
}

fn set_ctx_params(ctx: &mut MacCtx, settings: &[Param]) -> Result<(), AlgorithmError> {
    let mut digest_name = ctx.digest_name.clone();
    let mut properties = ctx.properties.clone();

    for param in settings {
        match param.key {
            params::MAC_DIGEST => digest_name = string_param(param)?.to_string(),
            params::MAC_PROPERTIES => properties = string_param(param)?.to_string(),
            _ => {}
        }
    }

    if digest_name != ctx.digest_name || properties != ctx.properties {
        ctx.digest = fetch_digest_internal(&ctx.provctx, &digest_name, &properties)?;
        ctx.digest_name = digest_name;
        ctx.properties = properties;
        ctx.keyed = None;
    }
    Ok(())
}

fn size(ctx: &MacCtx) -> usize {
    ctx.digest.size()
}

static HMAC_FUNCTIONS: [MacDispatch; 9] = [
    MacDispatch::NewCtx(newctx),
    MacDispatch::Init(init),
    MacDispatch::Update(update),
    MacDispatch::Final(finalize),
    MacDispatch::FreeCtx(freectx),
    MacDispatch::DupCtx(dupctx),
    MacDispatch::SetCtxParams(set_ctx_params),
    MacDispatch::Size(size),
    MacDispatch::End,
];

/// MAC algorithms offered by the provider
pub(crate) static MACS: [AlgorithmDescriptor; 2] = [
    AlgorithmDescriptor::new(
        "HMAC",
        FIPS_PROPERTIES,
        AlgorithmImpl::Mac(FunctionTable::new(&HMAC_FUNCTIONS)),
    ),
    AlgorithmDescriptor::END,
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_well_formed() {
        let table = FunctionTable::new(&HMAC_FUNCTIONS);
        assert!(table.validate().is_ok());
        assert_eq!(table.len(), MacCapability::ALL.len());
        assert!(table.find(MacCapability::SetCtxParams.id()).is_some());
    }

    #[test]
    fn test_non_string_digest_param_is_rejected() {
        let param = Param::new(params::MAC_DIGEST, crate::params::ParamValue::Integer(256));
        assert!(matches!(
            string_param(&param),
            Err(AlgorithmError::Param(ParamError::TypeMismatch {
                expected: ParamType::Utf8String,
                actual: ParamType::Integer,
                ..
            }))
        ));
    }
}
