/*!
Digest algorithms.

The hash transforms come from the `sha2` crate; this module only wraps them
in per-algorithm function tables. One generic set of functions is
instantiated per hash, so every table has the same shape.
*/

use std::any::Any;
use std::fmt;

use sha2::digest::{FixedOutputReset, Reset};
use sha2::{Digest, Sha224, Sha256, Sha384, Sha512};

use super::{AlgorithmDescriptor, AlgorithmImpl};
use crate::constants::FIPS_PROPERTIES;
use crate::dispatch::ids::DigestCapability;
use crate::dispatch::{DispatchEntry, FunctionTable};
use crate::error::AlgorithmError;
use crate::provider::ProviderContext;

pub type DigestNewCtxFn = fn(&ProviderContext) -> Option<DigestCtx>;
pub type DigestInitFn = fn(&mut DigestCtx) -> Result<(), AlgorithmError>;
pub type DigestUpdateFn = fn(&mut DigestCtx, &[u8]) -> Result<(), AlgorithmError>;
pub type DigestFinalFn = fn(&mut DigestCtx, &mut [u8]) -> Result<usize, AlgorithmError>;
pub type DigestOneShotFn = fn(&ProviderContext, &[u8], &mut [u8]) -> Result<usize, AlgorithmError>;
pub type DigestFreeCtxFn = fn(DigestCtx);
pub type DigestDupCtxFn = fn(&DigestCtx) -> Option<DigestCtx>;
pub type DigestSizeFn = fn() -> usize;
pub type DigestBlockSizeFn = fn() -> usize;

/// One entry of a digest algorithm's function table
#[derive(Clone, Copy)]
pub enum DigestDispatch {
    NewCtx(DigestNewCtxFn),
    Init(DigestInitFn),
    Update(DigestUpdateFn),
    Final(DigestFinalFn),
    OneShot(DigestOneShotFn),
    FreeCtx(DigestFreeCtxFn),
    DupCtx(DigestDupCtxFn),
    Size(DigestSizeFn),
    BlockSize(DigestBlockSizeFn),
    /// An id from a newer protocol revision. The id must not be zero or
    /// one of the ids `DigestCapability` assigns.
    Unknown { id: u32 },
    End,
}

impl DispatchEntry for DigestDispatch {
    fn function_id(&self) -> u32 {
        let capability = match self {
            DigestDispatch::NewCtx(_) => DigestCapability::NewCtx,
            DigestDispatch::Init(_) => DigestCapability::Init,
            DigestDispatch::Update(_) => DigestCapability::Update,
            DigestDispatch::Final(_) => DigestCapability::Final,
            DigestDispatch::OneShot(_) => DigestCapability::OneShot,
            DigestDispatch::FreeCtx(_) => DigestCapability::FreeCtx,
            DigestDispatch::DupCtx(_) => DigestCapability::DupCtx,
            DigestDispatch::Size(_) => DigestCapability::Size,
            DigestDispatch::BlockSize(_) => DigestCapability::BlockSize,
            DigestDispatch::Unknown { id } => return *id,
            DigestDispatch::End => return crate::dispatch::ids::END,
        };
        capability.id()
    }
}

impl fmt::Debug for DigestDispatch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match DigestCapability::from_id(self.function_id()) {
            Some(capability) => write!(f, "DigestDispatch({})", capability),
            None => write!(f, "DigestDispatch({})", self.function_id()),
        }
    }
}

/// Opaque per-operation digest state
pub struct DigestCtx {
    state: Box<dyn Any + Send + Sync>,
}

impl DigestCtx {
    fn new<D: ShaVariant>() -> Self {
        Self {
            state: Box::new(HashState::<D> {
                hasher: D::new(),
                finalized: false,
            }),
        }
    }

    fn state_mut<D: ShaVariant>(&mut self) -> Result<&mut HashState<D>, AlgorithmError> {
        self.state
            .downcast_mut::<HashState<D>>()
            .ok_or(AlgorithmError::WrongContext)
    }

    fn state<D: ShaVariant>(&self) -> Option<&HashState<D>> {
        self.state.downcast_ref::<HashState<D>>()
    }
}

impl fmt::Debug for DigestCtx {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestCtx").finish_non_exhaustive()
    }
}

#[derive(Clone)]
struct HashState<D> {
    hasher: D,
    finalized: bool,
}

/// A hash from `sha2` that can back a digest table
trait ShaVariant: Digest + FixedOutputReset + Reset + Clone + Send + Sync + 'static {
    const BLOCK_SIZE: usize;
}

impl ShaVariant for Sha224 {
    const BLOCK_SIZE: usize = 64;
}

impl ShaVariant for Sha256 {
    const BLOCK_SIZE: usize = 64;
}

impl ShaVariant for Sha384 {
    const BLOCK_SIZE: usize = 128;
}

impl ShaVariant for Sha512 {
    const BLOCK_SIZE: usize = 128;
}

fn newctx<D: ShaVariant>(_provctx: &ProviderContext) -> Option<DigestCtx> {
    Some(DigestCtx::new::<D>())
}

fn init<D: ShaVariant>(ctx: &mut DigestCtx) -> Result<(), AlgorithmError> {
    let state = ctx.state_mut::<D>()?;
    Digest::reset(&mut state.hasher);
    state.finalized = false;
    Ok(())
}

fn update<D: ShaVariant>(ctx: &mut DigestCtx, data: &[u8]) -> Result<(), AlgorithmError> {
    let state = ctx.state_mut::<D>()?;
    if state.finalized {
        return Err(AlgorithmError::Finalized);
    }
    Digest::update(&mut state.hasher, data);
    Ok(())
}

fn finalize<D: ShaVariant>(ctx: &mut DigestCtx, out: &mut [u8]) -> Result<usize, AlgorithmError> {
    let needed = <D as Digest>::output_size();
    if out.len() < needed {
        return Err(AlgorithmError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }

    let state = ctx.state_mut::<D>()?;
    if state.finalized {
        return Err(AlgorithmError::Finalized);
    }
    let digest = Digest::finalize_reset(&mut state.hasher);
    out[..needed].copy_from_slice(&digest);
    state.finalized = true;
    Ok(needed)
}

fn oneshot<D: ShaVariant>(_provctx: &ProviderContext, data: &[u8], out: &mut [u8]) -> Result<usize, AlgorithmError> {
    let needed = <D as Digest>::output_size();
    if out.len() < needed {
        return Err(AlgorithmError::BufferTooSmall {
            needed,
            available: out.len(),
        });
    }
    out[..needed].copy_from_slice(&D::digest(data));
    Ok(needed)
}

fn freectx<D: ShaVariant>(ctx: DigestCtx) {
    drop(ctx);
}

fn dupctx<D: ShaVariant>(ctx: &DigestCtx) -> Option<DigestCtx> {
    let state = ctx.state::<D>()?.clone();
    Some(DigestCtx {
        state: Box::new(state),
    })
}

fn size<D: ShaVariant>() -> usize {
    <D as Digest>::output_size()
}

fn block_size<D: ShaVariant>() -> usize {
    D::BLOCK_SIZE
}

macro_rules! sha_functions {
    ($hash:ty) => {
        [
            DigestDispatch::NewCtx(newctx::<$hash>),
            DigestDispatch::Init(init::<$hash>),
            DigestDispatch::Update(update::<$hash>),
            DigestDispatch::Final(finalize::<$hash>),
            DigestDispatch::OneShot(oneshot::<$hash>),
            DigestDispatch::FreeCtx(freectx::<$hash>),
            DigestDispatch::DupCtx(dupctx::<$hash>),
            DigestDispatch::Size(size::<$hash>),
            DigestDispatch::BlockSize(block_size::<$hash>),
            DigestDispatch::End,
        ]
    };
}

static SHA224_FUNCTIONS: [DigestDispatch; 10] = sha_functions!(Sha224);
static SHA256_FUNCTIONS: [DigestDispatch; 10] = sha_functions!(Sha256);
static SHA384_FUNCTIONS: [DigestDispatch; 10] = sha_functions!(Sha384);
static SHA512_FUNCTIONS: [DigestDispatch; 10] = sha_functions!(Sha512);

/// Digest algorithms offered by the provider
pub(crate) static DIGESTS: [AlgorithmDescriptor; 5] = [
    AlgorithmDescriptor::new(
        "SHA2-224:SHA-224:SHA224",
        FIPS_PROPERTIES,
        AlgorithmImpl::Digest(FunctionTable::new(&SHA224_FUNCTIONS)),
    ),
    AlgorithmDescriptor::new(
        "SHA2-256:SHA-256:SHA256",
        FIPS_PROPERTIES,
        AlgorithmImpl::Digest(FunctionTable::new(&SHA256_FUNCTIONS)),
    ),
    AlgorithmDescriptor::new(
        "SHA2-384:SHA-384:SHA384",
        FIPS_PROPERTIES,
        AlgorithmImpl::Digest(FunctionTable::new(&SHA384_FUNCTIONS)),
    ),
    AlgorithmDescriptor::new(
        "SHA2-512:SHA-512:SHA512",
        FIPS_PROPERTIES,
        AlgorithmImpl::Digest(FunctionTable::new(&SHA512_FUNCTIONS)),
    ),
    AlgorithmDescriptor::END,
];
