/*!
Fetched algorithm methods.

A descriptor's function table is captured once into a method object. Method
objects keep a share of the provider context alive, so contexts created
from them can always call back into the provider that made them.
*/

use std::fmt;

use super::digest::{
    DigestBlockSizeFn, DigestCtx, DigestDispatch, DigestDupCtxFn, DigestFinalFn, DigestFreeCtxFn, DigestInitFn,
    DigestNewCtxFn, DigestOneShotFn, DigestSizeFn, DigestUpdateFn,
};
use super::hmac::{
    MacCtx, MacDispatch, MacDupCtxFn, MacFinalFn, MacFreeCtxFn, MacInitFn, MacNewCtxFn, MacSetCtxParamsFn,
    MacSizeFn, MacUpdateFn,
};
use super::{AlgorithmDescriptor, AlgorithmImpl};
use crate::dispatch::ids::{DigestCapability, MacCapability};
use crate::dispatch::is_foreign_id;
use crate::error::{AlgorithmError, FetchError};
use crate::memory::constant_time_eq;
use crate::params::Param;
use crate::provider::ProviderContext;

fn required<T>(f: Option<T>, algorithm: &'static str, function: &'static str) -> Result<T, FetchError> {
    f.ok_or(FetchError::MissingFunction { algorithm, function })
}

#[derive(Clone, Copy)]
struct DigestFunctions {
    newctx: DigestNewCtxFn,
    init: DigestInitFn,
    update: DigestUpdateFn,
    finalize: DigestFinalFn,
    freectx: DigestFreeCtxFn,
    size: DigestSizeFn,
    oneshot: Option<DigestOneShotFn>,
    dupctx: Option<DigestDupCtxFn>,
    block_size: Option<DigestBlockSizeFn>,
}

/// A digest algorithm fetched from a provider
#[derive(Clone)]
pub struct DigestMethod {
    name: &'static str,
    properties: &'static str,
    functions: DigestFunctions,
    provctx: ProviderContext,
}

impl DigestMethod {
    /// Capture a digest descriptor's function table
    pub(crate) fn from_descriptor(descriptor: &AlgorithmDescriptor, provctx: &ProviderContext) -> Result<Self, FetchError> {
        let name = descriptor.name();
        let table = match descriptor.implementation {
            AlgorithmImpl::Digest(table) => table,
            _ => return Err(FetchError::WrongOperation(name)),
        };

        let (mut newctx, mut init, mut update, mut finalize) = (None, None, None, None);
        let (mut freectx, mut size, mut oneshot, mut dupctx, mut block_size) = (None, None, None, None, None);
        for entry in table.entries() {
            match *entry {
                DigestDispatch::NewCtx(f) => newctx = Some(f),
                DigestDispatch::Init(f) => init = Some(f),
                DigestDispatch::Update(f) => update = Some(f),
                DigestDispatch::Final(f) => finalize = Some(f),
                DigestDispatch::OneShot(f) => oneshot = Some(f),
                DigestDispatch::FreeCtx(f) => freectx = Some(f),
                DigestDispatch::DupCtx(f) => dupctx = Some(f),
                DigestDispatch::Size(f) => size = Some(f),
                DigestDispatch::BlockSize(f) => block_size = Some(f),
                DigestDispatch::Unknown { id } => debug_assert!(
                    is_foreign_id(id, DigestCapability::from_id(id).is_some()),
                    "unknown digest entry reuses id {id}"
                ),
                DigestDispatch::End => {}
            }
        }

        let functions = DigestFunctions {
            newctx: required(newctx, name, "newctx")?,
            init: required(init, name, "init")?,
            update: required(update, name, "update")?,
            finalize: required(finalize, name, "final")?,
            freectx: required(freectx, name, "freectx")?,
            size: required(size, name, "size")?,
            oneshot,
            dupctx,
            block_size,
        };

        Ok(Self {
            name,
            properties: descriptor.properties,
            functions,
            provctx: provctx.clone(),
        })
    }

    /// Canonical algorithm name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Property definition the algorithm was registered with
    pub fn properties(&self) -> &'static str {
        self.properties
    }

    /// Output length in bytes
    pub fn size(&self) -> usize {
        (self.functions.size)()
    }

    /// Input block length in bytes
    pub fn block_size(&self) -> Result<usize, FetchError> {
        let f = required(self.functions.block_size, self.name, "block_size")?;
        Ok(f())
    }

    /// Create and initialize a streaming context
    pub fn new_context(&self) -> Result<DigestContext, AlgorithmError> {
        let ctx = (self.functions.newctx)(&self.provctx).ok_or(AlgorithmError::ContextCreation)?;
        let mut context = DigestContext {
            ctx: Some(ctx),
            functions: self.functions,
            size: self.size(),
        };
        context.reset()?;
        Ok(context)
    }

    /// Hash `data` in one call
    pub fn digest(&self, data: &[u8]) -> Result<Vec<u8>, AlgorithmError> {
        let mut out = vec![0u8; self.size()];
        match self.functions.oneshot {
            Some(oneshot) => {
                let written = oneshot(&self.provctx, data, &mut out)?;
                out.truncate(written);
            }
            None => {
                let mut context = self.new_context()?;
                context.update(data)?;
                let written = context.finalize_into(&mut out)?;
                out.truncate(written);
            }
        }
        Ok(out)
    }
}

impl fmt::Debug for DigestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestMethod")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// A live digest computation
pub struct DigestContext {
    ctx: Option<DigestCtx>,
    functions: DigestFunctions,
    size: usize,
}

impl DigestContext {
    fn ctx_mut(&mut self) -> Result<&mut DigestCtx, AlgorithmError> {
        self.ctx.as_mut().ok_or(AlgorithmError::NotInitialized)
    }

    /// Output length in bytes
    pub fn size(&self) -> usize {
        self.size
    }

    /// Restart the computation
    pub fn reset(&mut self) -> Result<(), AlgorithmError> {
        let init = self.functions.init;
        init(self.ctx_mut()?)
    }

    pub fn update(&mut self, data: &[u8]) -> Result<(), AlgorithmError> {
        let update = self.functions.update;
        update(self.ctx_mut()?, data)
    }

    /// Write the digest into `out`, returning the number of bytes written
    pub fn finalize_into(&mut self, out: &mut [u8]) -> Result<usize, AlgorithmError> {
        let finalize = self.functions.finalize;
        finalize(self.ctx_mut()?, out)
    }

    pub fn finalize(&mut self) -> Result<Vec<u8>, AlgorithmError> {
        let mut out = vec![0u8; self.size];
        let written = self.finalize_into(&mut out)?;
        out.truncate(written);
        Ok(out)
    }

    /// Duplicate the context, intermediate state included
    pub fn try_clone(&self) -> Result<Self, AlgorithmError> {
        let dupctx = self.functions.dupctx.ok_or(AlgorithmError::ContextCreation)?;
        let ctx = self.ctx.as_ref().ok_or(AlgorithmError::NotInitialized)?;
        let copy = dupctx(ctx).ok_or(AlgorithmError::ContextCreation)?;
        Ok(Self {
            ctx: Some(copy),
            functions: self.functions,
            size: self.size,
        })
    }
}

impl Drop for DigestContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            (self.functions.freectx)(ctx);
        }
    }
}

impl fmt::Debug for DigestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestContext").field("size", &self.size).finish()
    }
}

#[derive(Clone, Copy)]
struct MacFunctions {
    newctx: MacNewCtxFn,
    init: MacInitFn,
    update: MacUpdateFn,
    finalize: MacFinalFn,
    freectx: MacFreeCtxFn,
    size: MacSizeFn,
    dupctx: Option<MacDupCtxFn>,
    set_ctx_params: Option<MacSetCtxParamsFn>,
}

/// A MAC algorithm fetched from a provider
#[derive(Clone)]
pub struct MacMethod {
    name: &'static str,
    properties: &'static str,
    functions: MacFunctions,
    provctx: ProviderContext,
}

impl MacMethod {
    /// Capture a MAC descriptor's function table
    pub(crate) fn from_descriptor(descriptor: &AlgorithmDescriptor, provctx: &ProviderContext) -> Result<Self, FetchError> {
        let name = descriptor.name();
        let table = match descriptor.implementation {
            AlgorithmImpl::Mac(table) => table,
            _ => return Err(FetchError::WrongOperation(name)),
        };

        let (mut newctx, mut init, mut update, mut finalize) = (None, None, None, None);
        let (mut freectx, mut size, mut dupctx, mut set_ctx_params) = (None, None, None, None);
        for entry in table.entries() {
            match *entry {
                MacDispatch::NewCtx(f) => newctx = Some(f),
                MacDispatch::Init(f) => init = Some(f),
                MacDispatch::Update(f) => update = Some(f),
                MacDispatch::Final(f) => finalize = Some(f),
                MacDispatch::FreeCtx(f) => freectx = Some(f),
                MacDispatch::DupCtx(f) => dupctx = Some(f),
                MacDispatch::SetCtxParams(f) => set_ctx_params = Some(f),
                MacDispatch::Size(f) => size = Some(f),
                MacDispatch::Unknown { id } => debug_assert!(
                    is_foreign_id(id, MacCapability::from_id(id).is_some()),
                    "unknown MAC entry reuses id {id}"
                ),
                MacDispatch::End => {}
            }
        }

        let functions = MacFunctions {
            newctx: required(newctx, name, "newctx")?,
            init: required(init, name, "init")?,
            update: required(update, name, "update")?,
            finalize: required(finalize, name, "final")?,
            freectx: required(freectx, name, "freectx")?,
            size: required(size, name, "size")?,
            dupctx,
            set_ctx_params,
        };

        Ok(Self {
            name,
            properties: descriptor.properties,
            functions,
            provctx: provctx.clone(),
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn properties(&self) -> &'static str {
        self.properties
    }

    /// Create an uninitialized MAC context
    pub fn new_context(&self) -> Result<MacContext, AlgorithmError> {
        let ctx = (self.functions.newctx)(&self.provctx).ok_or(AlgorithmError::ContextCreation)?;
        Ok(MacContext {
            ctx: Some(ctx),
            functions: self.functions,
        })
    }

    /// Compute a MAC over `data` in one call
    pub fn mac(&self, params: &[Param], key: &[u8], data: &[u8]) -> Result<Vec<u8>, AlgorithmError> {
        let mut context = self.new_context()?;
        context.set_params(params)?;
        context.init(key)?;
        context.update(data)?;
        context.finalize()
    }
}

impl fmt::Debug for MacMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacMethod")
            .field("name", &self.name)
            .field("properties", &self.properties)
            .finish()
    }
}

/// A live MAC computation
pub struct MacContext {
    ctx: Option<MacCtx>,
    functions: MacFunctions,
}

impl MacContext {
    fn ctx_mut(&mut self) -> Result<&mut MacCtx, AlgorithmError> {
        self.ctx.as_mut().ok_or(AlgorithmError::NotInitialized)
    }

    /// Tag length in bytes for the current settings
    pub fn size(&self) -> usize {
        self.ctx.as_ref().map_or(0, self.functions.size)
    }

    /// Apply context parameters; unknown names are ignored
    pub fn set_params(&mut self, params: &[Param]) -> Result<(), AlgorithmError> {
        if params.is_empty() {
            return Ok(());
        }
        match self.functions.set_ctx_params {
            Some(set) => set(self.ctx_mut()?, params),
            None => Ok(()),
        }
    }

    /// Key the context and start a new computation
    pub fn init(&mut self, key: &[u8]) -> Result<(), AlgorithmError> {
        let init = self.functions.init;
        init(self.ctx_mut()?, key)
    }

    pub fn update(&mut self, data: &[u8]) -> Result<(), AlgorithmError> {
        let update = self.functions.update;
        update(self.ctx_mut()?, data)
    }

    pub fn finalize_into(&mut self, out: &mut [u8]) -> Result<usize, AlgorithmError> {
        let finalize = self.functions.finalize;
        finalize(self.ctx_mut()?, out)
    }

    pub fn finalize(&mut self) -> Result<Vec<u8>, AlgorithmError> {
        let mut out = vec![0u8; self.size()];
        let written = self.finalize_into(&mut out)?;
        out.truncate(written);
        Ok(out)
    }

    /// Finalize and compare against `tag` in constant time
    pub fn verify(&mut self, tag: &[u8]) -> Result<bool, AlgorithmError> {
        let computed = self.finalize()?;
        Ok(constant_time_eq(&computed, tag))
    }

    pub fn try_clone(&self) -> Result<Self, AlgorithmError> {
        let dupctx = self.functions.dupctx.ok_or(AlgorithmError::ContextCreation)?;
        let ctx = self.ctx.as_ref().ok_or(AlgorithmError::NotInitialized)?;
        let copy = dupctx(ctx).ok_or(AlgorithmError::ContextCreation)?;
        Ok(Self {
            ctx: Some(copy),
            functions: self.functions,
        })
    }
}

impl Drop for MacContext {
    fn drop(&mut self) {
        if let Some(ctx) = self.ctx.take() {
            (self.functions.freectx)(ctx);
        }
    }
}

impl fmt::Debug for MacContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MacContext").field("size", &self.size()).finish()
    }
}
