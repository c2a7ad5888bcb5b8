/*!
Provider context.

One context exists per successful negotiation. It owns the captured host
capabilities and a block of host-allocated storage, and it is shared by
reference with everything the provider hands out afterwards.
*/

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use crate::config::ProviderConfig;
use crate::constants::CONTEXT_STORAGE_BYTES;
use crate::dispatch::{CoreCapabilities, CoreHandle};
use crate::error::CapabilityError;
use crate::memory::HostBlock;

static NEXT_SESSION: AtomicU64 = AtomicU64::new(1);

struct LibraryContext {
    session: u64,
    handle: CoreHandle,
    core: CoreCapabilities,
    config: ProviderConfig,
    core_version: Option<String>,
    active: AtomicBool,
    _storage: HostBlock,
}

/// Opaque handle to a negotiated provider's state
pub struct ProviderContext {
    inner: Arc<LibraryContext>,
}

impl ProviderContext {
    /// Allocate a context through the host's allocator capability
    pub(crate) fn new(
        handle: &CoreHandle,
        core: CoreCapabilities,
        config: ProviderConfig,
        core_version: Option<String>,
    ) -> Result<Self, CapabilityError> {
        let storage = HostBlock::zalloc(&core, CONTEXT_STORAGE_BYTES)?;
        let session = NEXT_SESSION.fetch_add(1, Ordering::Relaxed);

        Ok(Self {
            inner: Arc::new(LibraryContext {
                session,
                handle: handle.clone(),
                core,
                config,
                core_version,
                active: AtomicBool::new(false),
                _storage: storage,
            }),
        })
    }

    /// Identifier unique to this negotiation within the process
    pub fn session_id(&self) -> u64 {
        self.inner.session
    }

    /// Whether the provider finished negotiation and has not been torn down
    pub fn is_active(&self) -> bool {
        self.inner.active.load(Ordering::Acquire)
    }

    /// Host version reported by the core during negotiation
    pub fn core_version(&self) -> Option<&str> {
        self.inner.core_version.as_deref()
    }

    pub(crate) fn core(&self) -> &CoreCapabilities {
        &self.inner.core
    }

    pub(crate) fn handle(&self) -> &CoreHandle {
        &self.inner.handle
    }

    pub(crate) fn config(&self) -> &ProviderConfig {
        &self.inner.config
    }

    pub(crate) fn activate(&self) {
        self.inner.active.store(true, Ordering::Release);
    }

    pub(crate) fn deactivate(&self) {
        self.inner.active.store(false, Ordering::Release);
    }

    /// Whether two handles refer to the same context
    pub fn same_context(&self, other: &ProviderContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Clone for ProviderContext {
    /// Another reference to the same context
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl fmt::Debug for ProviderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderContext")
            .field("session", &self.inner.session)
            .field("active", &self.is_active())
            .finish()
    }
}
