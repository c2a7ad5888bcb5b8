/*!
Memory owned by the provider but allocated by the host.
*/

use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

use crate::dispatch::CoreCapabilities;
use crate::dispatch::ids::CoreCapability;
use crate::error::CapabilityError;
use crate::memory::secure_zero_memory;

/// A zeroed block obtained through the host's allocator capabilities.
///
/// The block is cleared and handed back to the host when dropped. If the
/// host supplied no matching free capability it is wiped locally instead.
pub struct HostBlock {
    data: Vec<u8>,
    secure: bool,
    core: CoreCapabilities,
}

impl HostBlock {
    /// Allocate from the host's regular heap
    pub fn zalloc(core: &CoreCapabilities, size: usize) -> Result<Self, CapabilityError> {
        let data = core.zalloc(size)?;
        Ok(Self {
            data,
            secure: false,
            core: *core,
        })
    }

    /// Allocate from the host's secure heap when one is initialized,
    /// otherwise from the regular heap
    pub fn secure_zalloc(core: &CoreCapabilities, size: usize) -> Result<Self, CapabilityError> {
        if core.secure_malloc_initialized().unwrap_or(false) {
            let data = core.secure_zalloc(size)?;
            Ok(Self {
                data,
                secure: true,
                core: *core,
            })
        } else {
            Self::zalloc(core, size)
        }
    }

    /// Whether the block came from the secure heap
    pub fn is_secure(&self) -> bool {
        self.secure
    }

    /// Allocate a new block of the same kind and copy the contents
    pub fn try_clone(&self) -> Result<Self, CapabilityError> {
        let mut copy = if self.secure {
            Self::secure_zalloc(&self.core, self.data.len())?
        } else {
            Self::zalloc(&self.core, self.data.len())?
        };
        copy.data.copy_from_slice(&self.data);
        Ok(copy)
    }
}

impl Deref for HostBlock {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}

impl DerefMut for HostBlock {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.data
    }
}

impl Drop for HostBlock {
    fn drop(&mut self) {
        let mut data = mem::take(&mut self.data);
        let capability = if self.secure {
            CoreCapability::SecureClearFree
        } else {
            CoreCapability::ClearFree
        };

        if !self.core.has(capability) {
            secure_zero_memory(&mut data);
            return;
        }

        let _ = if self.secure {
            self.core.secure_clear_free(data)
        } else {
            self.core.clear_free(data)
        };
    }
}

impl fmt::Debug for HostBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HostBlock")
            .field("len", &self.data.len())
            .field("secure", &self.secure)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{CoreDispatch, FunctionTable};
    use std::cell::Cell;

    thread_local! {
        static FREED: Cell<usize> = const { Cell::new(0) };
    }

    fn zalloc(size: usize) -> Option<Vec<u8>> {
        Some(vec![0; size])
    }

    fn clear_free(_block: Vec<u8>) {
        FREED.with(|f| f.set(f.get() + 1));
    }

    fn core() -> CoreCapabilities {
        static TABLE: [CoreDispatch; 3] = [
            CoreDispatch::Zalloc(zalloc),
            CoreDispatch::ClearFree(clear_free),
            CoreDispatch::End,
        ];
        CoreCapabilities::capture(FunctionTable::new(&TABLE)).0
    }

    #[test]
    fn test_block_returned_to_host() {
        let before = FREED.with(Cell::get);
        {
            let mut block = HostBlock::zalloc(&core(), 32).unwrap();
            assert_eq!(block.len(), 32);
            assert!(block.iter().all(|b| *b == 0));
            block[0] = 7;
        }
        assert_eq!(FREED.with(Cell::get), before + 1);
    }

    #[test]
    fn test_secure_falls_back_to_regular_heap() {
        let block = HostBlock::secure_zalloc(&core(), 16).unwrap();
        assert!(!block.is_secure());
    }

    #[test]
    fn test_try_clone_copies_contents() {
        let mut block = HostBlock::zalloc(&core(), 4).unwrap();
        block.copy_from_slice(&[1, 2, 3, 4]);
        let copy = block.try_clone().unwrap();
        assert_eq!(&copy[..], &[1, 2, 3, 4]);
    }
}
