/*!
Memory zeroization.

Used by the host's default cleanse capability and as the provider's local
fallback when the host supplies none.
*/

use std::ptr;
use std::sync::atomic::{Ordering, compiler_fence};

/// Types whose memory can be securely wiped
pub trait Zeroize {
    /// Securely zero this object's memory
    fn zeroize(&mut self);
}

impl Zeroize for [u8] {
    fn zeroize(&mut self) {
        secure_zero_memory(self);
    }
}

impl<const N: usize> Zeroize for [u8; N] {
    fn zeroize(&mut self) {
        secure_zero_memory(self.as_mut_slice());
    }
}

impl Zeroize for Vec<u8> {
    fn zeroize(&mut self) {
        // wipe the spare capacity as well
        let len = self.len();
        self.resize(self.capacity(), 0);
        secure_zero_memory(self.as_mut_slice());
        self.truncate(len);
    }
}

/// Zero memory with volatile writes the optimizer cannot elide
#[inline(never)]
pub fn secure_zero_memory(memory: &mut [u8]) {
    for byte in memory.iter_mut() {
        // SAFETY: `byte` is a valid, exclusive reference into `memory`.
        unsafe {
            ptr::write_volatile(byte, 0);
        }
    }
    compiler_fence(Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zeroize_array() {
        let mut data = [42u8; 64];
        data.zeroize();
        assert!(data.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_zeroize_vec_keeps_length() {
        let mut data = Vec::with_capacity(32);
        data.extend_from_slice(&[0xFFu8; 16]);
        data.zeroize();
        assert_eq!(data.len(), 16);
        assert!(data.iter().all(|b| *b == 0));
    }

    #[test]
    fn test_secure_zero_memory() {
        let mut data = [0xFFu8; 128];
        secure_zero_memory(&mut data);
        assert!(data.iter().all(|b| *b == 0));
    }
}
