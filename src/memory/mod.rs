//! Memory handling for provider state and key material.

mod constant_time;
mod host_block;
mod zeroize;

pub use constant_time::constant_time_eq;
pub use host_block::HostBlock;
pub use zeroize::{Zeroize, secure_zero_memory};
