/*!
Constants for the provider protocol.

Parameter names, property strings, error codes and known-answer vectors
shared by the host and provider sides.
*/

/// Crate version, reported as the provider's version parameter
pub const VERSION_STR: &str = env!("CARGO_PKG_VERSION");

/// Display name reported by the provider
pub const PROVIDER_NAME: &str = "Rust FIPS Provider";

/// Build information reported by the provider
pub const BUILD_INFO: &str = concat!("crypto-provider ", env!("CARGO_PKG_VERSION"));

/// Name the built-in provider is registered under in the host store
pub const BUILTIN_PROVIDER: &str = "fips";

/// Property definition carried by every algorithm of the built-in provider
pub const FIPS_PROPERTIES: &str = "provider=fips,fips=yes";

/// Bytes of host memory backing one provider context
pub const CONTEXT_STORAGE_BYTES: usize = 64;

/// Parameter names
pub mod params {
    /// Provider display name
    pub const NAME: &str = "name";

    /// Provider version string
    pub const VERSION: &str = "version";

    /// Provider build information
    pub const BUILDINFO: &str = "buildinfo";

    /// 1 while the provider is active
    pub const STATUS: &str = "status";

    /// Host version, answered by the core
    pub const CORE_VERSION: &str = "core-version";

    /// Name the core loaded the provider under
    pub const CORE_PROV_NAME: &str = "provider-name";

    /// Digest used by a MAC context
    pub const MAC_DIGEST: &str = "digest";

    /// Property query used when fetching the MAC's digest
    pub const MAC_PROPERTIES: &str = "properties";
}

/// Error codes the provider reports through the host's error capability
pub mod errors {
    /// Library code for provider-originated errors
    pub const LIB_PROVIDER: u32 = 57;

    /// The known-answer self-check failed
    pub const REASON_SELF_CHECK_FAILURE: u32 = 1;

    /// An algorithm needed by the self-check was unavailable
    pub const REASON_ALGORITHM_UNAVAILABLE: u32 = 2;
}

/// Known-answer vectors
pub mod kat {
    /// Message hashed by the default self-check
    pub const SHA256_MESSAGE: &[u8] = b"Hello World!";

    /// SHA-256 of [`SHA256_MESSAGE`]
    pub const SHA256_DIGEST: [u8; 32] = [
        0x7f, 0x83, 0xb1, 0x65, 0x7f, 0xf1, 0xfc, 0x53, 0xb9, 0x2d, 0xc1, 0x81,
        0x48, 0xa1, 0xd6, 0x5d, 0xfc, 0x2d, 0x4b, 0x1f, 0xa3, 0xd6, 0x77, 0x28,
        0x4a, 0xdd, 0xd2, 0x00, 0x12, 0x6d, 0x90, 0x69,
    ];
}
