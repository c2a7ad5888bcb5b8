/*!
# Crypto Provider

A provider-negotiation protocol: the handshake and indirection layer that
lets a host cryptographic core and an independently built provider module
exchange typed function tables and call each other through them.

## Overview

- Function tables: terminated lists of `(capability id, function)` entries,
  scanned by the consumer into a typed registry. Unknown ids are skipped.
- Negotiation: the provider's entry point captures the host's table,
  creates one context, runs a known-answer self-check and only then returns
  its own table.
- Parameters: static descriptor lists and typed slot filling, where a type
  mismatch fails the whole request.
- Algorithm query: each operation category maps to a terminated list of
  descriptors carrying names, property definitions and per-algorithm tables.
- Internal re-entry: composite algorithms (HMAC) reach the provider's own
  digests through a restricted entry point that reuses the existing context.

## Example

```rust
use crypto_provider::{Core, params};

let provider = Core::new().load("fips")?;

let mut request = [params::ParamRequest::utf8_ptr("name")];
provider.get_params(&mut request)?;
assert!(request[0].is_filled());

let sha256 = provider.fetch_digest("SHA256", "fips=yes")?;
assert_eq!(sha256.digest(b"abc")?.len(), 32);

provider.teardown();
# Ok::<(), crypto_provider::Error>(())
```
*/

// Errors shared by both sides
pub mod error;

// Protocol constants and parameter names
pub mod constants;

// Function table exchange and capability ids
pub mod dispatch;

// Parameter protocol
pub mod params;

// Property queries
pub mod property;

// Provider configuration
pub mod config;

// Memory obtained from the host and zeroization
pub mod memory;

// Algorithm registry and fetched methods
pub mod algorithms;

// Provider entry points and context
pub mod provider;

// Host core, provider store and error queue
pub mod host;

// Re-export commonly used types for convenience
pub use error::{Error, NegotiationError, Result};
pub use config::{KnownAnswerTest, ProviderConfig, SelfCheck};
pub use dispatch::{CoreCapabilities, CoreDispatch, CoreHandle, FunctionTable, ProviderDispatch, ProviderFunctions};
pub use algorithms::{AlgorithmDescriptor, DigestMethod, MacMethod, OperationId, QueryResult};
pub use provider::{Negotiated, ProviderContext, ProviderInitFn, provider_init, provider_init_with_config};
pub use host::{Core, LoadedProvider};
pub use params::{ParamDescriptor, ParamRequest, ParamResolution, ParamType, ParamValue};
pub use constants::{VERSION_STR as VERSION, PROVIDER_NAME};
