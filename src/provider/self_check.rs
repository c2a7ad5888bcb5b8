/*!
Known-answer self-check run before a provider becomes callable.
*/

use tracing::debug;

use super::{ProviderContext, fetch_digest_internal};
use crate::config::SelfCheck;
use crate::error::{NegotiationError, SelfCheckFailure};
use crate::memory::constant_time_eq;

/// Run the configured self-check against the provider's own digests.
///
/// The digest is reached through the internal entry point, the same path
/// composite algorithms use, so a pass also exercises that path.
pub(crate) fn run(context: &ProviderContext) -> Result<(), NegotiationError> {
    let test = match &context.config().self_check {
        SelfCheck::Disabled => {
            debug!(session = context.session_id(), "self-check disabled");
            return Ok(());
        }
        SelfCheck::KnownAnswer(test) => test,
    };

    let failure = |reason| NegotiationError::SelfCheck {
        algorithm: test.algorithm.clone(),
        reason,
    };

    let method = fetch_digest_internal(context, &test.algorithm, &test.properties)
        .map_err(|err| failure(SelfCheckFailure::Unavailable(err)))?;
    let digest = method
        .digest(&test.message)
        .map_err(|err| failure(SelfCheckFailure::Computation(err)))?;

    if !constant_time_eq(&digest, &test.expected) {
        return Err(failure(SelfCheckFailure::Mismatch));
    }

    debug!(
        session = context.session_id(),
        algorithm = method.name(),
        "self-check passed"
    );
    Ok(())
}
