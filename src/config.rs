/*!
Provider configuration.

Selects whether the known-answer self-check gates negotiation and whether
algorithm query answers may be cached by the host.
*/

#[cfg(feature = "serde-support")]
use serde::{Deserialize, Serialize};

use crate::constants::kat;
use crate::error::{Result, config_err};

/// A known-answer test run before the provider becomes callable
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct KnownAnswerTest {
    /// Digest algorithm name
    pub algorithm: String,
    /// Property query used to fetch the algorithm
    pub properties: String,
    /// Input message
    pub message: Vec<u8>,
    /// Expected digest
    pub expected: Vec<u8>,
}

impl KnownAnswerTest {
    /// SHA-256 over "Hello World!"
    pub fn sha256() -> Self {
        Self {
            algorithm: "SHA256".into(),
            properties: "fips=yes".into(),
            message: kat::SHA256_MESSAGE.to_vec(),
            expected: kat::SHA256_DIGEST.to_vec(),
        }
    }
}

impl Default for KnownAnswerTest {
    fn default() -> Self {
        Self::sha256()
    }
}

/// Pre-activation gate
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub enum SelfCheck {
    /// Skip the self-check
    Disabled,
    /// Run a known-answer test and refuse to activate on failure
    KnownAnswer(KnownAnswerTest),
}

impl Default for SelfCheck {
    fn default() -> Self {
        SelfCheck::KnownAnswer(KnownAnswerTest::default())
    }
}

/// Configuration for one negotiated provider session
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde-support", derive(Serialize, Deserialize))]
pub struct ProviderConfig {
    /// Self-check run during negotiation
    pub self_check: SelfCheck,
    /// Whether query answers are reported as cacheable
    pub cacheable: bool,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            self_check: SelfCheck::default(),
            cacheable: true,
        }
    }
}

impl ProviderConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration that skips the self-check
    pub fn without_self_check() -> Self {
        Self {
            self_check: SelfCheck::Disabled,
            ..Self::default()
        }
    }

    /// Configuration with a specific known-answer test
    pub fn with_known_answer(test: KnownAnswerTest) -> Self {
        Self {
            self_check: SelfCheck::KnownAnswer(test),
            ..Self::default()
        }
    }

    /// Report query answers as not cacheable, forcing the host to re-query
    pub fn uncached(mut self) -> Self {
        self.cacheable = false;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let SelfCheck::KnownAnswer(test) = &self.self_check {
            if test.algorithm.is_empty() {
                return config_err("known-answer test names no algorithm");
            }
            if test.expected.is_empty() {
                return config_err("known-answer test has no expected value");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ProviderConfig::default();
        assert!(config.cacheable);
        assert_eq!(config.self_check, SelfCheck::KnownAnswer(KnownAnswerTest::sha256()));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_named_constructors() {
        assert_eq!(ProviderConfig::without_self_check().self_check, SelfCheck::Disabled);
        assert!(!ProviderConfig::new().uncached().cacheable);
    }

    #[test]
    fn test_validate_rejects_empty_test() {
        let mut test = KnownAnswerTest::sha256();
        test.algorithm.clear();
        assert!(ProviderConfig::with_known_answer(test).validate().is_err());

        let mut test = KnownAnswerTest::sha256();
        test.expected.clear();
        assert!(ProviderConfig::with_known_answer(test).validate().is_err());
    }
}
