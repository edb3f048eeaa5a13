//! Placement configuration

use crate::account::{AccountId, ExternalIdGenerator};
use thiserror::Error;

/// Maximum number of direct placement-children per node
pub const DEFAULT_FANOUT_LIMIT: usize = 5;

/// Errors raised by [`PlacementConfig::validate`]
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Fan-out limit must allow at least one child
    #[error("fan-out limit must be > 0")]
    ZeroFanout,

    /// Id prefix codes must be non-empty ASCII alphanumerics
    #[error("invalid id prefix code '{0}'")]
    InvalidPrefix(String),
}

/// Configuration parameters for the placement registry
#[derive(Debug, Clone)]
pub struct PlacementConfig {
    /// Direct children allowed per placement node
    pub fanout_limit: usize,

    /// Explicitly configured root account (fallback: first root-flagged account)
    pub root: Option<AccountId>,

    /// Company segment of external ids
    pub company_code: String,

    /// Product segment of external ids
    pub product_code: String,

    /// Base URL for referral links
    pub referral_base_url: String,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            fanout_limit: DEFAULT_FANOUT_LIMIT,
            root: None,
            company_code: "VGS".to_string(),
            product_code: "SS".to_string(),
            referral_base_url: "http://localhost:8000".to_string(),
        }
    }
}

impl PlacementConfig {
    /// Set fan-out limit
    pub fn with_fanout_limit(mut self, fanout_limit: usize) -> Self {
        self.fanout_limit = fanout_limit;
        self
    }

    /// Inject the root account
    pub fn with_root(mut self, root: AccountId) -> Self {
        self.root = Some(root);
        self
    }

    /// Set external id prefix codes
    pub fn with_id_prefix(
        mut self,
        company_code: impl Into<String>,
        product_code: impl Into<String>,
    ) -> Self {
        self.company_code = company_code.into();
        self.product_code = product_code.into();
        self
    }

    /// Set referral link base URL
    pub fn with_referral_base_url(mut self, url: impl Into<String>) -> Self {
        self.referral_base_url = url.into();
        self
    }

    /// Check invariants
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fanout_limit == 0 {
            return Err(ConfigError::ZeroFanout);
        }
        for code in [&self.company_code, &self.product_code] {
            if code.is_empty() || !code.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(ConfigError::InvalidPrefix(code.clone()));
            }
        }
        Ok(())
    }

    /// Id generator for the configured prefix
    pub fn id_generator(&self) -> ExternalIdGenerator {
        ExternalIdGenerator::new(self.company_code.clone(), self.product_code.clone())
    }
}
