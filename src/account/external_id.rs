//! External id issuance
//!
//! Format: `<company>-<product>-<initials>-<10 digits>`, e.g. `VGS-SS-JD-4821730915`.
//! The digits are derived from `blake3(email || attempt)`; on collision the
//! attempt counter is bumped and the id re-derived.

use super::{ExternalId, NewAccount};

const DIGITS_MIN: u64 = 1_000_000_000;
const DIGITS_SPAN: u64 = 9_000_000_000;

/// Issues unique external ids
#[derive(Debug, Clone)]
pub struct ExternalIdGenerator {
    company_code: String,
    product_code: String,
    max_attempts: u32,
}

impl ExternalIdGenerator {
    /// Create a generator for the given prefix codes
    pub fn new(company_code: impl Into<String>, product_code: impl Into<String>) -> Self {
        Self {
            company_code: company_code.into(),
            product_code: product_code.into(),
            max_attempts: 1024,
        }
    }

    /// Derive the candidate id for a given attempt
    pub fn candidate(&self, account: &NewAccount, attempt: u32) -> ExternalId {
        let mut hasher = blake3::Hasher::new();
        hasher.update(account.email.trim().to_ascii_lowercase().as_bytes());
        hasher.update(&attempt.to_le_bytes());
        let digest = hasher.finalize();

        let mut head = [0u8; 8];
        head.copy_from_slice(&digest.as_bytes()[..8]);
        let digits = DIGITS_MIN + u64::from_le_bytes(head) % DIGITS_SPAN;

        ExternalId::new(format!(
            "{}-{}-{}-{}",
            self.company_code,
            self.product_code,
            account.initials(),
            digits
        ))
    }

    /// Issue the first candidate for which `taken` returns false.
    ///
    /// Returns `None` once `max_attempts` candidates all collided.
    pub fn issue<F>(&self, account: &NewAccount, mut taken: F) -> Option<ExternalId>
    where
        F: FnMut(&ExternalId) -> bool,
    {
        (0..self.max_attempts)
            .map(|attempt| self.candidate(account, attempt))
            .find(|candidate| !taken(candidate))
    }
}
