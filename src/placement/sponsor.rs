use tracing::{debug, warn};

use crate::account::AccountId;
use crate::store::AccountStore;
use crate::PlacementError;

/// Maps a referral token to the sponsoring account.
///
/// Absent or blank tokens fall back to the root: the injected one when
/// configured, otherwise the earliest account flagged as root. A token that
/// matches nothing is a validation failure, not a fallback.
#[derive(Debug, Clone, Copy, Default)]
pub struct SponsorResolver {
    root: Option<AccountId>,
}

impl SponsorResolver {
    /// Resolver with an optional injected root
    pub fn new(root: Option<AccountId>) -> Self {
        Self { root }
    }

    /// Root used when no referral is given
    pub fn root<S: AccountStore + ?Sized>(&self, store: &S) -> Result<AccountId, PlacementError> {
        match self.root {
            Some(root) if store.get(root).is_some() => Ok(root),
            Some(root) => Err(PlacementError::UnknownAccount(root)),
            None => store
                .first_root()
                .map(|account| account.id)
                .ok_or(PlacementError::NoRootAccount),
        }
    }

    /// Resolve the sponsor for a registration
    pub fn resolve<S: AccountStore + ?Sized>(
        &self,
        store: &S,
        referral_token: Option<&str>,
    ) -> Result<AccountId, PlacementError> {
        let token = referral_token.map(str::trim).filter(|t| !t.is_empty());

        let Some(token) = token else {
            let root = self.root(store)?;
            debug!(%root, "no referral token, sponsoring under root");
            return Ok(root);
        };

        match store.find_by_external_id(token) {
            Some(sponsor) => {
                debug!(token, sponsor = %sponsor.id, "referral resolved");
                Ok(sponsor.id)
            }
            None => {
                warn!(token, "referral token matches no account");
                Err(PlacementError::InvalidReferral(token.to_string()))
            }
        }
    }
}
