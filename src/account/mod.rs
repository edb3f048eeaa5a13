//! Account records
//!
//! An account carries two independent links:
//! - `sponsor`: who referred it (sponsorship graph)
//! - `placement_parent`: where it sits in the bounded fan-out tree
//!
//! Both are written once, at creation, and never re-parented.

mod external_id;

pub use external_id::ExternalIdGenerator;

use std::fmt;

/// Display label used when an account has no sponsor or placement-parent.
pub const COMPANY_LABEL: &str = "Company";

/// Internal account identifier (creation order)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct AccountId(pub u64);

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stable external identifier, e.g. `VGS-SS-JD-4821730915`.
///
/// Doubles as the referral token carried by registration links.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "visualize", derive(serde::Serialize))]
pub struct ExternalId(String);

impl ExternalId {
    /// Wrap an already-issued identifier
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Borrow as `&str`
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ExternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Registration input, before an identity and placement are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAccount {
    /// Login email (unique across the store)
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
}

impl NewAccount {
    /// Convenience constructor
    pub fn new(
        email: impl Into<String>,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            first_name: first_name.into(),
            last_name: last_name.into(),
        }
    }

    /// Upper-cased ASCII initials, `X` standing in for a missing name or a
    /// first letter outside `A-Z`
    pub fn initials(&self) -> String {
        [&self.first_name, &self.last_name]
            .iter()
            .map(|name| match name.trim().chars().next() {
                Some(c) if c.is_ascii_alphabetic() => c.to_ascii_uppercase(),
                _ => 'X',
            })
            .collect()
    }
}

/// Persisted account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    /// Internal id
    pub id: AccountId,
    /// External id / referral token
    pub external_id: ExternalId,
    /// Login email
    pub email: String,
    /// Given name
    pub first_name: String,
    /// Family name
    pub last_name: String,
    /// Administrative root of the tree
    pub is_root: bool,
    /// Referring account
    pub sponsor: Option<AccountId>,
    /// Parent in the bounded fan-out tree
    pub placement_parent: Option<AccountId>,
}

impl Account {
    /// Full display name
    pub fn display_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }

    /// An account is placed once it is a root or has a placement-parent.
    #[inline]
    pub fn is_placed(&self) -> bool {
        self.is_root || self.placement_parent.is_some()
    }

    /// Registration link that carries this account's referral token
    pub fn referral_link(&self, base_url: &str) -> String {
        format!(
            "{}/users/register?ref={}",
            base_url.trim_end_matches('/'),
            self.external_id
        )
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.display_name(), self.external_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn account() -> Account {
        Account {
            id: AccountId(7),
            external_id: ExternalId::new("VGS-SS-JD-1234567890"),
            email: "jane@example.com".into(),
            first_name: "Jane".into(),
            last_name: "Doe".into(),
            is_root: false,
            sponsor: None,
            placement_parent: None,
        }
    }

    #[test]
    fn test_initials_fall_back_to_x() {
        assert_eq!(NewAccount::new("a@b.c", "jane", "doe").initials(), "JD");
        assert_eq!(NewAccount::new("a@b.c", "", "doe").initials(), "XD");
        assert_eq!(NewAccount::new("a@b.c", "  ", "").initials(), "XX");
    }

    #[test]
    fn test_initials_stay_ascii_letters() {
        assert_eq!(NewAccount::new("a@b.c", "élodie", "Ørsted").initials(), "XX");
        assert_eq!(NewAccount::new("a@b.c", "Ümit", "smith").initials(), "XS");
        assert_eq!(NewAccount::new("a@b.c", "9lives", "_x").initials(), "XX");
        assert_eq!(NewAccount::new("a@b.c", "李", "o'neil").initials(), "XO");
    }

    #[test]
    fn test_referral_link_strips_trailing_slash() {
        let link = account().referral_link("https://shop.example/");
        assert_eq!(
            link,
            "https://shop.example/users/register?ref=VGS-SS-JD-1234567890"
        );
    }

    #[test]
    fn test_is_placed() {
        let mut acct = account();
        assert!(!acct.is_placed());
        acct.placement_parent = Some(AccountId(1));
        assert!(acct.is_placed());
        acct.placement_parent = None;
        acct.is_root = true;
        assert!(acct.is_placed());
    }
}
