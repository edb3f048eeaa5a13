//! Sponsor resolution and bounded fan-out placement
//!
//! Two steps run for every new account:
//! 1. **Sponsor**: referral token → referring account (or the root)
//! 2. **Placement**: breadth-first walk from the sponsor to the first node
//!    with spare capacity
//!
//! Both are read-only; the caller writes the result onto the new account.

mod search;
mod sponsor;

pub use search::find_placement_parent;
pub use sponsor::SponsorResolver;
