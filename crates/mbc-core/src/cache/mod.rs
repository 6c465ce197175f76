//! Short-lived client-side memoization.
//!
//! `ExpiringCache` stores any serializable value together with an absolute
//! expiry timestamp. Reads past that timestamp evict the entry and report a
//! miss; nothing is swept in the background.
//!
//! Used for navigation items, which change rarely but are needed on every
//! page.

pub mod clock;
pub mod expiring;

pub use clock::{Clock, ManualClock, SystemClock};
pub use expiring::{CacheError, ExpiringCache, ExpiringEntry, MAX_TTL_MINUTES};
