//! Session refresh module
//!
//! When a request fails with 401 the client refreshes the session once and
//! replays the request. `RefreshCoordinator` makes sure concurrent failures
//! share a single refresh call.

mod coordinator;
mod types;

pub use coordinator::{RefreshCoordinator, RefreshLease, RefreshTicket, RefreshWaiter};
pub use types::{AuthEndpoints, RefreshOutcome, DEFAULT_LOGIN_PATH, DEFAULT_REFRESH_PATH};

#[cfg(test)]
mod tests;
