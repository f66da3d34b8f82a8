//! Client used by the superadmin console: a local copy of the transaction
//! list and the payout submission flow on top of the REST API.

pub mod api;
pub mod store;
pub mod submission;

pub use api::*;
pub use store::*;
pub use submission::*;
