// Weekly commitments: creation, completion, and per-week listing.

pub mod handlers;
pub mod store;
pub mod week;
