// Pods: creation, membership history, call attendance, and health scoring.

pub mod handlers;
pub mod health;
pub mod store;
