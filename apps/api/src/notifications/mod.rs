// Notification records and the composers that write their copy.

pub mod composer;
pub mod dispatch;
pub mod handlers;
pub mod prompts;
pub mod store;
