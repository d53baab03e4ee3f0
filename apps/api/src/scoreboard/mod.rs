// Legacy scoreboard import: members' weekly commitments and call attendance
// exported from the spreadsheet era.

pub mod handlers;
pub mod import;
pub mod parse;
