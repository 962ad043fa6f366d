pub mod auth;
pub mod calendars;
pub mod delete;
pub mod extract;
pub mod formatted;
pub mod generate;
pub mod plan;
pub mod prompt;
