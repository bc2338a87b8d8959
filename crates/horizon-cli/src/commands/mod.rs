pub mod chat;
pub mod project;
pub mod utils;
