pub mod config;
pub mod download;
pub mod imap;
pub mod mime;
pub mod models;
pub mod prompt;
pub mod save;
pub mod search;
