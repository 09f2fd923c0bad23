pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod errors;
pub mod listing;
pub mod manifest;
pub mod session;
