pub mod app;
pub mod auth;
pub mod bridge;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod push;
