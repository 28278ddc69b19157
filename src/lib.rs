pub mod app;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod middleware;
pub mod pagination;
pub mod storage;
pub mod validation;

pub use app::{router, AppState};
