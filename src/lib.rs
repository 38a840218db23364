pub mod app;
pub mod auth;
pub mod config;
pub mod cors;
pub mod error;
pub mod health;
pub mod mail;
pub mod middleware;
pub mod rpc;
pub mod state;
