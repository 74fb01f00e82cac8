/*
 * Responsibility
 * - Module tree (the binary only calls app::run())
 */
pub mod api;
pub mod app;
pub mod config;
pub mod error;
pub mod middleware;
pub mod services;
pub mod state;
