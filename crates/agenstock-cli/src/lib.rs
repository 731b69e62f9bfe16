//! AgenStock CLI Library
//!
//! Terminal chat client for the AgenStock research assistant.
//! Provides both TUI (ratatui) and headless modes.

pub mod api;
pub mod app;
pub mod auth_cmd;
pub mod config;
pub mod headless;
pub mod session;
pub mod session_cmd;
#[cfg(test)]
mod test_support;
pub mod transport;
pub mod tui;
pub mod ui;
