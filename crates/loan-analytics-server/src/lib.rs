//! Loan Analytics front end: CLI, REPL, dashboard views and the HTTP JSON API.

pub mod config;
pub mod render;
pub mod repl;
pub mod transport;
pub mod views;

pub use config::build_executor;
pub use views::{RenderedView, ViewName, ViewRegistry};
