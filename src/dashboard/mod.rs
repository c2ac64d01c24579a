//! HTTP JSON API for the dashboard UI.
//!
//! An axum server exposing today's tasks, the completion toggle, history
//! views and admin-gated template management.

pub mod server;

pub use server::{DashboardServer, build_router, start_server};
