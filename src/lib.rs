//! EC2 policy dashboard library
//!
//! # Module Structure
//! - `config`: CLI/environment configuration
//! - `ec2`: per-session EC2 client and instance document lowering
//! - `health`: standalone liveness/readiness probe server
//! - `logging`: tracing subscriber setup
//! - `policy`: OPA policy evaluation client
//! - `server`: axum HTTP server, handlers and view models
//! - `session`: per-session AWS credential context

pub mod config;
pub mod ec2;
pub mod health;
pub mod logging;
pub mod policy;
pub mod server;
pub mod session;
