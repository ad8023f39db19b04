//! # mqdrop-bridge: directory to queue bridge
//!
//! Long-running service that watches one directory and puts each new file
//! on a message queue with an `IF_COBA` RFH2 header.
//!
//! ## Modes
//!
//! - **Service**: poll until Ctrl-C / SIGTERM (default).
//! - **Once**: run a single cycle and exit (`--once`).
//! - **Check**: validate the configuration and exit (`--check`).

pub mod config;
pub mod logging;
pub mod service;
