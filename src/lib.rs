//! Library exports for sessiongate, shared between the binary and tests.

pub mod config;
pub mod gate;
pub mod metrics;
pub mod proxy;
pub mod routes;
pub mod startup;
pub mod state;
pub mod utils;
pub mod verifier;
