//! Shared types for the photoforge services
//!
//! Holds the error taxonomy and service configuration used by the server
//! crate. Geometry lives in `pf-mesh`.

pub mod config;
pub mod error;

pub use config::ServiceConfig;
pub use error::{Error, Result};
