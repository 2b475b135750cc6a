//! Web service tracking requirements for school, program, and scholarship
//! applications.

pub mod config;
pub mod error;
pub mod requirements;
pub mod telemetry;
