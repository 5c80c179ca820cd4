//! Domain models

pub mod execution;
pub mod project;
pub mod session;
