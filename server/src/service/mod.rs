//! Application services

pub mod execution;
pub mod quiz;
pub mod registry;
pub mod session;
pub mod tutor;
