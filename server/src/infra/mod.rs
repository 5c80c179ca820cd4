//! External collaborators

pub mod gemini;
