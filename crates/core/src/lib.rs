//! Core business logic for pollbox.

pub mod services;

pub use services::*;
