//! Utility functions
//!
//! Error formatting for the command-line front end.

pub mod errors;

pub use errors::format_user_error;
