//! Utility Functions
//!
//! User-facing error formatting for fatal errors:
//!
//! ```rust,no_run
//! use strokewarden::utils::format_user_error;
//!
//! # fn operation() -> anyhow::Result<()> { Ok(()) }
//! if let Err(e) = operation() {
//!     eprintln!("{}", format_user_error(&e));
//! }
//! ```

pub mod errors;

pub use errors::format_user_error;
