//! Common utilities and shared types for agora.
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error taxonomy via [`AppError`] and [`AppResult`]
//! - **ID Generation**: ULID-based identifiers via [`IdGenerator`]
//!
//! # Example
//!
//! ```no_run
//! use agora_common::{Config, IdGenerator, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id = IdGenerator::new().generate();
//!     println!("{} -> {id}", config.server.host);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
