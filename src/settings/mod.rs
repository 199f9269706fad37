//! Framework settings.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks, all errors at once)
//!     → assemble.rs (engine → selector → manager → service)
//!     → Assembly { service, reload interval }
//! ```
//!
//! # Design Decisions
//! - All fields have defaults to allow minimal settings files
//! - Validation separates syntactic (serde) from semantic checks
//! - Placeholders in paths are expanded once, at assembly

pub mod assemble;
pub mod loader;
pub mod schema;
pub mod validation;

pub use assemble::{assemble, Assembly};
pub use loader::{load_settings, parse_settings};
pub use schema::{DefaultsSettings, LivecfgSettings, LocationKind, LocationSettings, NamingSettings};
pub use validation::{validate_settings, ValidationError};
