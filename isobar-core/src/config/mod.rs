//! Node configuration
//!
//! Board-agnostic configuration structures and the TOML subset parser used
//! to read the configuration embedded in the firmware image.

pub mod parse;
pub mod types;

pub use parse::{parse_config, ParseError};
pub use types::*;
