//! Job configuration
//!
//! Two phases, never interleaved:
//! - `raw`: read the job file into an untyped tree of string leaves
//! - `sanitize`: coerce every leaf by key role, prune nulls, freeze into
//!   a [`SanitizedConfig`]
//!
//! Consumers only ever read the frozen [`SanitizedConfig`].
//!
//! # Examples
//!
//! ```rust,ignore
//! use preproc_job::config::{sanitize, RawConfig};
//!
//! let raw = RawConfig::load(Path::new("job.ini"))?;
//! let path = raw.path.clone();
//! let options = sanitize(&path, raw.into_options())?;
//! let tr = options.root().f64("TR")?;
//! ```

pub mod expr;
pub mod keys;
pub mod raw;
pub mod sanitize;
pub mod sanitized;
pub mod value;

// Re-exports
pub use expr::{ExprError, Number};
pub use raw::{JobFormat, RawConfig, RawValue, Section};
pub use sanitize::{prune_nulls, sanitize, Sanitizer};
pub use sanitized::{SanitizedConfig, Scope};
pub use value::ConfigValue;
