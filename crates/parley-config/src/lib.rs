//! Parley configuration system.
//!
//! TOML-based configuration for endpoints, the system instruction,
//! generation parameters, and autosave/retry tuning. Every section has
//! defaults so partial or older configs load, and every mutation goes
//! through [`ConfigStore`], which validates before it persists.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use parley_config::{ConfigStore, Parameter};
//!
//! let store = ConfigStore::open_default().expect("failed to load config");
//! store.update_parameter(Parameter::Temperature, 0.4).expect("in range");
//! println!("{}", store.current_endpoint());
//! ```

pub mod schema;
pub mod store;
pub mod toml_loader;
pub mod toml_writer;
pub mod validation;

// Re-export core types for convenience
pub use schema::{AutosaveSettings, ChatConfig, RetrySettings};
pub use store::ConfigStore;
pub use toml_writer::save_config_to_path;
pub use validation::{apply_parameter, Parameter};
