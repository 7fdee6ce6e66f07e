pub mod errors;
pub mod id;
pub mod types;

pub use errors::{
    ConfigError, GenerationError, ParleyError, PersistenceError, ValidationError,
};
pub use id::{fallback_title, is_valid_session_id, mint_session_id, sanitize_title};
pub use types::{GenerationParameters, Turn};

pub type Result<T> = std::result::Result<T, ParleyError>;
