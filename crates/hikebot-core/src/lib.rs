pub mod config_manager;
pub mod error;
pub mod security;
pub mod types;

pub use config_manager::*;
pub use error::*;
pub use security::{
    hash_password, is_valid_user_code, verify_password, Claims, JwtManager, SecurityError,
    SecurityEvent, SecurityLogger,
};
pub use types::*;
