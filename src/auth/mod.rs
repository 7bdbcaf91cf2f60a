//! Admin authentication
//!
//! Password digests, random password generation and the JWT bearer tokens
//! handed out by `/api/admin/auth/login`.

mod error;
mod jwt;
mod password;

pub use error::{AuthError, AuthResult};
pub use jwt::{bearer_token, Claims, JwtKeys};
pub use password::{generate_password, hash_password, verify_password, GENERATED_PASSWORD_LEN};
