//! Authentication adapters implementing the `SessionValidator` port.

mod jwt;
mod mock;

pub use jwt::JwtSessionValidator;
pub use mock::MockSessionValidator;
