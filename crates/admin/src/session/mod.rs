//! Operator sessions: the two-cookie auth scheme and the signed flash
//! cookie carried across redirects.

pub mod flash;
pub mod middleware;

pub use flash::{FlashKind, FlashMessage};
pub use middleware::{require_operator, OperatorToken, ACCESS_COOKIE, REFRESH_COOKIE};
