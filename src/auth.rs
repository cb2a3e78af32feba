//! Auth-domain values: redirect codes, identifiers, scope sets, and token models.

pub mod code;
pub mod id;
pub mod scope;
pub mod token;

pub use code::*;
pub use id::*;
pub use scope::*;
pub use token::*;
