//! Authentication Module
//!
//! Validates the interface-name identity and shared secret a client presents
//! during the username/password sub-negotiation.

pub mod identity;
pub mod manager;

pub use identity::{IdentityProvider, StaticIdentities, SystemInterfaces};
pub use manager::{authenticate, Authenticator};
