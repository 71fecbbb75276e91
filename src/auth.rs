//! Auth-domain values: client identity, scopes, grant types, token requests, and issued tokens.

pub mod client;
pub mod grant;
pub mod id;
pub mod request;
pub mod scope;
pub mod token;

pub use client::*;
pub use grant::*;
pub use id::*;
pub use request::*;
pub use scope::*;
pub use token::{access::*, secret::*};
