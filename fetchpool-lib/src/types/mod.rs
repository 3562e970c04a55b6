#![allow(unreachable_pub)]

mod basic_auth;
mod error;
mod hooks;
mod request;
mod response;

pub use basic_auth::{BasicAuthCredentials, BasicAuthCredentialsParseError};
pub use error::ErrorKind;
pub use hooks::{ErrorHook, Hook, Hooks, ResponseHook};
pub use request::{Key, Request, RequestBuilder};
pub use response::{Fetched, Response};

/// The fetchpool `Result` type
pub type Result<T> = std::result::Result<T, crate::ErrorKind>;
