mod client;
pub mod endpoint;
mod error;
mod rate_limit;

pub use client::{Credential, TwitterClient};
pub use error::TwitterError;
