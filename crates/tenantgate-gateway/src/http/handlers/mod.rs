//! HTTP request handlers.

mod bootstrap;
mod health;

pub use bootstrap::{auth, join};
pub use health::health_check;
