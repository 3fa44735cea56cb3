pub mod schema;

pub use schema::{Config, ProviderConfig, builtin_providers};
