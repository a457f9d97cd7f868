pub mod api_types;
pub mod client;
pub mod error;
pub mod fetcher;
pub mod signing;
pub mod types;
