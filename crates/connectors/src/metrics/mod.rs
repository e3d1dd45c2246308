pub mod client;
pub mod fixture;
pub mod provider;
