pub mod client;
pub mod config;

pub use client::SheetsClient;
pub use config::SheetsConfig;
