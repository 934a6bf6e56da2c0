pub mod client;
pub mod config;
pub mod network;
pub mod rest_api;

pub use client::VotingClient;
pub use network::LedgerConnection;
