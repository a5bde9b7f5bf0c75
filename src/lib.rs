pub mod catalog;
pub mod chain;
pub mod config;
pub mod error;
pub mod notifications;
pub mod renewals;
pub mod retry;
pub mod routes;
pub mod store;
