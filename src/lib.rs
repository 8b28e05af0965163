pub mod app;
pub mod auction;
pub mod bidding;
pub mod catalog;
pub mod chat;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod scheduler;
pub mod session;
pub mod store;
