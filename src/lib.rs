//! JARVIS Omega account backend: accounts, trial-to-paid entitlements,
//! device quotas, Stripe billing, plugin downloads, and the support chat.

pub mod catalog;
pub mod chat;
pub mod config;
pub mod db;
pub mod email;
pub mod entitlements;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod jwt;
pub mod middleware;
pub mod models;
pub mod password;
pub mod payments;
pub mod util;
