//! Task-management backend: signup/login with bearer tokens and
//! owner-scoped task CRUD, plus the cookie-holding gateway used by the web client.

pub mod app;
pub mod auth;
pub mod config;
pub mod error;
pub mod gateway;
pub mod response;
pub mod state;
pub mod tasks;
