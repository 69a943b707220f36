pub mod app;
pub mod auth;
pub mod backend;
pub mod config;
pub mod event;
pub mod logging;
pub mod review;
pub mod session;
pub mod store;
pub mod ui;
