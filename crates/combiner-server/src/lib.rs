pub mod api;
pub mod app;
pub mod config;
pub mod grpc;
pub mod logging;
pub mod state;
