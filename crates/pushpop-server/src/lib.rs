pub mod app;
pub mod auth;
pub mod error;
pub mod push;
pub mod routes;
pub mod state;
pub mod verify;
