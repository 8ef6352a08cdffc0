pub mod campaign;
pub mod config;
pub mod display;
pub mod error;
pub mod event;
pub mod lead;
pub mod popup;
pub mod rotation;
pub mod site;
pub mod subscriber;
pub mod triggers;
pub mod user;
