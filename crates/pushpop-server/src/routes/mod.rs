pub mod embed;
pub mod events;
pub mod health;
pub mod leads;
pub mod notifications;
pub mod popups;
pub mod register;
pub mod sites;
pub mod subscribers;
pub mod wizard;
