pub mod events;
pub mod id;
pub mod message;
pub mod models;
