pub mod chat;
pub mod errors;
pub mod events;
pub mod extract;
pub mod models;
pub mod products;
