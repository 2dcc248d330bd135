pub mod auth;
pub mod events;
pub mod orders;
pub mod products;
pub mod users;
