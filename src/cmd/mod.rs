pub mod config;
pub mod derive;
pub mod ticket;
