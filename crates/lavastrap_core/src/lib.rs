pub mod http;
pub mod java;
pub mod lavalink;
pub mod layout;
pub mod ports;
pub mod prompt;
pub mod propagate;
pub mod repository;
pub mod secrets;
pub mod settings;
