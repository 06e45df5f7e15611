pub mod agent;
pub mod configuration;
pub mod conversation;
pub mod errors;
pub mod prompt;
pub mod providers;
pub mod tools;
