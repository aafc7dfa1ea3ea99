pub mod command;
pub mod database;
pub mod entry;
pub mod map;
pub mod settings;
pub mod system;
