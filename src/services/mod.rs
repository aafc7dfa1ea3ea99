pub mod config;
pub mod corpus;
pub mod encoding;
pub mod extract;
pub mod notes;
pub mod patch;
pub mod pipeline;
pub mod plugins;
pub mod provider;
pub mod qa;
pub mod registry;
pub mod report;
pub mod translation_memory;
