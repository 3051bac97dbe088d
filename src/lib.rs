pub mod api_router;
pub mod collections;
pub mod compiler;
pub mod config;
pub mod directory;
pub mod file;
pub mod learn;
pub mod llm;
pub mod progress;
pub mod shared;
pub mod store;
pub mod tutor;
