pub mod config;
pub mod draft;
pub mod editor;
pub mod environment;
pub mod persistence;
pub mod shared;
pub mod vault;
