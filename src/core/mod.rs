//! Core functionality: documents, the storage codec, web storage, and the filename registry

pub mod codec;
pub mod config;
pub mod controller;
pub mod document;
pub mod error;
pub mod picker;
pub mod registry;
pub mod web_storage;
