pub mod api;
pub mod config;
pub mod database;
pub mod dataset;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod ficha;
pub mod generator;
pub mod llm;
pub mod prompt;
pub mod rag;
pub mod text;
pub mod word;
