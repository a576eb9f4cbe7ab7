pub mod chunking;
pub mod config;
pub mod context;
pub mod database;
pub mod document;
pub mod embeddings;
pub mod error;
pub mod gemini;
pub mod ingest;
pub mod llm;
pub mod openai;
pub mod qdrant;
pub mod rag;
pub mod server;
pub mod services;
pub mod supabase;
