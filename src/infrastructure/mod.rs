pub mod embeddings;
pub mod feeds;
pub mod llm;
pub mod sqlite;
