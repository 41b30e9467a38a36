pub mod embedding_port;
pub mod narrative_agent;
pub mod price_feed;
pub mod vector_store;
