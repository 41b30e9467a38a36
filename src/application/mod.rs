pub mod api;
pub mod decision;
pub mod embedding;
pub mod monitor;
pub mod patterns;
pub mod record;
pub mod scheduler;
