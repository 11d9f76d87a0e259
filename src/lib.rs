pub mod app;
pub mod assets;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod executor;
pub mod normalize;
pub mod output;
pub mod queries;
pub mod sparql;
pub mod synonyms;
pub mod table;
pub mod visualize;
