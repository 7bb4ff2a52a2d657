pub mod ai;
pub mod chunker;
pub mod config;
pub mod entities;
pub mod links;
pub mod remote;
pub mod repositories;
pub mod rewriter;
pub mod sanitizer;
pub mod stop;
