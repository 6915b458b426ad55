//! Measures which capitalization variant of a keyword dominates in live web
//! content: search, fetch, normalize, count, report.

pub mod agent;
pub mod aggregate;
pub mod api_types;
pub mod config;
pub mod fetch;
pub mod html;
pub mod keywords;
pub mod matcher;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod persist;
pub mod processed;
pub mod prompts;
pub mod retry;
pub mod search;
pub mod table;
