pub mod cache;
pub mod error;
pub mod output;
pub mod parser;
pub mod pipeline;
pub mod report;
