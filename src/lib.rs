pub mod analyzers;
pub mod cip;
pub mod config;
pub mod merge;
pub mod output;
pub mod parser;
pub mod table;
