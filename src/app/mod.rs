pub mod crawl;
pub mod data_io;
pub mod detect;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod frontier;
pub mod migrate;
pub mod progress;
pub mod report;
pub mod runtime;
pub mod server;
pub mod types;
