pub mod config;
pub mod error;
pub mod image_processing;
pub mod mcp_server;
pub mod openai;
pub mod options;
pub mod pricing;
pub mod report;
pub mod storage;
pub mod tools;
