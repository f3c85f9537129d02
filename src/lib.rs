pub mod chart;
pub mod config;
pub mod fetch;
pub mod harness;
pub mod lag;
pub mod model;
pub mod pipeline;
pub mod store;
pub mod table;
