pub mod cli;
pub mod config;
pub mod extract;
pub mod fetch;
pub mod normalize;
pub mod output;
pub mod pipeline;
