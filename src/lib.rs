pub mod app;
pub mod cli;
pub mod client;
pub mod config;
pub mod context;
pub mod filter;
pub mod model;
pub mod pagination;
pub mod render;
pub mod store;
pub mod view;

#[cfg(test)]
mod tests;
