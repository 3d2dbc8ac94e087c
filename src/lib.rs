pub mod app;
pub mod cli;
pub mod config;
pub mod controller;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod models;
pub mod notify;
pub mod output;
pub mod page;
pub mod render;
pub mod state;
pub mod templates;

#[cfg(test)]
mod testing;
