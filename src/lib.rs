pub mod classify;
pub mod cli;
pub mod commands;
pub mod utils;
