use crate::cli::run;

pub mod cli;
mod config;
pub mod contract;
pub mod domain;
pub mod http;
pub mod registry;

fn main() {
    run();
}
