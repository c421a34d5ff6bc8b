use crate::cli::run;

mod catalog;
pub mod cli;
mod config;
pub mod domain;
mod engine;
pub mod http;
mod session;
pub mod storage;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    run()
}
