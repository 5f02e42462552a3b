use std::process::ExitCode;

use clap::Parser;
use cli::BackhaulCli;
use config::{ClientConfig, ConfigError};
use thiserror::Error;
use tracing::{error, info};
use tunneling::{SessionError, driver::SessionDriver, http_engine::HttpTunnelEngine};

mod cli;
mod config;
mod token;
mod tunneling;
mod upstream;

#[derive(Error, Debug)]
enum ClientError {
    #[error("{0}")]
    Config(ConfigError),
    #[error("{0}")]
    Session(SessionError),
}

impl From<ConfigError> for ClientError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}
impl From<SessionError> for ClientError {
    fn from(value: SessionError) -> Self {
        Self::Session(value)
    }
}

async fn run(cli: BackhaulCli) -> Result<(), ClientError> {
    let config = ClientConfig::load(cli)?;
    let session = config.session()?;
    info!("starting backhaul - version {}", env!("CARGO_PKG_VERSION"));
    let driver = SessionDriver::new(HttpTunnelEngine::new(), session, config.print_token);
    Err(driver.run().await.into())
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt::init();
    if let Err(err) = run(BackhaulCli::parse()).await {
        error!("{err}");
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}
