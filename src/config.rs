use serde::Deserialize;
use thiserror::Error;

use crate::{cli::BackhaulCli, token, upstream::RouteTable};

pub(crate) const DEFAULT_REMOTE: &str = "127.0.0.1:8000";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("upstream is missing in the client configuration")]
    MissingUpstream,
    #[error("unable to load token file {1}: {0}")]
    TokenFile(std::io::Error, String),
    #[error("unable to read config file {1}: {0}")]
    ConfigFile(std::io::Error, String),
    #[error("invalid config file: {0}")]
    InvalidConfig(toml::de::Error),
}

/// Optional on-disk counterpart of the CLI flags. Every field is optional so
/// that a config file only pins the values it actually sets.
#[derive(Deserialize, Debug, Default, PartialEq)]
pub(crate) struct FileConfig {
    pub remote: Option<String>,
    pub upstream: Option<String>,
    pub token: Option<String>,
    pub token_from: Option<String>,
    pub print_token: Option<bool>,
    pub strict_forwarding: Option<bool>,
}

/// Fully merged client configuration: flag beats file, file beats default.
#[derive(Debug, PartialEq)]
pub(crate) struct ClientConfig {
    pub remote: String,
    pub upstream: String,
    pub token: String,
    pub token_from: String,
    pub print_token: bool,
    pub strict_forwarding: bool,
}

/// What the tunnel engine sees: built once per invocation, never mutated.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SessionConfig {
    pub remote: String,
    pub routes: RouteTable,
    pub token: String,
    pub strict_forwarding: bool,
}

impl ClientConfig {
    pub fn load(cli: BackhaulCli) -> Result<Self, ConfigError> {
        let file = match &cli.config {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .map_err(|err| ConfigError::ConfigFile(err, path.clone()))?;
                toml::from_str(&raw).map_err(ConfigError::InvalidConfig)?
            }
            None => FileConfig::default(),
        };
        Ok(Self::merge(cli, file))
    }

    fn merge(cli: BackhaulCli, file: FileConfig) -> Self {
        ClientConfig {
            remote: cli
                .remote
                .or(file.remote)
                .unwrap_or_else(|| DEFAULT_REMOTE.to_string()),
            upstream: cli.upstream.or(file.upstream).unwrap_or_default(),
            token: cli.token.or(file.token).unwrap_or_default(),
            token_from: cli.token_from.or(file.token_from).unwrap_or_default(),
            print_token: cli.print_token.or(file.print_token).unwrap_or(true),
            strict_forwarding: cli
                .strict_forwarding
                .or(file.strict_forwarding)
                .unwrap_or(true),
        }
    }

    /// Resolves the merged configuration into the value the engine runs on.
    /// An empty upstream spec is rejected here, before any session attempt.
    pub fn session(&self) -> Result<SessionConfig, ConfigError> {
        if self.upstream.is_empty() {
            return Err(ConfigError::MissingUpstream);
        }
        let routes = RouteTable::parse(&self.upstream);
        let token = token::resolve(&self.token, &self.token_from)?;
        Ok(SessionConfig {
            remote: self.remote.clone(),
            routes,
            token,
            strict_forwarding: self.strict_forwarding,
        })
    }
}
