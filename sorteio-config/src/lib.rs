use core::fmt::{Debug, Display};
use std::net::SocketAddr;

use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};

pub const CONFIG_FILE: &str = "sorteio.toml";
pub const ENV_PREFIX: &str = "SORTEIO_";

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct WebhookConfig {
    /// Receives newly created raffles before they are stored locally.
    pub register_url: String,
    /// Lists the raffles open for public self-registration.
    pub list_url: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            register_url: "https://webhook.triad3.io/webhook/cadastrosorteiosss".to_owned(),
            list_url: "https://webhook.triad3.io/webhook/getsorteios-triad3".to_owned(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq, Eq)]
pub struct Config {
    /// Public base url, used to build participation links.
    pub url: String,
    pub listen: SocketAddr,
    pub draw_countdown_secs: u64,
    /// Load the demo organizers, events and raffles on startup.
    pub seed: bool,
    pub webhook: WebhookConfig,
}

/// Everything except `url` has a sensible value out of the box.
#[derive(Serialize)]
struct Defaults {
    listen: SocketAddr,
    draw_countdown_secs: u64,
    seed: bool,
    webhook: WebhookConfig,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 3000)),
            draw_countdown_secs: 5,
            seed: true,
            webhook: WebhookConfig::default(),
        }
    }
}

#[derive(thiserror::Error)]
pub enum ConfigError {
    #[error("config error: {0}")]
    Figment(#[from] figment::Error),
}

impl Debug for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

pub fn figment() -> Figment {
    Figment::from(Serialized::defaults(Defaults::default()))
        .merge(Toml::file(CONFIG_FILE))
        .merge(Env::prefixed(ENV_PREFIX).split("__"))
}

pub fn get_config() -> Result<Config, ConfigError> {
    Ok(figment().extract()?)
}
