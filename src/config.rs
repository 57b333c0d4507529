use std::net::SocketAddr;
use std::num::NonZeroU32;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{var} has an invalid value: {value:?}")]
    Invalid { var: &'static str, value: String },
    #[error("IMGCOLLECT_FETCHES_PER_MINUTE must be greater than zero")]
    ZeroQuota,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Tcp,
    Stdio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub mode: Mode,
    pub listen_addr: SocketAddr,
    pub image_base_url: String,
    pub image_width: u32,
    pub image_height: u32,
    pub fetches_per_minute: NonZeroU32,
    pub render: RenderFormat,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mode = match lookup("IMGCOLLECT_MODE").as_deref() {
            None | Some("tcp") => Mode::Tcp,
            Some("stdio") => Mode::Stdio,
            Some(other) => return Err(invalid("IMGCOLLECT_MODE", other)),
        };

        let render = match lookup("IMGCOLLECT_RENDER").as_deref() {
            None | Some("text") => RenderFormat::Text,
            Some("json") => RenderFormat::Json,
            Some(other) => return Err(invalid("IMGCOLLECT_RENDER", other)),
        };

        let fetches_per_minute = parse_or(&lookup, "IMGCOLLECT_FETCHES_PER_MINUTE", 30u32)?;

        Ok(Self {
            mode,
            listen_addr: parse_or(
                &lookup,
                "IMGCOLLECT_LISTEN_ADDR",
                SocketAddr::from(([127, 0, 0, 1], 2626)),
            )?,
            image_base_url: lookup("IMGCOLLECT_IMAGE_BASE_URL")
                .unwrap_or_else(|| "https://picsum.photos".to_string()),
            image_width: parse_or(&lookup, "IMGCOLLECT_IMAGE_WIDTH", 620)?,
            image_height: parse_or(&lookup, "IMGCOLLECT_IMAGE_HEIGHT", 320)?,
            fetches_per_minute: NonZeroU32::new(fetches_per_minute).ok_or(ConfigError::ZeroQuota)?,
            render,
        })
    }
}

fn invalid(var: &'static str, value: &str) -> ConfigError {
    ConfigError::Invalid {
        var,
        value: value.to_string(),
    }
}

fn parse_or<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match lookup(var) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| invalid(var, &value)),
    }
}
