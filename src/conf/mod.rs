//! Provides application configuration options.
//!
//! Configuration options can be parsed from config files in TOML format
//! and overridden with `FOCUS_*` environment variables.

pub mod bridge;
pub mod focus;
pub mod media;
pub mod pubsub;

use std::collections::HashMap;

use config::{
    Config, ConfigError, Environment, File, FileFormat, Source, Value,
};
use failure::Error;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;

pub use self::{
    bridge::Bridge, focus::Focus, media::Media, pubsub::PubSub,
};

/// CLI argument that is responsible for holding application configuration
/// file path.
static APP_CONF_PATH_CMD_ARG_NAME: &str = "--conf";
/// Environment variable that is responsible for holding application
/// configuration file path.
static APP_CONF_PATH_ENV_VAR_NAME: &str = "FOCUS_CONF";

/// Settings of the conference focus.
#[derive(Clone, Debug, Deserialize, Serialize, SmartDefault)]
#[serde(default)]
pub struct Conf {
    /// Media bridge settings.
    pub bridge: Bridge,

    /// Focus state machine settings.
    pub focus: Focus,

    /// Media feature toggles for built offers.
    pub media: Media,

    /// Bridge statistics pub/sub feed settings.
    pub pubsub: PubSub,
}

impl Source for Conf {
    fn clone_into_box(&self) -> Box<dyn Source + Send + Sync> {
        Box::new((*self).clone())
    }

    fn collect(&self) -> Result<HashMap<String, Value>, ConfigError> {
        let serialized = toml::to_string(self)
            .map_err(|e| ConfigError::Message(e.to_string()))?;
        File::from_str(serialized.as_str(), FileFormat::Toml).collect()
    }
}

impl Conf {
    /// Creates new [`Conf`] and applies values from such sources
    /// and in that order:
    /// - default values;
    /// - configuration file, the name of which is given as a command line
    ///   parameter or environment variable;
    /// - environment variables.
    pub fn parse() -> Result<Self, Error> {
        use std::env;

        let mut cfg = Config::new();

        cfg.merge(Self::default())?;

        if let Some(path) = get_conf_file_name(
            env::var(APP_CONF_PATH_ENV_VAR_NAME),
            env::args(),
        ) {
            cfg.merge(File::with_name(&path))?;
        }

        cfg.merge(Environment::with_prefix("FOCUS").separator("__"))?;

        let s: Self = cfg.try_into()?;
        Ok(s)
    }
}

/// Returns the name of the configuration file, if defined.
fn get_conf_file_name<T>(
    env_var: Result<String, std::env::VarError>,
    cmd_args: T,
) -> Option<String>
where
    T: Iterator<Item = String>,
{
    if let Ok(path) = env_var {
        Some(path)
    } else {
        let mut args = cmd_args.skip_while(|x| x != APP_CONF_PATH_CMD_ARG_NAME);
        if args.next().is_some() {
            args.next()
        } else {
            None
        }
    }
}
