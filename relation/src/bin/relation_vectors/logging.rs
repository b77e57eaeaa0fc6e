// Copyright 2023 Xayn AG
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as
// published by the Free Software Foundation, version 3.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Setup tracing for the driver.

use serde::{Deserialize, Serialize};
use tracing::error;
use tracing_subscriber::{
    filter::LevelFilter,
    fmt,
    layer::SubscriberExt,
    util::{SubscriberInitExt, TryInitError},
    EnvFilter,
};

mod serde_level_filter {
    use serde::{
        de::{Deserialize, Deserializer, Error},
        ser::{Serialize, Serializer},
    };
    use tracing_subscriber::filter::LevelFilter;

    #[allow(clippy::trivially_copy_pass_by_ref)] // required by serde
    pub(super) fn serialize<S>(level: &LevelFilter, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        level.to_string().serialize(serializer)
    }

    pub(super) fn deserialize<'de, D>(deserializer: D) -> Result<LevelFilter, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).and_then(|level| {
            level
                .parse::<LevelFilter>()
                .map_err(|error| D::Error::custom(error.to_string()))
        })
    }
}

#[derive(Debug, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct Config {
    /// The default level, `RUST_LOG` directives take precedence.
    #[serde(with = "serde_level_filter")]
    pub(crate) level: LevelFilter,
    /// Logs json lines instead of pretty printed events.
    pub(crate) json: bool,
    pub(crate) install_panic_hook: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            level: LevelFilter::INFO,
            json: false,
            install_panic_hook: true,
        }
    }
}

/// Initializes the logging.
///
/// Even though this returns an error if logging was already initialized you
/// should only call this function when you expect it to succeed.
pub(crate) fn initialize_global(config: &Config) -> Result<(), TryInitError> {
    let filter = EnvFilter::builder()
        .with_default_directive(config.level.into())
        .from_env_lossy();

    let json_log = config.json.then(|| {
        fmt::layer()
            .json()
            .flatten_event(true)
            .with_current_span(false)
    });
    let pretty_log = (!config.json).then(|| fmt::layer().pretty().with_target(false));

    tracing_subscriber::registry()
        .with(json_log)
        .with(pretty_log)
        .with(filter)
        .try_init()?;
    if config.install_panic_hook {
        init_panic_logging();
    }

    Ok(())
}

fn init_panic_logging() {
    std::panic::set_hook(Box::new(|panic| {
        if let Some(location) = panic.location() {
            error!(
                message = %panic,
                panic.file = location.file(),
                panic.line = location.line(),
                panic.column = location.column(),
            );
        } else {
            error!(message = %panic);
        }
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_serde() {
        let config = serde_json::from_str::<Config>(r#"{"level": "debug"}"#).unwrap();
        assert_eq!(config.level, LevelFilter::DEBUG);
        assert!(!config.json);
        assert!(config.install_panic_hook);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["level"], "debug");

        assert!(serde_json::from_str::<Config>(r#"{"level": "loud"}"#).is_err());
        assert!(serde_json::from_str::<Config>(r#"{"file": "log.json"}"#).is_err());
    }
}
