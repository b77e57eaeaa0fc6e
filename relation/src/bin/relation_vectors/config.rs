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

use std::{
    path::{Path, PathBuf},
    process::exit,
};

use clap::{CommandFactory, Parser};
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use xayn_ai_relation::{parser::SpacyConfig, Runtime};

use crate::{cli::Args, logging};

const ENV_PREFIX: &str = "XAYN_RELATION__";

const DEFAULT_CONFIG_FILE: &str = "relation.toml";

#[derive(Debug, Deserialize, Serialize)]
#[serde(default)]
#[cfg_attr(test, serde(deny_unknown_fields))]
pub(crate) struct Config {
    /// The model directory.
    pub(crate) model: PathBuf,
    /// Overrides the default token size of the model, which is its maximum.
    pub(crate) token_size: Option<usize>,
    pub(crate) runtime: Runtime,
    /// The dependency parser.
    ///
    /// Its python workspace is relative to the current directory unless it is absolute, the
    /// default only works from the workspace root.
    pub(crate) parser: SpacyConfig,
    pub(crate) logging: logging::Config,
    pub(crate) sentences: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "assets/xlm_roberta_base_v0000".into(),
            token_size: None,
            runtime: Runtime::default(),
            parser: SpacyConfig::default(),
            logging: logging::Config::default(),
            sentences: [
                "I ate the soup.",
                "I cooked pasta for dinner.",
                "I organized the dinner.",
                "I attended the conference.",
            ]
            .map(String::from)
            .into(),
        }
    }
}

/// Loads the config.
///
/// # Program Exit
///
/// In case of `--help`, `--print-config` and failure
/// this functions will not return normally but terminate
/// the program instead.
pub(crate) fn load() -> Config {
    let mut args = Args::parse();

    let file = args.config.take();
    let config = match load_config(file.as_deref(), args.to_config_overrides()) {
        Ok(config) => config,
        Err(error) => {
            eprintln!("Error: {error}");
            Args::command().print_help().ok();
            exit(1);
        }
    };

    if args.print_config {
        match serde_json::to_string_pretty(&config) {
            Ok(config) => println!("{config}"),
            Err(error) => {
                eprintln!("Error: {error}");
                exit(1);
            }
        }
        exit(0);
    }

    config
}

/// Load the configuration.
///
/// # Load order/priority
///
/// This will by ascending priority load:
///
/// 1. `./relation.toml` or specified toml config file
/// 2. `./.env`
/// 3. `./.env.local`
/// 4. process environment
/// 5. options passed through `update_with`
///
/// Config values loaded from higher priority sources override such from lower
/// priority sources.
///
/// # Env and .env
///
/// Only environment variables with the `XAYN_RELATION__` prefix are considered and the prefix
/// is stripped. Env variables are split at `__`, ie `XAYN_RELATION__PARSER__SPACY_MODEL=x` is
/// treated like the json `{ "parser": { "spacy_model": "x" } }`.
pub(crate) fn load_config(
    config: Option<&str>,
    update_with: impl Serialize,
) -> Result<Config, figment::Error> {
    // the order must be from highest to lowest priority
    load_dotenv(".env.local")?;
    load_dotenv(".env")?;

    let mut figment = Figment::new()
        .join(Serialized::defaults(update_with))
        .join(Env::prefixed(ENV_PREFIX).split("__"));

    let provider = config
        .map(|content_or_path| {
            if let Some(content) = content_or_path.strip_prefix("inline:") {
                Toml::string(content)
            } else {
                Toml::file(content_or_path)
            }
        })
        .or_else(|| {
            let default_file = Path::new(DEFAULT_CONFIG_FILE);
            default_file.exists().then(|| Toml::file(default_file))
        });
    if let Some(provider) = provider {
        figment = figment.join(provider);
    }

    figment.extract()
}

fn load_dotenv(file_name: &str) -> Result<(), figment::Error> {
    match dotenvy::from_filename(file_name) {
        Err(error) if !error.not_found() => {
            Err(figment::Error::from(error.to_string()).with_path(file_name))
        }
        _ => Ok(()),
    }
}
