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

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;
use serde_json::{json, Map, Value};

/// Computes the relation vectors of verbs and their direct objects.
///
/// The default python workspace of the dependency parser is relative, run this from the
/// workspace root or configure an absolute `parser.python_workspace`.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub(super) struct Args {
    /// The model directory with `config.toml`, `tokenizer.json` and `model.onnx`.
    ///
    /// This setting is prioritized over settings through
    /// the config and environment.
    #[arg(short, long)]
    pub(super) model: Option<PathBuf>,

    /// Use given configuration file.
    ///
    /// Instead of a path "inline" toml configuration file can also be
    /// passed in by prefixing it with `inline:`.
    #[arg(short, long)]
    pub(super) config: Option<String>,

    /// Print the config and exit instead of computing the relations.
    #[arg(long)]
    pub(super) print_config: bool,

    /// The sentences to compute relation vectors for.
    ///
    /// Defaults to the configured sentences.
    pub(super) sentences: Vec<String>,
}

impl Args {
    pub(super) fn to_config_overrides(&self) -> impl Serialize {
        let mut map = Map::new();
        if let Some(model) = &self.model {
            map.insert(String::from("model"), json!(model));
        }
        if !self.sentences.is_empty() {
            map.insert(String::from("sentences"), json!(self.sentences));
        }

        Value::Object(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_args() {
        let args = Args::parse_from([
            "relation-vectors",
            "--model",
            "assets/model",
            "--print-config",
            "I ate the soup.",
            "I cooked pasta for dinner.",
        ]);
        assert_eq!(args.model, Some(PathBuf::from("assets/model")));
        assert!(args.config.is_none());
        assert!(args.print_config);
        assert_eq!(args.sentences, ["I ate the soup.", "I cooked pasta for dinner."]);
    }

    #[test]
    fn test_config_overrides() {
        let args = Args::parse_from(["relation-vectors"]);
        let overrides = serde_json::to_value(args.to_config_overrides()).unwrap();
        assert_eq!(overrides, json!({}));

        let args = Args::parse_from(["relation-vectors", "-m", "dir", "I ate the soup."]);
        let overrides = serde_json::to_value(args.to_config_overrides()).unwrap();
        assert_eq!(
            overrides,
            json!({ "model": "dir", "sentences": ["I ate the soup."] }),
        );
    }
}
