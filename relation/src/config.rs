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

use figment::{
    error::{Actual, Error, Kind},
    providers::{Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::{
    model::Model,
    pipeline::{Pipeline, PipelineError},
    tokenizer::Tokenizer,
};

/// The inference runtime of the encoder.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Runtime {
    /// Runs the model with tract.
    #[default]
    Tract,
    /// Runs the model with onnxruntime.
    Ort,
}

/// A pipeline configuration.
///
/// # Example
///
/// The configuration for an xlm-roberta base model which exports all of its hidden states:
///
/// ```toml
/// # the config file is always named `config.toml`
///
/// # the path is always `tokenizer.json`
/// [tokenizer]
/// add-special-tokens = true
///
/// [tokenizer.tokens]
/// # the `token size` must be in the inclusive range, it defaults to the maximum
/// size.min = 2
/// size.max = 512
/// padding = "<pad>"
///
/// # the [model] path is always `model.onnx`
/// [model]
/// # the output index of the embedding layer's hidden state, the hidden states of the
/// # transformer blocks follow in order
/// hidden-states = 2
///
/// # each input and output is required by tract
/// # string shapes are considered dynamic and depend on arguments
/// # a third input is passed the token type ids
/// [model.input.0]
/// shape.0 = 1
/// shape.1 = "token size"
/// type = "i64"
///
/// [model.input.1]
/// shape.0 = 1
/// shape.1 = "token size"
/// type = "i64"
///
/// [model.output.0]
/// shape.0 = 1
/// shape.1 = "token size"
/// shape.2 = 768
/// type = "f32"
///
/// # ... up to [model.output.14] for the 13 hidden states
/// ```
#[must_use]
pub struct Config {
    pub dir: PathBuf,
    toml: Figment,
    pub(crate) token_size: usize,
    pub(crate) runtime: Runtime,
}

impl Config {
    const MIN_TOKEN_SIZE: &str = "tokenizer.tokens.size.min";
    const MAX_TOKEN_SIZE: &str = "tokenizer.tokens.size.max";

    /// Creates a pipeline configuration.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, Error> {
        let dir = dir.into();
        let toml = Figment::from(Toml::file(dir.join("config.toml")));
        Self::from_figment(dir, toml)
    }

    pub(crate) fn from_figment(dir: PathBuf, toml: Figment) -> Result<Self, Error> {
        let token_size = toml.extract_inner::<usize>(Self::MAX_TOKEN_SIZE)?;

        Ok(Self {
            dir,
            toml,
            token_size,
            runtime: Runtime::default(),
        })
    }

    pub fn extract<'de, V>(&self, key: &str) -> Result<V, Error>
    where
        V: Deserialize<'de>,
    {
        self.toml.extract_inner(key)
    }

    /// Sets the token size for the tokenizer and the model.
    ///
    /// Defaults to the maximum of the token size range, ie sequences are only truncated at the
    /// model's limit.
    ///
    /// # Errors
    /// Fails if `size` is not within the token size range.
    pub fn with_token_size(mut self, size: usize) -> Result<Self, Error> {
        let min = self.extract::<usize>(Self::MIN_TOKEN_SIZE)?;
        let max = self.extract::<usize>(Self::MAX_TOKEN_SIZE)?;

        if (min..=max).contains(&size) {
            self.token_size = size;
            Ok(self)
        } else {
            Err(Error::from(Kind::InvalidValue(
                Actual::Unsigned(size as u128),
                format!("{min}..={max}"),
            )))
        }
    }

    /// Sets the runtime for the model.
    ///
    /// Defaults to `Runtime::Tract`.
    pub fn with_runtime(mut self, runtime: Runtime) -> Self {
        self.runtime = runtime;
        self
    }

    /// Gets the token size.
    pub fn token_size(&self) -> usize {
        self.token_size
    }

    /// Creates a pipeline from a configuration.
    pub fn build(&self) -> Result<Pipeline, PipelineError> {
        let tokenizer = Tokenizer::new(self)?;
        let model = Model::new(self)?;

        Ok(Pipeline { tokenizer, model })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const CONFIG: &str = r#"
        [tokenizer]
        add-special-tokens = true

        [tokenizer.tokens]
        size.min = 4
        size.max = 16
        padding = "[PAD]"

        [model]
        hidden-states = 0

        [model.input.0]
        shape.0 = 1
        shape.1 = "token size"
        type = "i64"

        [model.input.1]
        shape.0 = 1
        shape.1 = "token size"
        type = "i64"

        [model.output.0]
        shape.0 = 1
        shape.1 = "token size"
        shape.2 = 3
        type = "f32"
    "#;

    pub(crate) fn config() -> Config {
        Config::from_figment(PathBuf::from("mocked"), Figment::from(Toml::string(CONFIG))).unwrap()
    }

    #[test]
    fn test_default_token_size() {
        let config = config();
        assert_eq!(
            config.token_size(),
            config.extract::<usize>(Config::MAX_TOKEN_SIZE).unwrap(),
        );
        assert_eq!(config.token_size(), 16);
    }

    #[test]
    fn test_with_token_size() {
        assert_eq!(config().with_token_size(4).unwrap().token_size(), 4);
        assert_eq!(config().with_token_size(16).unwrap().token_size(), 16);
        assert!(config().with_token_size(3).is_err());
        assert!(config().with_token_size(17).is_err());
    }

    #[test]
    fn test_extract() {
        let config = config();
        assert_eq!(config.extract::<usize>("model.hidden-states").unwrap(), 0);
        assert_eq!(config.extract::<String>("tokenizer.tokens.padding").unwrap(), "[PAD]");
        assert!(config.extract::<String>("model.output.1.type").is_err());
    }

    #[test]
    fn test_runtime() {
        assert_eq!(config().runtime, Runtime::Tract);
        assert_eq!(config().with_runtime(Runtime::Ort).runtime, Runtime::Ort);
    }
}
