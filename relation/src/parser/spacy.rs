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

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::{
    python_child::{PipeCommand, PythonChild},
    DependencyParser,
    Doc,
    ParserError,
};

#[derive(Clone, Debug, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SpacyConfig {
    /// The directory with the `Pipfile` of the python environment.
    ///
    /// A relative path is resolved against the current working directory, the default `relation`
    /// requires the parser to be started from the workspace root.
    pub python_workspace: PathBuf,
    /// The parser script, relative to the `python_workspace`.
    pub python_file: PathBuf,
    /// The command to run the python interpreter.
    pub command: Vec<String>,
    /// The spaCy pipeline to load.
    pub spacy_model: String,
}

impl Default for SpacyConfig {
    fn default() -> Self {
        Self {
            python_workspace: "relation".into(),
            python_file: "python_src/dependency_parser.py".into(),
            command: vec!["pipenv".into(), "run".into(), "python".into()],
            spacy_model: "en_core_web_trf".into(),
        }
    }
}

/// A dependency parser backed by spaCy running in a python child process.
pub struct SpacyParser {
    child: PythonChild,
}

impl SpacyParser {
    /// Spawns the python child and loads the spaCy pipeline.
    pub fn spawn(config: &SpacyConfig) -> Result<Self, ParserError> {
        let mut child = PythonChild::spawn(
            &config.command,
            &config.python_workspace,
            &config.python_file,
        )?;
        child.send_command(
            &Initialize {
                spacy_model: &config.spacy_model,
            },
            ParserError::Parser,
        )?;
        info!(spacy_model = %config.spacy_model, "initialized spacy parser");

        Ok(Self { child })
    }
}

impl DependencyParser for SpacyParser {
    fn parse(&mut self, sentence: &str) -> Result<Doc, ParserError> {
        let doc = self
            .child
            .send_command(&Parse { sentence }, ParserError::Parser)?;
        debug!(sentence, tokens = doc.len(), "parsed sentence");

        Ok(doc)
    }
}

#[derive(Serialize)]
struct Initialize<'a> {
    spacy_model: &'a str,
}

impl PipeCommand for Initialize<'_> {
    type Value = ();
    const TAG: &'static str = "initialize";
}

#[derive(Serialize)]
struct Parse<'a> {
    sentence: &'a str,
}

impl PipeCommand for Parse<'_> {
    type Value = Doc;
    const TAG: &'static str = "parse";
}
