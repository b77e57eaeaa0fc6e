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

use displaydoc::Display;
use thiserror::Error;
use tracing::{debug, info};

use crate::{
    embedding::Embedding2,
    model::{Model, Predict},
    parser::{DependencyParser, ParserError, VerbObject},
    pipeline::{Pipeline, PipelineError},
};

/// The potential errors of the [`RelationEmbedder`].
#[derive(Debug, Display, Error)]
pub enum RelationError {
    /// Failed to parse the sentence: {0}
    Parser(#[from] ParserError),
    /// Failed to embed the relation: {0}
    Pipeline(#[from] PipelineError),
}

/// The relation of a verb and its direct object within a sentence.
#[derive(Clone, Debug)]
pub struct Relation {
    pub sentence: String,
    pub pair: VerbObject,
    /// The concatenated verb and object embeddings of shape `(1, 2 * embedding_size)`.
    pub vector: Embedding2,
}

/// The outcome of embedding the relation of a sentence.
#[derive(Clone, Debug)]
pub enum Outcome {
    /// The sentence has a verb-object pair which could be embedded.
    Relation(Relation),
    /// The first verb of the sentence has no direct object, or there is no verb at all.
    NoVerbObject,
    /// The verb or the object isn't aligned with any token of the encoded sentence.
    Unaligned(VerbObject),
}

/// Embeds the relations of verbs and their direct objects.
///
/// The parser and the pipeline are loaded once and reused for every sentence.
pub struct RelationEmbedder<P, M = Model> {
    parser: P,
    pipeline: Pipeline<M>,
}

impl<P, M> RelationEmbedder<P, M>
where
    P: DependencyParser,
    M: Predict,
{
    pub fn new(parser: P, pipeline: Pipeline<M>) -> Self {
        Self { parser, pipeline }
    }

    pub fn pipeline(&self) -> &Pipeline<M> {
        &self.pipeline
    }

    /// Extracts the verb-object pair of the sentence and embeds its relation.
    pub fn relation(&mut self, sentence: impl AsRef<str>) -> Result<Outcome, RelationError> {
        let sentence = sentence.as_ref();
        let Some(pair) = self.parser.extract_verb_object(sentence)? else {
            debug!(sentence, "no verb-object pair");
            return Ok(Outcome::NoVerbObject);
        };

        let Some(vector) = self
            .pipeline
            .relation_vector(sentence, &pair.verb, &pair.object)?
        else {
            return Ok(Outcome::Unaligned(pair));
        };
        info!(sentence, verb = %pair.verb, object = %pair.object, "embedded relation");

        Ok(Outcome::Relation(Relation {
            sentence: sentence.into(),
            pair,
            vector,
        }))
    }
}
