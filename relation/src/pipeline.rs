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
use tracing::debug;

use crate::{
    embedding::Embedding2,
    model::{Model, Predict},
    pooler::{LayerAveragePooler, PoolerError},
    tokenizer::{char_offset, Tokenizer},
};

/// A pipeline can be built from a [`Config`] and consists of a tokenizer and a model.
///
/// [`Config`]: crate::config::Config
pub struct Pipeline<M = Model> {
    pub(crate) tokenizer: Tokenizer,
    pub(crate) model: M,
}

/// The potential errors of the [`Pipeline`].
#[derive(Debug, Display, Error)]
pub enum PipelineError {
    /// Failed to configure the pipeline: {0}
    Config(#[from] figment::Error),
    /// Failed to run the tokenizer: {0}
    Tokenizer(#[from] tokenizers::Error),
    /// Failed to run the model: {0}
    Model(#[from] anyhow::Error),
    /// Failed to pool the hidden states: {0}
    Pooler(#[from] PoolerError),
    /// Failed to concatenate the word embeddings: {0}
    Shape(#[from] ndarray::ShapeError),
}

impl<M> Pipeline<M>
where
    M: Predict,
{
    /// Computes the embedding of a word within the sequence.
    ///
    /// The word is located at its first occurrence in the sequence, the embedding is taken at the
    /// token which contains the first char of the word. Returns `None` if the word doesn't occur
    /// or if no token contains its first char, eg due to truncation.
    ///
    /// The embedding is of shape `(1, embedding_size)`.
    pub fn embed_word(
        &self,
        sequence: impl AsRef<str>,
        word: impl AsRef<str>,
    ) -> Result<Option<Embedding2>, PipelineError> {
        let sequence = sequence.as_ref();
        let word = word.as_ref();

        let encoding = self.tokenizer.encode(sequence)?;
        let Some(token) =
            char_offset(sequence, word).and_then(|offset| encoding.char_to_token(offset))
        else {
            debug!(sequence, word, "word isn't aligned with any token");
            return Ok(None);
        };
        debug!(sequence, word, token, "aligned word with token");

        let hidden_states = self.model.predict(encoding)?;
        LayerAveragePooler::pool(&hidden_states, token)
            .map(Some)
            .map_err(Into::into)
    }

    /// Computes the relation embedding of a verb and its object within the sequence.
    ///
    /// Both words are embedded independently and the embeddings are concatenated. Returns `None`
    /// if any of the words can't be embedded.
    ///
    /// The embedding is of shape `(1, 2 * embedding_size)`.
    pub fn relation_vector(
        &self,
        sequence: impl AsRef<str>,
        verb: impl AsRef<str>,
        object: impl AsRef<str>,
    ) -> Result<Option<Embedding2>, PipelineError> {
        let sequence = sequence.as_ref();
        let Some(verb) = self.embed_word(sequence, verb)? else {
            return Ok(None);
        };
        let Some(object) = self.embed_word(sequence, object)? else {
            return Ok(None);
        };

        verb.concat(&object).map(Some).map_err(Into::into)
    }

    /// Gets the embedding size.
    pub fn embedding_size(&self) -> usize {
        self.model.embedding_size()
    }
}

impl<M> Pipeline<M> {
    /// Gets the token size.
    pub fn token_size(&self) -> usize {
        self.tokenizer.token_size()
    }
}
