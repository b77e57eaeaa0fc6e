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

//! Relation embeddings of verbs and their direct objects.
//!
//! A sentence is parsed to find its first verb and that verb's direct object. Both words are
//! embedded by averaging the hidden states 8 to 11 of a transformer encoder at the token which
//! covers the word's first character, and the two word embeddings are concatenated into the
//! relation vector.
//!
//! See the `relation-vectors` binary in this crate for usage details.

#![forbid(unsafe_op_in_unsafe_fn)]
#![deny(
    clippy::pedantic,
    noop_method_call,
    rust_2018_idioms,
    unsafe_code,
    unused_qualifications
)]
#![warn(rustdoc::missing_crate_level_docs)]
#![allow(
    clippy::items_after_statements,
    clippy::missing_errors_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

mod config;
mod embedding;
mod model;
pub mod parser;
mod pipeline;
mod pooler;
mod relation;
mod tokenizer;

pub use crate::{
    config::{Config, Runtime},
    embedding::{Embedding, Embedding2},
    model::Model,
    pipeline::{Pipeline, PipelineError},
    pooler::{LayerAveragePooler, PoolerError},
    relation::{Outcome, Relation, RelationEmbedder, RelationError},
};
