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

//! Computes the relation vectors of the configured sentences.
//!
//! Sentences without a verb-object pair, or whose pair isn't aligned with the tokens, are skipped.

mod cli;
mod config;
mod logging;

use anyhow::Result;
use tracing::{info, instrument, warn};
use xayn_ai_relation::{
    parser::SpacyParser,
    Config as PipelineConfig,
    Outcome,
    RelationEmbedder,
};

#[instrument(err)]
fn main() -> Result<()> {
    let config = config::load();
    logging::initialize_global(&config.logging)?;

    let mut pipeline = PipelineConfig::new(&config.model)?.with_runtime(config.runtime);
    if let Some(token_size) = config.token_size {
        pipeline = pipeline.with_token_size(token_size)?;
    }
    let pipeline = pipeline.build()?;
    info!(
        model = %config.model.display(),
        token_size = pipeline.token_size(),
        embedding_size = pipeline.embedding_size(),
        "loaded pipeline",
    );
    let parser = SpacyParser::spawn(&config.parser)?;
    let mut embedder = RelationEmbedder::new(parser, pipeline);

    for sentence in &config.sentences {
        match embedder.relation(sentence)? {
            Outcome::Relation(relation) => info!(
                sentence = %relation.sentence,
                verb = %relation.pair.verb,
                object = %relation.pair.object,
                shape = ?relation.vector.shape(),
                "relation vector",
            ),
            Outcome::NoVerbObject => {
                warn!(%sentence, "skipping sentence without verb-object pair");
            }
            Outcome::Unaligned(pair) => warn!(
                %sentence,
                verb = %pair.verb,
                object = %pair.object,
                "skipping sentence with unaligned verb-object pair",
            ),
        }
    }

    Ok(())
}
