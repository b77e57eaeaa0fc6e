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

use std::{fs::File, io::BufReader, path::Path};

use anyhow::{bail, Result};
use derive_more::{Deref, From};
use ndarray::{Array3, ArrayViewD, CowArray, Ix3};
use ort::{
    environment::Environment,
    session::{Session, SessionBuilder},
    value::Value,
};
use serde::Deserialize;
use tract_onnx::prelude::{
    DatumType,
    Framework,
    InferenceFact,
    InferenceModel,
    InferenceModelExt,
    IntoArcTensor,
    TVec,
    TValue,
    TypedModel,
    TypedRunnableModel,
};

use crate::{
    config::{Config, Runtime},
    pooler::LayerAveragePooler,
    tokenizer::Encoding,
};

#[derive(Deserialize)]
enum DynDim {
    #[serde(rename = "token size")]
    TokenSize,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Dimension {
    Fixed(usize),
    Dynamic(DynDim),
}

impl Config {
    fn extract_facts(
        &self,
        io: &'static str,
        mut model: InferenceModel,
        with_io_fact: impl Fn(InferenceModel, usize, InferenceFact) -> Result<InferenceModel>,
    ) -> Result<InferenceModel> {
        for i in 0..self.count_facts(io) {
            let datum_type = self
                .extract::<String>(&format!("model.{io}.{i}.type"))?
                .parse::<DatumType>()?;
            let mut shape = Vec::new();
            let mut j = 0;
            while let Ok(dim) = self.extract::<Dimension>(&format!("model.{io}.{i}.shape.{j}")) {
                let dim = match dim {
                    Dimension::Fixed(dim) => dim,
                    Dimension::Dynamic(DynDim::TokenSize) => self.token_size,
                };
                shape.push(dim);
                j += 1;
            }
            model = with_io_fact(model, i, InferenceFact::dt_shape(datum_type, shape))?;
        }

        Ok(model)
    }

    fn count_facts(&self, io: &'static str) -> usize {
        (0..)
            .take_while(|i| self.extract::<String>(&format!("model.{io}.{i}.type")).is_ok())
            .count()
    }
}

/// The hidden states of all layers of the encoder.
///
/// The hidden state at index 0 is the output of the embedding layer, the hidden state at index
/// `i > 0` is the output of the `i`-th transformer block. Each hidden state is of shape
/// `(1, token_size, embedding_size)`.
#[derive(Clone, Debug, Deref, From)]
pub struct HiddenStates(Vec<Array3<f32>>);

impl HiddenStates {
    fn from_outputs<'a>(
        outputs: impl IntoIterator<Item = Result<ArrayViewD<'a, f32>>>,
        skip: usize,
    ) -> Result<Self> {
        outputs
            .into_iter()
            .skip(skip)
            .map(|output| Ok(output?.into_dimensionality::<Ix3>()?.to_owned()))
            .collect::<Result<Vec<_>>>()
            .map(Self)
    }
}

/// Predicts the hidden states of an encoded sequence.
pub trait Predict {
    /// Runs the encoder and keeps the hidden states of all of its layers.
    fn predict(&self, encoding: Encoding) -> Result<HiddenStates>;

    /// Gets the embedding size of the hidden states.
    fn embedding_size(&self) -> usize;
}

/// A transformer onnx model which exports the hidden states of all of its layers.
#[derive(Debug)]
pub struct Model {
    runtime: ModelRuntime,
    skip_outputs: usize,
    pub(crate) embedding_size: usize,
}

#[derive(Debug)]
enum ModelRuntime {
    Tract(TypedRunnableModel<TypedModel>),
    Ort(Session),
}

impl ModelRuntime {
    fn new(model: &Path, config: &Config) -> Result<Self> {
        match config.runtime {
            Runtime::Tract => Self::tract(model, config),
            Runtime::Ort => Self::ort(model),
        }
    }

    fn tract(model: &Path, config: &Config) -> Result<Self> {
        let mut model = BufReader::new(File::open(model)?);
        let model = tract_onnx::onnx().model_for_read(&mut model)?;
        let model = config.extract_facts("input", model, InferenceModel::with_input_fact)?;
        let model = config.extract_facts("output", model, InferenceModel::with_output_fact)?;
        let model = model.into_optimized()?.into_runnable()?;

        Ok(Self::Tract(model))
    }

    fn ort(model: &Path) -> Result<Self> {
        let environment = Environment::builder()
            .with_name("relation")
            .build()?
            .into_arc();
        let session = SessionBuilder::new(&environment)?.with_model_from_file(model)?;

        Ok(Self::Ort(session))
    }

    fn predict(&self, encoding: Encoding, skip: usize) -> Result<HiddenStates> {
        match self {
            Self::Tract(runtime) => Self::tract_predict(runtime, encoding, skip),
            Self::Ort(runtime) => Self::ort_predict(runtime, encoding, skip),
        }
    }

    fn tract_predict(
        model: &TypedRunnableModel<TypedModel>,
        encoding: Encoding,
        skip: usize,
    ) -> Result<HiddenStates> {
        let mut inputs = TVec::<TValue>::new();
        inputs.push(TValue::Const(encoding.token_ids.into_arc_tensor()));
        inputs.push(TValue::Const(encoding.attention_mask.into_arc_tensor()));
        if let Some(type_ids) = encoding.type_ids {
            inputs.push(TValue::Const(type_ids.into_arc_tensor()));
        }
        let outputs = model.run(inputs)?;

        HiddenStates::from_outputs(
            outputs.iter().map(|output| output.to_array_view::<f32>()),
            skip,
        )
    }

    fn ort_predict(session: &Session, encoding: Encoding, skip: usize) -> Result<HiddenStates> {
        let token_ids = CowArray::from(encoding.token_ids.into_dyn());
        let attention_mask = CowArray::from(encoding.attention_mask.into_dyn());
        let type_ids = encoding
            .type_ids
            .map(|type_ids| CowArray::from(type_ids.into_dyn()));

        let mut inputs = vec![
            Value::from_array(session.allocator(), &token_ids)?,
            Value::from_array(session.allocator(), &attention_mask)?,
        ];
        if let Some(type_ids) = &type_ids {
            inputs.push(Value::from_array(session.allocator(), type_ids)?);
        }

        let outputs = session.run(inputs)?;
        let outputs = outputs
            .iter()
            .map(|output| Ok(output.try_extract::<f32>()?.view().to_owned()))
            .collect::<Result<Vec<_>>>()?;

        HiddenStates::from_outputs(outputs.iter().map(|output| Ok(output.view())), skip)
    }
}

impl Model {
    /// Creates a model from a configuration.
    pub(crate) fn new(config: &Config) -> Result<Self> {
        let model = config.dir.join("model.onnx");
        if !model.exists() {
            bail!("encoder model '{}' doesn't exist", model.display());
        }

        let skip = config.extract::<usize>("model.hidden-states")?;
        let hidden_states = config.count_facts("output").saturating_sub(skip);
        if hidden_states < LayerAveragePooler::LAYERS.end {
            bail!(
                "encoder model exports {hidden_states} hidden states, but at least {} are required",
                LayerAveragePooler::LAYERS.end,
            );
        }
        let runtime = ModelRuntime::new(&model, config)?;

        Ok(Model {
            runtime,
            skip_outputs: skip,
            embedding_size: config.extract(&format!("model.output.{skip}.shape.2"))?,
        })
    }
}

impl Predict for Model {
    fn predict(&self, encoding: Encoding) -> Result<HiddenStates> {
        self.runtime.predict(encoding, self.skip_outputs)
    }

    fn embedding_size(&self) -> usize {
        self.embedding_size
    }
}
