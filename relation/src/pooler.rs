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

use std::ops::Range;

use displaydoc::Display;
use ndarray::{s, Array1, Axis};
use thiserror::Error;

use crate::{embedding::Embedding2, model::HiddenStates};

/// The potential errors of the [`LayerAveragePooler`].
#[derive(Debug, Display, Error)]
pub enum PoolerError {
    /// The encoder has {available} hidden states, but at least {required} are required
    MissingLayers { available: usize, required: usize },
    /// The token {token} is out of bounds for a token size of {token_size}
    TokenOutOfBounds { token: usize, token_size: usize },
}

/// A layer average pooling strategy.
///
/// The hidden states are pooled over a fixed range of mid to late layers at a single token.
pub struct LayerAveragePooler;

impl LayerAveragePooler {
    /// The averaged hidden states, `0` being the output of the embedding layer.
    pub const LAYERS: Range<usize> = 8..12;

    /// Pools the hidden states at the `token` by averaging them over the [`LAYERS`].
    ///
    /// The embedding is of shape `(1, embedding_size)`.
    ///
    /// [`LAYERS`]: Self::LAYERS
    pub(crate) fn pool(
        hidden_states: &HiddenStates,
        token: usize,
    ) -> Result<Embedding2, PoolerError> {
        let layers = hidden_states.get(Self::LAYERS).ok_or(PoolerError::MissingLayers {
            available: hidden_states.len(),
            required: Self::LAYERS.end,
        })?;

        let mut average = Array1::<f32>::zeros(layers[0].len_of(Axis(2)));
        for layer in layers {
            let token_size = layer.len_of(Axis(1));
            if token >= token_size {
                return Err(PoolerError::TokenOutOfBounds { token, token_size });
            }
            average += &layer.slice(s![0, token, ..]);
        }
        #[allow(clippy::cast_precision_loss)] // the number of layers is small
        let count = layers.len() as f32;
        average /= count;

        Ok(average.insert_axis(Axis(0)).into())
    }
}

#[cfg(test)]
mod tests {
    use ndarray::{Array3, Axis};
    use xayn_test_utils::assert_approx_eq;

    use super::*;

    /// Hidden states where the value at `[0, token, dim]` of layer `l` is `100 l + 10 token + dim`.
    #[allow(clippy::cast_precision_loss)]
    fn layers(layers: usize, token_size: usize, embedding_size: usize) -> Vec<Array3<f32>> {
        (0..layers)
            .map(|layer| {
                Array3::from_shape_fn((1, token_size, embedding_size), |(_, token, dim)| {
                    (100 * layer + 10 * token + dim) as f32
                })
            })
            .collect()
    }

    fn hidden_states(layers: usize, token_size: usize, embedding_size: usize) -> HiddenStates {
        self::layers(layers, token_size, embedding_size).into()
    }

    #[test]
    fn test_pool() {
        let hidden_states = hidden_states(13, 4, 3);

        let embedding = LayerAveragePooler::pool(&hidden_states, 0).unwrap();
        assert_eq!(embedding.shape(), [1, 3]);
        assert_approx_eq!(f32, embedding, [[950., 951., 952.]]);

        let embedding = LayerAveragePooler::pool(&hidden_states, 2).unwrap();
        assert_approx_eq!(f32, embedding, [[970., 971., 972.]]);
    }

    #[test]
    fn test_pool_ignores_other_layers() {
        let mut layers = layers(13, 4, 3);
        let expected = LayerAveragePooler::pool(&layers.clone().into(), 1).unwrap();

        for layer in [0, 7, 12] {
            layers[layer].fill(f32::NAN);
        }
        let embedding = LayerAveragePooler::pool(&layers.into(), 1).unwrap();
        assert_approx_eq!(f32, embedding, expected);
    }

    #[test]
    fn test_pool_is_deterministic() {
        let hidden_states = hidden_states(12, 4, 8);
        let first = LayerAveragePooler::pool(&hidden_states, 3).unwrap();
        let second = LayerAveragePooler::pool(&hidden_states, 3).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_pool_single_layer_values() {
        let mut layers = vec![Array3::<f32>::zeros((1, 2, 2)); 12];
        for (layer, value) in [(8, 1.), (9, 2.), (10, 3.), (11, 6.)] {
            layers[layer].index_axis_mut(Axis(1), 1).fill(value);
        }
        let embedding = LayerAveragePooler::pool(&layers.into(), 1).unwrap();
        assert_approx_eq!(f32, embedding, [[3., 3.]]);
    }

    #[test]
    fn test_pool_missing_layers() {
        let hidden_states = hidden_states(11, 4, 3);
        assert!(matches!(
            LayerAveragePooler::pool(&hidden_states, 0),
            Err(PoolerError::MissingLayers {
                available: 11,
                required: 12,
            }),
        ));
    }

    #[test]
    fn test_pool_token_out_of_bounds() {
        let hidden_states = hidden_states(12, 4, 3);
        assert!(matches!(
            LayerAveragePooler::pool(&hidden_states, 4),
            Err(PoolerError::TokenOutOfBounds {
                token: 4,
                token_size: 4,
            }),
        ));
    }
}
