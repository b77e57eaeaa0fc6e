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

use derive_more::{Deref, From};
use ndarray::{concatenate, Array, Axis, Dimension, Ix, Ix2, ShapeError};
use xayn_test_utils::ApproxEqIter;

/// A d-dimensional embedding.
#[derive(Clone, Debug, Deref, From, PartialEq)]
pub struct Embedding<D>(Array<f32, D>)
where
    D: Dimension;

impl<'a, D> ApproxEqIter<'a, f32> for Embedding<D>
where
    D: 'a + Dimension,
{
    fn indexed_iter_logical_order(
        &'a self,
        index_prefix: Vec<Ix>,
    ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, f32)>> {
        (**self).indexed_iter_logical_order(index_prefix)
    }
}

/// A 2-dimensional embedding.
///
/// Word embeddings are of shape `(1, embedding_size)` and relation embeddings are of shape
/// `(1, 2 * embedding_size)`.
pub type Embedding2 = Embedding<Ix2>;

impl Embedding2 {
    /// Concatenates two embeddings along their features.
    pub fn concat(&self, other: &Self) -> Result<Self, ShapeError> {
        concatenate(Axis(1), &[self.view(), other.view()]).map(Into::into)
    }
}
