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

use std::iter;

use float_cmp::ApproxEq;
use ndarray::{ArrayBase, Data, Dimension, IntoDimension, Ix};

/// Asserts that two float containers are approximately equal.
///
/// Both sides are flattened in logical order and compared element by element, the indices of
/// both sides must match as well. Works for floats, slices, arrays, vectors, options and ndarray
/// arrays of any dimension:
///
/// ```
/// use ndarray::arr2;
/// use xayn_test_utils::assert_approx_eq;
///
/// assert_approx_eq!(f32, 0.150_391_55, 0.150_391_6, ulps = 3);
/// assert_approx_eq!(f32, arr2(&[[1., 2.]]), [[1., 2.]]);
/// ```
///
/// The number of `ulps` defaults to `2` and `epsilon` defaults to `0`. Two NaN values are treated
/// as equal.
#[macro_export]
macro_rules! assert_approx_eq {
    ($t:ty, $left:expr, $right:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, ulps = $ulps:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = 0., ulps = $ulps)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr $(,)?) => {
        $crate::assert_approx_eq!($t, $left, $right, epsilon = $epsilon, ulps = 2)
    };
    ($t:ty, $left:expr, $right:expr, epsilon = $epsilon:expr, ulps = $ulps:expr $(,)?) => {{
        let epsilon = $epsilon;
        let ulps = $ulps;
        let left = &$left;
        let right = &$right;
        let mut left = $crate::ApproxEqIter::<$t>::indexed_iter_logical_order(left, Vec::new());
        let mut right = $crate::ApproxEqIter::<$t>::indexed_iter_logical_order(right, Vec::new());
        loop {
            match (left.next(), right.next()) {
                (Some((left_idx, left_val)), Some((right_idx, right_val))) => {
                    std::assert_eq!(
                        left_idx, right_idx,
                        "Dimensionality mismatch: {:?} != {:?}", left_idx, right_idx,
                    );
                    if !(left_val.is_nan() && right_val.is_nan()) {
                        std::assert!(
                            $crate::approx_eq!(
                                $t, left_val, right_val, ulps = ulps, epsilon = epsilon
                            ),
                            "Approximated equal assertion failed (ulps={:?}, epsilon={:?}) at index {:?}: {:?} != {:?}",
                            ulps, epsilon, left_idx, left_val, right_val,
                        );
                    }
                }
                (Some(pair), None) => std::panic!("Left input is longer at {:?}", pair),
                (None, Some(pair)) => std::panic!("Right input is longer at {:?}", pair),
                (None, None) => break,
            }
        }
    }};
}

/// Flattens a float container for [`assert_approx_eq!`].
///
/// Leaf values yield themselves at the given index prefix, containers push the index of each of
/// their elements onto the prefix.
pub trait ApproxEqIter<'a, Leaf>
where
    Self: 'a,
    Leaf: ApproxEq + Copy,
{
    fn indexed_iter_logical_order(
        &'a self,
        index_prefix: Vec<Ix>,
    ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, Leaf)>>;
}

fn nested<'a, T, Leaf>(
    elements: impl 'a + Iterator<Item = &'a T>,
    index_prefix: Vec<Ix>,
) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, Leaf)>>
where
    T: 'a + ApproxEqIter<'a, Leaf>,
    Leaf: 'a + ApproxEq + Copy,
{
    Box::new(elements.enumerate().flat_map(move |(idx, element)| {
        let mut index_prefix = index_prefix.clone();
        index_prefix.push(idx);
        element.indexed_iter_logical_order(index_prefix)
    }))
}

macro_rules! impl_approx_eq_iter {
    ($($t:ty),+ $(,)?) => {
        $(
            impl<'a> ApproxEqIter<'a, $t> for $t {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(iter::once((index_prefix, *self)))
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for &'a T
            where
                T: 'a + ApproxEqIter<'a, $t> + ?Sized,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    (*self).indexed_iter_logical_order(index_prefix)
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for Option<T>
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), index_prefix)
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for [T]
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), index_prefix)
                }
            }

            impl<'a, T> ApproxEqIter<'a, $t> for Vec<T>
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), index_prefix)
                }
            }

            impl<'a, T, const N: usize> ApproxEqIter<'a, $t> for [T; N]
            where
                T: 'a + ApproxEqIter<'a, $t>,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    nested(self.iter(), index_prefix)
                }
            }

            impl<'a, S, D> ApproxEqIter<'a, $t> for ArrayBase<S, D>
            where
                S: 'a + Data<Elem = $t>,
                D: 'a + Dimension,
            {
                fn indexed_iter_logical_order(
                    &'a self,
                    index_prefix: Vec<Ix>,
                ) -> Box<dyn 'a + Iterator<Item = (Vec<Ix>, $t)>> {
                    Box::new(self.indexed_iter().map(move |(idx, element)| {
                        let mut index_prefix = index_prefix.clone();
                        index_prefix.extend(idx.into_dimension().as_array_view().iter());
                        (index_prefix, *element)
                    }))
                }
            }
        )+
    };
}

impl_approx_eq_iter! { f32, f64 }
