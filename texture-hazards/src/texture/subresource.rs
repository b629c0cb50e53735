// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Subresource ranges and the overlap test that every conflict check is built on.

use super::TextureAspects;
use std::{cmp, ops::Range};

/// Selects which aspects of a texture a view or a usage refers to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum AspectSelector {
    /// Every aspect of the texture.
    #[default]
    All,

    /// Only the depth aspect of a depth/stencil texture.
    DepthOnly,

    /// Only the stencil aspect of a depth/stencil texture.
    StencilOnly,
}

impl AspectSelector {
    /// Returns whether the two selectors can address the same storage.
    ///
    /// `DepthOnly` and `StencilOnly` are disjoint; every other pair intersects.
    #[inline]
    pub const fn intersects(self, other: Self) -> bool {
        !matches!(
            (self, other),
            (AspectSelector::DepthOnly, AspectSelector::StencilOnly)
                | (AspectSelector::StencilOnly, AspectSelector::DepthOnly)
        )
    }

    /// Returns the narrower of two intersecting selectors, or `None` if they are disjoint.
    #[inline]
    pub const fn intersection(self, other: Self) -> Option<Self> {
        match (self, other) {
            (AspectSelector::All, other) | (other, AspectSelector::All) => Some(other),
            (a, b) if a.intersects(b) => Some(a),
            _ => None,
        }
    }

    /// Returns the aspects of a texture with `texture_aspects` that this selector addresses.
    #[inline]
    pub const fn resolve(self, texture_aspects: TextureAspects) -> TextureAspects {
        match self {
            AspectSelector::All => texture_aspects,
            AspectSelector::DepthOnly => texture_aspects.intersection(TextureAspects::DEPTH),
            AspectSelector::StencilOnly => texture_aspects.intersection(TextureAspects::STENCIL),
        }
    }
}

/// A rectangular region of a texture's (mip level, array layer, aspect) space.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubresourceRange {
    /// Selects the aspects that will be included.
    pub aspect: AspectSelector,

    /// Selects the range of the mip levels that will be included.
    ///
    /// The range must not be empty.
    pub mip_levels: Range<u32>,

    /// Selects the range of array layers that will be included.
    ///
    /// The range must not be empty.
    pub array_layers: Range<u32>,
}

impl SubresourceRange {
    /// Builds a range from a base and a count for both mip levels and array layers.
    ///
    /// # Panics
    ///
    /// - Panics if `mip_level_count` or `array_layer_count` is zero, or if either range would
    ///   overflow `u32`.
    #[inline]
    pub fn new(
        base_mip_level: u32,
        mip_level_count: u32,
        base_array_layer: u32,
        array_layer_count: u32,
        aspect: AspectSelector,
    ) -> Self {
        assert!(mip_level_count != 0 && array_layer_count != 0);
        let (Some(mip_end), Some(layer_end)) = (
            base_mip_level.checked_add(mip_level_count),
            base_array_layer.checked_add(array_layer_count),
        ) else {
            panic!("subresource range overflows `u32`");
        };

        Self {
            aspect,
            mip_levels: base_mip_level..mip_end,
            array_layers: base_array_layer..layer_end,
        }
    }

    /// Returns the number of mip levels in the range.
    #[inline]
    pub fn mip_level_count(&self) -> u32 {
        self.mip_levels.end - self.mip_levels.start
    }

    /// Returns the number of array layers in the range.
    #[inline]
    pub fn array_layer_count(&self) -> u32 {
        self.array_layers.end - self.array_layers.start
    }

    /// Returns whether the range addresses exactly one subresource per aspect.
    #[inline]
    pub fn is_single_subresource(&self) -> bool {
        self.mip_level_count() == 1 && self.array_layer_count() == 1
    }

    /// Returns whether `self` and `other` share at least one subresource.
    ///
    /// Both ranges must belong to the same texture for the answer to be meaningful.
    #[inline]
    pub fn overlaps(&self, other: &Self) -> bool {
        overlaps(self, other)
    }

    /// Returns the subresources shared by `self` and `other`, if any.
    pub fn intersection(&self, other: &Self) -> Option<Self> {
        if !overlaps(self, other) {
            return None;
        }

        Some(Self {
            aspect: self.aspect.intersection(other.aspect)?,
            mip_levels: cmp::max(self.mip_levels.start, other.mip_levels.start)
                ..cmp::min(self.mip_levels.end, other.mip_levels.end),
            array_layers: cmp::max(self.array_layers.start, other.array_layers.start)
                ..cmp::min(self.array_layers.end, other.array_layers.end),
        })
    }
}

/// Returns whether two ranges on the same texture share at least one subresource.
///
/// This is true if the mip level intervals intersect, the array layer intervals intersect, and
/// the aspect selectors intersect.
#[inline]
pub fn overlaps(a: &SubresourceRange, b: &SubresourceRange) -> bool {
    a.mip_levels.overlaps(&b.mip_levels)
        && a.array_layers.overlaps(&b.array_layers)
        && a.aspect.intersects(b.aspect)
}

trait RangeExt {
    fn overlaps(&self, other: &Self) -> bool;
}

impl<T> RangeExt for Range<T>
where
    T: Ord,
{
    fn overlaps(&self, other: &Self) -> bool {
        // Strictly less than, because ends are excluded.
        cmp::max(&self.start, &other.start) < cmp::min(&self.end, &other.end)
    }
}

#[cfg(test)]
mod tests {
    use super::{overlaps, AspectSelector, SubresourceRange};
    use proptest::prelude::*;

    fn range(mip: u32, mips: u32, layer: u32, layers: u32) -> SubresourceRange {
        SubresourceRange::new(mip, mips, layer, layers, AspectSelector::All)
    }

    #[test]
    fn adjacent_ranges_do_not_overlap() {
        assert!(!overlaps(&range(0, 2, 0, 1), &range(2, 1, 0, 1)));
        assert!(!overlaps(&range(0, 1, 0, 3), &range(0, 1, 3, 3)));
    }

    #[test]
    fn mip_and_layer_must_both_intersect() {
        // Same mips, different layers.
        assert!(!overlaps(&range(1, 1, 0, 1), &range(0, 6, 1, 1)));
        assert!(overlaps(&range(1, 1, 1, 1), &range(0, 6, 1, 1)));
    }

    #[test]
    fn depth_and_stencil_are_disjoint() {
        let depth = SubresourceRange {
            aspect: AspectSelector::DepthOnly,
            ..range(0, 1, 0, 1)
        };
        let stencil = SubresourceRange {
            aspect: AspectSelector::StencilOnly,
            ..range(0, 1, 0, 1)
        };

        assert!(!overlaps(&depth, &stencil));
        assert!(overlaps(&depth, &range(0, 1, 0, 1)));
        assert!(overlaps(&stencil, &range(0, 1, 0, 1)));
        assert_eq!(depth.intersection(&stencil), None);
    }

    #[test]
    fn intersection_narrows() {
        let a = range(0, 6, 1, 1);
        let b = SubresourceRange {
            aspect: AspectSelector::DepthOnly,
            ..range(2, 2, 0, 4)
        };

        assert_eq!(
            a.intersection(&b),
            Some(SubresourceRange {
                aspect: AspectSelector::DepthOnly,
                mip_levels: 2..4,
                array_layers: 1..2,
            }),
        );
    }

    fn any_aspect() -> impl Strategy<Value = AspectSelector> {
        prop_oneof![
            Just(AspectSelector::All),
            Just(AspectSelector::DepthOnly),
            Just(AspectSelector::StencilOnly),
        ]
    }

    fn any_range() -> impl Strategy<Value = SubresourceRange> {
        (0u32..8, 1u32..8, 0u32..8, 1u32..8, any_aspect()).prop_map(
            |(mip, mips, layer, layers, aspect)| {
                SubresourceRange::new(mip, mips, layer, layers, aspect)
            },
        )
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(a in any_range(), b in any_range()) {
            prop_assert_eq!(overlaps(&a, &b), overlaps(&b, &a));
        }

        #[test]
        fn overlap_is_reflexive(a in any_range()) {
            prop_assert!(overlaps(&a, &a));
        }

        #[test]
        fn intersection_agrees_with_overlap(a in any_range(), b in any_range()) {
            let intersection = a.intersection(&b);
            prop_assert_eq!(intersection.is_some(), overlaps(&a, &b));

            if let Some(shared) = intersection {
                prop_assert!(overlaps(&shared, &a));
                prop_assert!(overlaps(&shared, &b));
            }
        }
    }
}
