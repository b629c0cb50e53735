// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Textures and the metadata the hazard validator needs about them.
//!
//! A [`Texture`] only describes the shape of a texture: it owns no memory. It is immutable after
//! creation and is shared through an `Arc` by every [`TextureView`](view::TextureView) derived
//! from it, so it can be read from any number of threads while command buffers are validated.

pub use self::{
    subresource::{overlaps, AspectSelector, SubresourceRange},
    view::{TextureView, TextureViewCreateInfo, TextureViewType},
};
use crate::{
    macros::{impl_id_counter, vulkan_bitflags},
    NonExhaustive,
};
use std::{error::Error, fmt, num::NonZero, sync::Arc};

pub mod subresource;
pub mod view;

vulkan_bitflags! {
    /// A mask specifying one or more aspects of a texture.
    TextureAspects
    impl {
        /// Returns whether the aspects describe a depth and/or stencil texture.
        #[inline]
        pub const fn is_depth_stencil(self) -> bool {
            self.intersects(TextureAspects::DEPTH.union(TextureAspects::STENCIL))
        }
    }
    = ImageAspectFlags(u32);

    /// The color aspect.
    COLOR = COLOR,

    /// The depth aspect.
    DEPTH = DEPTH,

    /// The stencil aspect.
    STENCIL = STENCIL,
}

vulkan_bitflags! {
    /// Describes how a texture is going to be used.
    TextureUsage = ImageUsageFlags(u32);

    /// The texture can be used as a source for transfer operations.
    TRANSFER_SRC = TRANSFER_SRC,

    /// The texture can be used as a destination for transfer operations.
    TRANSFER_DST = TRANSFER_DST,

    /// The texture can be bound as a sampled or multisampled texture.
    SAMPLED = SAMPLED,

    /// The texture can be bound as a storage texture.
    STORAGE = STORAGE,

    /// The texture can be used as a color attachment of a render pass.
    COLOR_ATTACHMENT = COLOR_ATTACHMENT,

    /// The texture can be used as the depth/stencil attachment of a render pass.
    DEPTH_STENCIL_ATTACHMENT = DEPTH_STENCIL_ATTACHMENT,
}

/// Parameters to create a new `Texture`.
#[derive(Clone, Debug)]
pub struct TextureCreateInfo {
    /// The width and height of the texture's first mip level.
    ///
    /// The default value is `[1, 1]`.
    pub extent: [u32; 2],

    /// The number of mip levels.
    ///
    /// The default value is `1`.
    pub mip_levels: u32,

    /// The number of array layers.
    ///
    /// The default value is `1`.
    pub array_layers: u32,

    /// The aspects of the texture's format.
    ///
    /// The default value is [`TextureAspects::COLOR`].
    pub aspects: TextureAspects,

    /// The number of samples per texel.
    ///
    /// The default value is `1`.
    pub samples: u32,

    /// How the texture is going to be used.
    ///
    /// The default value is [`TextureUsage::empty()`], which must be overridden.
    pub usage: TextureUsage,

    pub _ne: NonExhaustive,
}

impl Default for TextureCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            extent: [1, 1],
            mip_levels: 1,
            array_layers: 1,
            aspects: TextureAspects::COLOR,
            samples: 1,
            usage: TextureUsage::empty(),
            _ne: NonExhaustive(()),
        }
    }
}

/// Describes a texture and the usages it was created with.
#[derive(Debug)]
pub struct Texture {
    id: NonZero<u64>,
    extent: [u32; 2],
    mip_levels: u32,
    array_layers: u32,
    aspects: TextureAspects,
    samples: u32,
    usage: TextureUsage,
}

impl Texture {
    /// Creates a new `Texture`.
    pub fn new(create_info: TextureCreateInfo) -> Result<Arc<Texture>, TextureCreationError> {
        Self::validate_new(&create_info)?;

        let TextureCreateInfo {
            extent,
            mip_levels,
            array_layers,
            aspects,
            samples,
            usage,
            _ne: _,
        } = create_info;

        Ok(Arc::new(Texture {
            id: Self::next_id(),
            extent,
            mip_levels,
            array_layers,
            aspects,
            samples,
            usage,
        }))
    }

    fn validate_new(create_info: &TextureCreateInfo) -> Result<(), TextureCreationError> {
        let &TextureCreateInfo {
            extent,
            mip_levels,
            array_layers,
            aspects,
            samples,
            usage,
            _ne: _,
        } = create_info;

        if extent.contains(&0) {
            return Err(TextureCreationError::ZeroExtent);
        }

        if array_layers == 0 {
            return Err(TextureCreationError::ZeroArrayLayers);
        }

        let max_mip_levels = max_mip_levels(extent);

        if mip_levels == 0 || mip_levels > max_mip_levels {
            return Err(TextureCreationError::InvalidMipLevels {
                requested: mip_levels,
                max: max_mip_levels,
            });
        }

        if aspects.is_empty() {
            return Err(TextureCreationError::EmptyAspects);
        }

        if aspects.intersects(TextureAspects::COLOR) && aspects.is_depth_stencil() {
            return Err(TextureCreationError::ColorWithDepthStencil);
        }

        if !samples.is_power_of_two() || samples > 64 {
            return Err(TextureCreationError::UnsupportedSampleCount { samples });
        }

        if samples > 1 && mip_levels != 1 {
            return Err(TextureCreationError::MultisampledMipLevels);
        }

        if usage.is_empty() {
            return Err(TextureCreationError::EmptyUsage);
        }

        Ok(())
    }

    /// Returns the width and height of the first mip level.
    #[inline]
    pub fn extent(&self) -> [u32; 2] {
        self.extent
    }

    /// Returns the number of mip levels.
    #[inline]
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Returns the number of array layers.
    #[inline]
    pub fn array_layers(&self) -> u32 {
        self.array_layers
    }

    /// Returns the aspects of the texture's format.
    #[inline]
    pub fn aspects(&self) -> TextureAspects {
        self.aspects
    }

    /// Returns the number of samples per texel.
    #[inline]
    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Returns the usages the texture was created with.
    #[inline]
    pub fn usage(&self) -> TextureUsage {
        self.usage
    }

    /// Returns a `SubresourceRange` covering the whole texture.
    #[inline]
    pub fn subresource_range(&self) -> SubresourceRange {
        SubresourceRange {
            aspect: AspectSelector::All,
            mip_levels: 0..self.mip_levels,
            array_layers: 0..self.array_layers,
        }
    }

    /// Returns the usage an attachment of this texture requires.
    #[inline]
    pub(crate) fn attachment_usage(&self) -> TextureUsage {
        if self.aspects.is_depth_stencil() {
            TextureUsage::DEPTH_STENCIL_ATTACHMENT
        } else {
            TextureUsage::COLOR_ATTACHMENT
        }
    }
}

impl_id_counter!(Texture);

fn max_mip_levels(extent: [u32; 2]) -> u32 {
    32 - extent[0].max(extent[1]).leading_zeros()
}

/// Error that can happen when creating a `Texture`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TextureCreationError {
    /// The width or height is zero.
    ZeroExtent,

    /// The number of array layers is zero.
    ZeroArrayLayers,

    /// The number of mip levels is zero or exceeds the length of the full mip chain.
    InvalidMipLevels { requested: u32, max: u32 },

    /// No aspect was specified.
    EmptyAspects,

    /// The color aspect was combined with the depth or stencil aspect.
    ColorWithDepthStencil,

    /// The sample count is not a power of two between 1 and 64.
    UnsupportedSampleCount { samples: u32 },

    /// A multisampled texture has more than one mip level.
    MultisampledMipLevels,

    /// No usage was specified.
    EmptyUsage,
}

impl Error for TextureCreationError {}

impl fmt::Display for TextureCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroExtent => write!(f, "the width or height of the texture is zero"),
            Self::ZeroArrayLayers => write!(f, "the number of array layers is zero"),
            Self::InvalidMipLevels { requested, max } => write!(
                f,
                "the number of mip levels ({}) is not between 1 and {}",
                requested, max,
            ),
            Self::EmptyAspects => write!(f, "no aspect was specified"),
            Self::ColorWithDepthStencil => write!(
                f,
                "the color aspect was combined with the depth or stencil aspect",
            ),
            Self::UnsupportedSampleCount { samples } => write!(
                f,
                "the sample count ({}) is not a power of two between 1 and 64",
                samples,
            ),
            Self::MultisampledMipLevels => {
                write!(f, "a multisampled texture has more than one mip level")
            }
            Self::EmptyUsage => write!(f, "no usage was specified"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Texture, TextureAspects, TextureCreateInfo, TextureCreationError, TextureUsage};

    #[test]
    fn create_full_mip_chain() {
        let texture = Texture::new(TextureCreateInfo {
            extent: [64, 32],
            mip_levels: 7,
            array_layers: 6,
            usage: TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap();

        assert_eq!(texture.mip_levels(), 7);
        assert_eq!(texture.subresource_range().array_layers, 0..6);
    }

    #[test]
    fn too_many_mip_levels() {
        let err = Texture::new(TextureCreateInfo {
            extent: [64, 32],
            mip_levels: 8,
            usage: TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap_err();

        assert_eq!(
            err,
            TextureCreationError::InvalidMipLevels {
                requested: 8,
                max: 7
            },
        );
    }

    #[test]
    fn color_with_depth() {
        let err = Texture::new(TextureCreateInfo {
            aspects: TextureAspects::COLOR | TextureAspects::DEPTH,
            usage: TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap_err();

        assert_eq!(err, TextureCreationError::ColorWithDepthStencil);
    }

    #[test]
    fn multisampled_with_mips() {
        assert_eq!(
            Texture::new(TextureCreateInfo {
                extent: [16, 16],
                mip_levels: 2,
                samples: 4,
                usage: TextureUsage::SAMPLED,
                ..Default::default()
            })
            .unwrap_err(),
            TextureCreationError::MultisampledMipLevels,
        );

        assert_eq!(
            Texture::new(TextureCreateInfo {
                samples: 3,
                usage: TextureUsage::SAMPLED,
                ..Default::default()
            })
            .unwrap_err(),
            TextureCreationError::UnsupportedSampleCount { samples: 3 },
        );
    }

    #[test]
    fn ids_are_unique() {
        let create_info = TextureCreateInfo {
            usage: TextureUsage::SAMPLED,
            ..Default::default()
        };
        let a = Texture::new(create_info.clone()).unwrap();
        let b = Texture::new(create_info).unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(*a, *b);
    }
}
