// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Views into a subresource range of a texture.
//!
//! A view never owns the texture data. The range of a view is checked against its parent
//! texture once, when the view is created; the validator trusts it afterwards.

use super::{AspectSelector, SubresourceRange, Texture, TextureAspects};
use crate::{macros::impl_id_counter, NonExhaustive};
use std::{error::Error, fmt, num::NonZero, ops::Range, sync::Arc};

/// The dimensionality of a texture view.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TextureViewType {
    /// A single 2D layer.
    Dim2d,

    /// Any number of 2D layers.
    Dim2dArray,

    /// Exactly six layers, addressed as the faces of a cube.
    Cube,

    /// A multiple of six layers, addressed as an array of cubes.
    CubeArray,
}

impl TextureViewType {
    fn is_compatible_with(self, array_layer_count: u32) -> bool {
        match self {
            TextureViewType::Dim2d => array_layer_count == 1,
            TextureViewType::Dim2dArray => true,
            TextureViewType::Cube => array_layer_count == 6,
            TextureViewType::CubeArray => array_layer_count % 6 == 0,
        }
    }
}

/// Parameters to create a new `TextureView`.
#[derive(Clone, Debug)]
pub struct TextureViewCreateInfo {
    /// The dimensionality of the view.
    ///
    /// The default value is [`TextureViewType::Dim2d`].
    pub view_type: TextureViewType,

    /// Which aspects of the texture the view selects.
    ///
    /// The default value is [`AspectSelector::All`].
    pub aspect: AspectSelector,

    /// The mip levels of the texture that the view covers.
    ///
    /// The default value is `0..1`.
    pub mip_levels: Range<u32>,

    /// The array layers of the texture that the view covers.
    ///
    /// The default value is `0..1`.
    pub array_layers: Range<u32>,

    pub _ne: NonExhaustive,
}

impl Default for TextureViewCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            view_type: TextureViewType::Dim2d,
            aspect: AspectSelector::All,
            mip_levels: 0..1,
            array_layers: 0..1,
            _ne: NonExhaustive(()),
        }
    }
}

impl TextureViewCreateInfo {
    /// Returns a `TextureViewCreateInfo` covering every subresource of `texture`.
    pub fn from_texture(texture: &Texture) -> Self {
        Self {
            view_type: if texture.array_layers() == 1 {
                TextureViewType::Dim2d
            } else {
                TextureViewType::Dim2dArray
            },
            mip_levels: 0..texture.mip_levels(),
            array_layers: 0..texture.array_layers(),
            ..Default::default()
        }
    }
}

/// A reference to a subresource range of a texture.
#[derive(Debug)]
pub struct TextureView {
    id: NonZero<u64>,
    texture: Arc<Texture>,
    view_type: TextureViewType,
    subresource_range: SubresourceRange,
}

impl TextureView {
    /// Creates a new `TextureView`.
    pub fn new(
        texture: Arc<Texture>,
        create_info: TextureViewCreateInfo,
    ) -> Result<Arc<TextureView>, TextureViewCreationError> {
        Self::validate_new(&texture, &create_info)?;

        let TextureViewCreateInfo {
            view_type,
            aspect,
            mip_levels,
            array_layers,
            _ne: _,
        } = create_info;

        Ok(Arc::new(TextureView {
            id: Self::next_id(),
            texture,
            view_type,
            subresource_range: SubresourceRange {
                aspect,
                mip_levels,
                array_layers,
            },
        }))
    }

    /// Creates a default `TextureView`, covering the whole texture.
    #[inline]
    pub fn new_default(texture: Arc<Texture>) -> Result<Arc<TextureView>, TextureViewCreationError> {
        let create_info = TextureViewCreateInfo::from_texture(&texture);
        Self::new(texture, create_info)
    }

    fn validate_new(
        texture: &Texture,
        create_info: &TextureViewCreateInfo,
    ) -> Result<(), TextureViewCreationError> {
        let &TextureViewCreateInfo {
            view_type,
            aspect,
            ref mip_levels,
            ref array_layers,
            _ne: _,
        } = create_info;

        if mip_levels.is_empty() || mip_levels.end > texture.mip_levels() {
            return Err(TextureViewCreationError::MipLevelsOutOfRange {
                requested: mip_levels.clone(),
                texture_mip_levels: texture.mip_levels(),
            });
        }

        if array_layers.is_empty() || array_layers.end > texture.array_layers() {
            return Err(TextureViewCreationError::ArrayLayersOutOfRange {
                requested: array_layers.clone(),
                texture_array_layers: texture.array_layers(),
            });
        }

        let required_aspect = match aspect {
            AspectSelector::All => TextureAspects::empty(),
            AspectSelector::DepthOnly => TextureAspects::DEPTH,
            AspectSelector::StencilOnly => TextureAspects::STENCIL,
        };

        if !texture.aspects().contains(required_aspect) {
            return Err(TextureViewCreationError::AspectNotPresent {
                aspect,
                texture_aspects: texture.aspects(),
            });
        }

        if !view_type.is_compatible_with(array_layers.end - array_layers.start) {
            return Err(TextureViewCreationError::IncompatibleType {
                view_type,
                array_layers: array_layers.clone(),
            });
        }

        Ok(())
    }

    /// Returns the texture the view belongs to.
    #[inline]
    pub fn texture(&self) -> &Arc<Texture> {
        &self.texture
    }

    /// Returns the dimensionality of the view.
    #[inline]
    pub fn view_type(&self) -> TextureViewType {
        self.view_type
    }

    /// Returns the subresources of the texture that the view covers.
    #[inline]
    pub fn subresource_range(&self) -> &SubresourceRange {
        &self.subresource_range
    }

    /// Returns the texture aspects the view actually addresses.
    #[inline]
    pub fn aspects(&self) -> TextureAspects {
        self.subresource_range
            .aspect
            .resolve(self.texture.aspects())
    }
}

impl_id_counter!(TextureView);

/// Error that can happen when creating a `TextureView`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TextureViewCreationError {
    /// The mip level range is empty or extends past the texture's mip levels.
    MipLevelsOutOfRange {
        requested: Range<u32>,
        texture_mip_levels: u32,
    },

    /// The array layer range is empty or extends past the texture's array layers.
    ArrayLayersOutOfRange {
        requested: Range<u32>,
        texture_array_layers: u32,
    },

    /// The aspect selector names an aspect the texture does not have.
    AspectNotPresent {
        aspect: AspectSelector,
        texture_aspects: TextureAspects,
    },

    /// The view type does not fit the number of array layers.
    IncompatibleType {
        view_type: TextureViewType,
        array_layers: Range<u32>,
    },
}

impl Error for TextureViewCreationError {}

impl fmt::Display for TextureViewCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MipLevelsOutOfRange {
                requested,
                texture_mip_levels,
            } => write!(
                f,
                "the mip levels {:?} are empty or out of range for a texture with {} mip levels",
                requested, texture_mip_levels,
            ),
            Self::ArrayLayersOutOfRange {
                requested,
                texture_array_layers,
            } => write!(
                f,
                "the array layers {:?} are empty or out of range for a texture with {} array \
                layers",
                requested, texture_array_layers,
            ),
            Self::AspectNotPresent {
                aspect,
                texture_aspects,
            } => write!(
                f,
                "the aspect selector `{:?}` is not valid for a texture with aspects `{:?}`",
                aspect, texture_aspects,
            ),
            Self::IncompatibleType {
                view_type,
                array_layers,
            } => write!(
                f,
                "a view of type `{:?}` cannot cover the array layers {:?}",
                view_type, array_layers,
            ),
        }
    }
}
