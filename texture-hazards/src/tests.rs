// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Helpers shared by the unit tests.

use crate::{
    bind_group::layout::{
        BindGroupLayout, BindGroupLayoutCreateInfo, BindGroupLayoutEntry, BindingType,
    },
    shader::ShaderStages,
    texture::{
        Texture, TextureAspects, TextureCreateInfo, TextureUsage, TextureView,
        TextureViewCreateInfo, TextureViewType,
    },
};
use std::{ops::Range, sync::Arc};

/// A 64x64 color texture that can be sampled, used as storage and rendered to.
pub(crate) fn color_texture(mip_levels: u32, array_layers: u32) -> Arc<Texture> {
    Texture::new(TextureCreateInfo {
        extent: [64, 64],
        mip_levels,
        array_layers,
        usage: TextureUsage::SAMPLED | TextureUsage::STORAGE | TextureUsage::COLOR_ATTACHMENT,
        ..Default::default()
    })
    .unwrap()
}

/// A single-subresource texture with both a depth and a stencil aspect.
pub(crate) fn depth_stencil_texture() -> Arc<Texture> {
    Texture::new(TextureCreateInfo {
        extent: [64, 64],
        aspects: TextureAspects::DEPTH | TextureAspects::STENCIL,
        usage: TextureUsage::SAMPLED | TextureUsage::DEPTH_STENCIL_ATTACHMENT,
        ..Default::default()
    })
    .unwrap()
}

pub(crate) fn view(
    texture: &Arc<Texture>,
    mip_levels: Range<u32>,
    array_layers: Range<u32>,
) -> Arc<TextureView> {
    let view_type = if array_layers.len() == 1 {
        TextureViewType::Dim2d
    } else {
        TextureViewType::Dim2dArray
    };

    TextureView::new(
        texture.clone(),
        TextureViewCreateInfo {
            view_type,
            mip_levels,
            array_layers,
            ..Default::default()
        },
    )
    .unwrap()
}

pub(crate) fn layout(entries: &[(u32, ShaderStages, BindingType)]) -> Arc<BindGroupLayout> {
    BindGroupLayout::new(BindGroupLayoutCreateInfo {
        entries: entries
            .iter()
            .map(|&(binding, visibility, ty)| BindGroupLayoutEntry {
                binding,
                visibility,
                ty,
            })
            .collect(),
        ..Default::default()
    })
    .unwrap()
}
