// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Bind groups: immutable sets of texture views bound to the entries of a layout.
//!
//! A bind group is validated against its layout when it is created, so that the hazard
//! validator can assume every entry is well-formed. During validation, a bind group is expanded
//! into concrete texture usages by [`resolve_bind_group`].

pub use self::resolve::{resolve_bind_group, ResolvedUsage};
use self::layout::{BindGroupLayout, BindGroupLayoutEntry, BindingType};
use crate::{
    macros::impl_id_counter,
    texture::{AspectSelector, TextureUsage, TextureView},
    NonExhaustive,
};
use smallvec::SmallVec;
use std::{error::Error, fmt, num::NonZero, sync::Arc};

pub mod layout;
mod resolve;

/// A texture view bound to a binding number.
#[derive(Clone, Debug)]
pub struct BindGroupEntry {
    pub binding: u32,
    pub view: Arc<TextureView>,
}

impl BindGroupEntry {
    #[inline]
    pub fn new(binding: u32, view: Arc<TextureView>) -> Self {
        Self { binding, view }
    }
}

/// Parameters to create a new `BindGroup`.
#[derive(Clone, Debug)]
pub struct BindGroupCreateInfo {
    /// One entry for each binding of the layout, in any order.
    ///
    /// The default value is empty.
    pub entries: Vec<BindGroupEntry>,

    pub _ne: NonExhaustive,
}

impl Default for BindGroupCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

/// An immutable set of texture bindings.
#[derive(Debug)]
pub struct BindGroup {
    id: NonZero<u64>,
    layout: Arc<BindGroupLayout>,
    // In the same order as the layout's entries.
    entries: SmallVec<[BindGroupEntry; 4]>,
}

impl BindGroup {
    /// Creates a new `BindGroup`.
    pub fn new(
        layout: Arc<BindGroupLayout>,
        create_info: BindGroupCreateInfo,
    ) -> Result<Arc<BindGroup>, BindGroupCreationError> {
        let BindGroupCreateInfo { entries, _ne: _ } = create_info;

        let mut entries: SmallVec<[BindGroupEntry; 4]> = entries.into_iter().collect();
        entries.sort_by_key(|entry| entry.binding);
        Self::validate_new(&layout, &entries)?;

        Ok(Arc::new(BindGroup {
            id: Self::next_id(),
            layout,
            entries,
        }))
    }

    fn validate_new(
        layout: &BindGroupLayout,
        entries: &[BindGroupEntry],
    ) -> Result<(), BindGroupCreationError> {
        if let Some(pair) = entries
            .windows(2)
            .find(|pair| pair[0].binding == pair[1].binding)
        {
            return Err(BindGroupCreationError::DuplicateEntry {
                binding: pair[0].binding,
            });
        }

        for entry in entries {
            let layout_entry = layout.entry(entry.binding).ok_or(
                BindGroupCreationError::UnexpectedEntry {
                    binding: entry.binding,
                },
            )?;

            validate_entry(layout_entry, &entry.view)?;
        }

        // Every entry is in the layout and there are no duplicates, so any missing binding shows
        // up as a length mismatch.
        if entries.len() != layout.entries().len() {
            let missing = layout
                .entries()
                .iter()
                .find(|layout_entry| {
                    entries
                        .binary_search_by_key(&layout_entry.binding, |entry| entry.binding)
                        .is_err()
                })
                .map_or(0, |layout_entry| layout_entry.binding);

            return Err(BindGroupCreationError::MissingEntry { binding: missing });
        }

        Ok(())
    }

    /// Returns the layout of the bind group.
    #[inline]
    pub fn layout(&self) -> &Arc<BindGroupLayout> {
        &self.layout
    }

    /// Returns the entries of the bind group, sorted by binding number.
    #[inline]
    pub fn entries(&self) -> &[BindGroupEntry] {
        &self.entries
    }

    /// Returns each layout entry together with the view bound to it.
    #[inline]
    pub fn bindings(
        &self,
    ) -> impl ExactSizeIterator<Item = (&BindGroupLayoutEntry, &Arc<TextureView>)> {
        self.layout
            .entries()
            .iter()
            .zip(self.entries.iter().map(|entry| &entry.view))
    }
}

impl_id_counter!(BindGroup);

fn validate_entry(
    layout_entry: &BindGroupLayoutEntry,
    view: &TextureView,
) -> Result<(), BindGroupCreationError> {
    let binding = layout_entry.binding;
    let texture = view.texture();
    let required_usage = layout_entry.ty.required_usage();

    if !texture.usage().contains(required_usage) {
        return Err(BindGroupCreationError::MissingUsage {
            binding,
            required_usage,
        });
    }

    let samples_ok = match layout_entry.ty {
        BindingType::MultisampledTexture => texture.samples() > 1,
        BindingType::SampledTexture | BindingType::StorageTexture { .. } => texture.samples() == 1,
    };

    if !samples_ok {
        return Err(BindGroupCreationError::SampleCountMismatch {
            binding,
            ty: layout_entry.ty,
            samples: texture.samples(),
        });
    }

    match layout_entry.ty {
        BindingType::StorageTexture { .. } => {
            let mip_levels = view.subresource_range().mip_level_count();

            if mip_levels != 1 {
                return Err(BindGroupCreationError::StorageMultipleMipLevels {
                    binding,
                    mip_levels,
                });
            }
        }
        BindingType::SampledTexture | BindingType::MultisampledTexture => {
            if view.aspects().count() > 1
                && view.subresource_range().aspect == AspectSelector::All
            {
                return Err(BindGroupCreationError::AmbiguousAspect { binding });
            }
        }
    }

    Ok(())
}

/// Error that can happen when creating a `BindGroup`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindGroupCreationError {
    /// A binding of the layout has no entry.
    MissingEntry { binding: u32 },

    /// An entry has a binding number that is not in the layout.
    UnexpectedEntry { binding: u32 },

    /// Two entries have the same binding number.
    DuplicateEntry { binding: u32 },

    /// The texture of an entry was not created with the usage its binding type requires.
    MissingUsage {
        binding: u32,
        required_usage: TextureUsage,
    },

    /// The sample count of an entry's texture does not match its binding type.
    SampleCountMismatch {
        binding: u32,
        ty: BindingType,
        samples: u32,
    },

    /// A storage texture view covers more than one mip level.
    StorageMultipleMipLevels { binding: u32, mip_levels: u32 },

    /// A sampled view of a combined depth/stencil texture does not select a single aspect.
    AmbiguousAspect { binding: u32 },
}

impl Error for BindGroupCreationError {}

impl fmt::Display for BindGroupCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingEntry { binding } => {
                write!(f, "binding {} of the layout has no entry", binding)
            }
            Self::UnexpectedEntry { binding } => {
                write!(f, "binding {} is not part of the layout", binding)
            }
            Self::DuplicateEntry { binding } => {
                write!(f, "binding {} has more than one entry", binding)
            }
            Self::MissingUsage {
                binding,
                required_usage,
            } => write!(
                f,
                "the texture bound to binding {} was not created with the `{:?}` usage",
                binding, required_usage,
            ),
            Self::SampleCountMismatch {
                binding,
                ty,
                samples,
            } => write!(
                f,
                "the texture bound to binding {} has {} samples, which is not allowed for \
                `{:?}`",
                binding, samples, ty,
            ),
            Self::StorageMultipleMipLevels {
                binding,
                mip_levels,
            } => write!(
                f,
                "the storage texture view bound to binding {} covers {} mip levels instead of 1",
                binding, mip_levels,
            ),
            Self::AmbiguousAspect { binding } => write!(
                f,
                "the view bound to binding {} must select either the depth or the stencil aspect",
                binding,
            ),
        }
    }
}
