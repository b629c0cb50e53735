// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Describes the interface of a bind group: which binding numbers exist, which shader stages can
//! see them, and how each one accesses its texture.

use crate::{macros::impl_id_counter, shader::ShaderStages, texture::TextureUsage, NonExhaustive};
use smallvec::SmallVec;
use std::{error::Error, fmt, num::NonZero, sync::Arc};

/// How a shader accesses a storage texture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorageTextureAccess {
    /// The shader only writes to the texture.
    WriteOnly,

    /// The shader only reads from the texture.
    ReadOnly,

    /// The shader both reads from and writes to the texture.
    ReadWrite,
}

impl StorageTextureAccess {
    /// Returns whether the access includes writes.
    #[inline]
    pub const fn contains_write(self) -> bool {
        !matches!(self, StorageTextureAccess::ReadOnly)
    }
}

/// The type of resource a binding expects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BindingType {
    /// A single-sampled texture read through a sampler or texel fetches.
    SampledTexture,

    /// A multisampled texture read through texel fetches.
    MultisampledTexture,

    /// A storage texture.
    StorageTexture { access: StorageTextureAccess },
}

impl BindingType {
    /// Returns the usage a texture must have been created with to be bound to this type.
    #[inline]
    pub const fn required_usage(self) -> TextureUsage {
        match self {
            BindingType::SampledTexture | BindingType::MultisampledTexture => TextureUsage::SAMPLED,
            BindingType::StorageTexture { .. } => TextureUsage::STORAGE,
        }
    }
}

/// A single binding in a bind group layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BindGroupLayoutEntry {
    /// The binding number.
    pub binding: u32,

    /// The shader stages that can access the binding.
    ///
    /// An empty set is allowed. Such a binding is still validated for hazards.
    pub visibility: ShaderStages,

    /// The type of resource that must be bound.
    pub ty: BindingType,
}

/// Parameters to create a new `BindGroupLayout`.
#[derive(Clone, Debug)]
pub struct BindGroupLayoutCreateInfo {
    /// The bindings of the layout, in any order.
    ///
    /// The default value is empty.
    pub entries: Vec<BindGroupLayoutEntry>,

    pub _ne: NonExhaustive,
}

impl Default for BindGroupLayoutCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            entries: Vec::new(),
            _ne: NonExhaustive(()),
        }
    }
}

/// Describes the bindings of a bind group.
#[derive(Debug)]
pub struct BindGroupLayout {
    id: NonZero<u64>,
    // Sorted by binding number.
    entries: SmallVec<[BindGroupLayoutEntry; 4]>,
}

impl BindGroupLayout {
    /// Creates a new `BindGroupLayout`.
    pub fn new(
        create_info: BindGroupLayoutCreateInfo,
    ) -> Result<Arc<BindGroupLayout>, BindGroupLayoutCreationError> {
        let BindGroupLayoutCreateInfo { entries, _ne: _ } = create_info;

        let mut entries: SmallVec<[BindGroupLayoutEntry; 4]> = entries.into_iter().collect();
        entries.sort_by_key(|entry| entry.binding);

        if let Some(pair) = entries
            .windows(2)
            .find(|pair| pair[0].binding == pair[1].binding)
        {
            return Err(BindGroupLayoutCreationError::DuplicateBinding {
                binding: pair[0].binding,
            });
        }

        Ok(Arc::new(BindGroupLayout {
            id: Self::next_id(),
            entries,
        }))
    }

    /// Returns the bindings of the layout, sorted by binding number.
    #[inline]
    pub fn entries(&self) -> &[BindGroupLayoutEntry] {
        &self.entries
    }

    /// Returns the binding with the given number.
    #[inline]
    pub fn entry(&self, binding: u32) -> Option<&BindGroupLayoutEntry> {
        self.entries
            .binary_search_by_key(&binding, |entry| entry.binding)
            .ok()
            .map(|index| &self.entries[index])
    }
}

impl_id_counter!(BindGroupLayout);

/// Error that can happen when creating a `BindGroupLayout`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BindGroupLayoutCreationError {
    /// Two entries have the same binding number.
    DuplicateBinding { binding: u32 },
}

impl Error for BindGroupLayoutCreationError {}

impl fmt::Display for BindGroupLayoutCreationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateBinding { binding } => {
                write!(f, "binding {} is declared more than once", binding)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{
        BindGroupLayout, BindGroupLayoutCreateInfo, BindGroupLayoutCreationError,
        BindGroupLayoutEntry, BindingType,
    };
    use crate::shader::ShaderStages;

    #[test]
    fn entries_are_sorted() {
        let layout = BindGroupLayout::new(BindGroupLayoutCreateInfo {
            entries: vec![
                BindGroupLayoutEntry {
                    binding: 3,
                    visibility: ShaderStages::FRAGMENT,
                    ty: BindingType::SampledTexture,
                },
                BindGroupLayoutEntry {
                    binding: 1,
                    visibility: ShaderStages::empty(),
                    ty: BindingType::MultisampledTexture,
                },
            ],
            ..Default::default()
        })
        .unwrap();

        let bindings: Vec<_> = layout.entries().iter().map(|e| e.binding).collect();
        assert_eq!(bindings, [1, 3]);
        assert_eq!(layout.entry(3).unwrap().ty, BindingType::SampledTexture);
        assert!(layout.entry(2).is_none());
    }

    #[test]
    fn duplicate_binding() {
        let entry = BindGroupLayoutEntry {
            binding: 0,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::SampledTexture,
        };

        assert_eq!(
            BindGroupLayout::new(BindGroupLayoutCreateInfo {
                entries: vec![entry, entry],
                ..Default::default()
            })
            .unwrap_err(),
            BindGroupLayoutCreationError::DuplicateBinding { binding: 0 },
        );
    }
}
