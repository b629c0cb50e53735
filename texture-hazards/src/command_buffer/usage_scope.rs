// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Accumulation of texture usages within one validation scope.
//!
//! A [`UsageScope`] collects every `(subresource range, usage kind)` pair touched during a scope
//! and reports each pair of usages that overlap on the same texture with incompatible kinds.
//! Usages are grouped by texture, so usages of different textures are never compared.

use super::{error::Conflict, AttachmentSlot};
use crate::texture::{SubresourceRange, Texture, TextureView};
use foldhash::HashMap;
use smallvec::SmallVec;
use std::{fmt, num::NonZero, sync::Arc};
use tracing::trace;

/// How a texture subresource is accessed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UsageKind {
    /// Sampled, multisampled or read-only storage access, or a read-only depth/stencil
    /// attachment.
    ReadOnly,

    /// Storage access that may write.
    WriteOnlyStorage,

    /// Read-modify-write access as a render pass attachment.
    RenderTarget,
}

impl UsageKind {
    /// Returns whether two usages of this kind and `other` may share a subresource.
    ///
    /// Only `ReadOnly` with `ReadOnly`, and `WriteOnlyStorage` with `WriteOnlyStorage`, are
    /// compatible. Concurrent write-only storage accesses are a defined race rather than an
    /// error. Two `RenderTarget` usages always conflict.
    #[inline]
    pub const fn is_compatible_with(self, other: Self) -> bool {
        matches!(
            (self, other),
            (UsageKind::ReadOnly, UsageKind::ReadOnly)
                | (UsageKind::WriteOnlyStorage, UsageKind::WriteOnlyStorage)
        )
    }
}

/// Identifies the kind of scope usages were collected in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ScopeKind {
    /// A whole render pass. `pass_index` counts every pass of the command buffer, render and
    /// compute alike.
    RenderPass { pass_index: usize },

    /// A single dispatch of a compute pass.
    Dispatch { pass_index: usize, dispatch_index: u32 },
}

impl fmt::Display for ScopeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScopeKind::RenderPass { pass_index } => write!(f, "render pass {}", pass_index),
            ScopeKind::Dispatch {
                pass_index,
                dispatch_index,
            } => write!(
                f,
                "dispatch {} of compute pass {}",
                dispatch_index, pass_index,
            ),
        }
    }
}

/// Where a texture usage came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UsageSource {
    /// An attachment of the render pass.
    Attachment(AttachmentSlot),

    /// A binding of a bind group.
    BindGroup {
        /// The bind group slot the bind group was set at.
        slot: u32,

        /// The binding number within the bind group.
        binding: u32,

        /// Whether the binding is visible to a shader stage the pass can invoke.
        visible: bool,
    },
}

/// Locates a command inside a render bundle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BundleUseRef {
    /// The index of the bundle within its execute-bundles command.
    pub bundle_index: usize,

    /// The index of the command within the bundle.
    pub command_index: usize,
}

/// Refers to the command that caused a texture usage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct UsageRef {
    /// The index of the command in the command buffer.
    pub command_index: usize,

    /// If the usage comes from a render bundle, the location of the command in the bundle.
    pub bundle_use_ref: Option<BundleUseRef>,

    /// What the usage comes from.
    pub source: UsageSource,
}

/// A single recorded usage.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UsageRecord {
    pub range: SubresourceRange,
    pub kind: UsageKind,
    pub use_ref: UsageRef,
}

#[derive(Debug)]
struct TextureUsages {
    texture: Arc<Texture>,
    records: SmallVec<[UsageRecord; 4]>,
}

/// Collects the texture usages of one validation scope.
#[derive(Debug)]
pub struct UsageScope {
    kind: ScopeKind,
    // Kept in the order textures were first used, so that conflicts are reported
    // deterministically.
    textures: Vec<TextureUsages>,
    texture_indices: HashMap<NonZero<u64>, usize>,
}

impl UsageScope {
    /// Creates an empty scope.
    #[inline]
    pub fn new(kind: ScopeKind) -> Self {
        UsageScope {
            kind,
            textures: Vec::new(),
            texture_indices: HashMap::default(),
        }
    }

    /// Returns the kind of the scope.
    #[inline]
    pub fn kind(&self) -> ScopeKind {
        self.kind
    }

    /// Returns the number of recorded usages.
    #[inline]
    pub fn len(&self) -> usize {
        self.textures.iter().map(|usages| usages.records.len()).sum()
    }

    /// Returns whether nothing was recorded.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.textures.is_empty()
    }

    /// Records a usage of the whole range of `view`.
    #[inline]
    pub fn record(&mut self, view: &TextureView, kind: UsageKind, use_ref: UsageRef) {
        self.record_range(view.texture(), view.subresource_range().clone(), kind, use_ref);
    }

    /// Records a usage of `range` of `texture`.
    ///
    /// A usage identical in range and kind to one already recorded is skipped, unless it is a
    /// `RenderTarget` usage. Skipping never changes the outcome of validation, because
    /// `ReadOnly` and `WriteOnlyStorage` are compatible with themselves.
    pub fn record_range(
        &mut self,
        texture: &Arc<Texture>,
        range: SubresourceRange,
        kind: UsageKind,
        use_ref: UsageRef,
    ) {
        debug_assert!(
            !range.mip_levels.is_empty() && range.mip_levels.end <= texture.mip_levels()
        );
        debug_assert!(
            !range.array_layers.is_empty() && range.array_layers.end <= texture.array_layers()
        );

        let index = *self
            .texture_indices
            .entry(texture.id())
            .or_insert_with(|| {
                self.textures.push(TextureUsages {
                    texture: texture.clone(),
                    records: SmallVec::new(),
                });
                self.textures.len() - 1
            });
        let records = &mut self.textures[index].records;

        if kind != UsageKind::RenderTarget
            && records
                .iter()
                .any(|record| record.kind == kind && record.range == range)
        {
            return;
        }

        trace!(
            texture = texture.id().get(),
            ?kind,
            mip_levels = ?range.mip_levels,
            array_layers = ?range.array_layers,
            aspect = ?range.aspect,
            "recorded texture usage"
        );

        records.push(UsageRecord {
            range,
            kind,
            use_ref,
        });
    }

    /// Returns the usages recorded for `texture`, in recording order.
    pub fn usages(&self, texture: &Texture) -> &[UsageRecord] {
        self.texture_indices
            .get(&texture.id())
            .map_or(&[], |&index| &self.textures[index].records)
    }

    /// Checks the scope, returning the first conflict if there is one.
    #[inline]
    pub fn validate(&self) -> Result<(), Conflict> {
        match self.conflicts().next() {
            Some(conflict) => Err(conflict),
            None => Ok(()),
        }
    }

    /// Returns every pair of recorded usages that overlap with incompatible kinds.
    ///
    /// Within a texture, pairs are produced in recording order of the earlier usage, then of the
    /// later one.
    pub fn conflicts(&self) -> impl Iterator<Item = Conflict> + '_ {
        let scope = self.kind;

        self.textures.iter().flat_map(move |usages| {
            let records = &usages.records;

            records.iter().enumerate().flat_map(move |(index, first)| {
                records[index + 1..]
                    .iter()
                    .filter_map(move |second| find_conflict(scope, &usages.texture, first, second))
            })
        })
    }
}

fn find_conflict(
    scope: ScopeKind,
    texture: &Arc<Texture>,
    first: &UsageRecord,
    second: &UsageRecord,
) -> Option<Conflict> {
    if first.kind.is_compatible_with(second.kind) {
        return None;
    }

    let subresource_range = first.range.intersection(&second.range)?;

    Some(Conflict {
        texture: texture.clone(),
        subresource_range,
        first_kind: first.kind,
        second_kind: second.kind,
        first_use: first.use_ref,
        second_use: second.use_ref,
        scope,
    })
}
