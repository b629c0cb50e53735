// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{
    layout::{BindingType, StorageTextureAccess},
    BindGroup,
};
use crate::{command_buffer::usage_scope::UsageKind, shader::ShaderStages, texture::TextureView};
use std::sync::Arc;

/// A concrete texture access implied by one binding of a bind group.
#[derive(Clone, Debug)]
pub struct ResolvedUsage {
    /// The binding number the access comes from.
    pub binding: u32,

    /// The view that is accessed.
    pub view: Arc<TextureView>,

    /// How the view is accessed.
    pub kind: UsageKind,

    /// Whether the binding is visible to a shader stage that the current pass can invoke.
    ///
    /// This is informational only: invisible bindings are validated all the same.
    pub visible: bool,
}

impl BindingType {
    /// Returns how a texture bound to this binding type is accessed.
    #[inline]
    pub const fn usage_kind(self) -> UsageKind {
        match self {
            BindingType::SampledTexture | BindingType::MultisampledTexture => UsageKind::ReadOnly,
            BindingType::StorageTexture {
                access: StorageTextureAccess::ReadOnly,
            } => UsageKind::ReadOnly,
            BindingType::StorageTexture {
                access: StorageTextureAccess::WriteOnly | StorageTextureAccess::ReadWrite,
            } => UsageKind::WriteOnlyStorage,
        }
    }
}

/// Expands `bind_group` into the texture accesses it implies for a pass that can invoke
/// `invocable_stages`.
///
/// Every binding produces exactly one usage, whether or not its visibility intersects
/// `invocable_stages`. Hiding a binding from every stage of the pass must not hide a hazard.
pub fn resolve_bind_group(
    bind_group: &BindGroup,
    invocable_stages: ShaderStages,
) -> impl ExactSizeIterator<Item = ResolvedUsage> + '_ {
    bind_group.bindings().map(move |(layout_entry, view)| ResolvedUsage {
        binding: layout_entry.binding,
        view: view.clone(),
        kind: layout_entry.ty.usage_kind(),
        visible: layout_entry.visibility.intersects(invocable_stages),
    })
}
