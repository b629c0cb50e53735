// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Static validation of texture usage hazards in recorded GPU command buffers.
//!
//! When a command buffer is finalized, this crate decides whether the passes and draw/dispatch
//! operations recorded into it access the same texture subresources in incompatible ways, for
//! example sampling a mip level that is also being rendered to.
//!
//! # Brief summary
//!
//! - A [`Texture`](crate::texture::Texture) describes the shape of a texture: its extent, mip
//!   levels, array layers, aspects, sample count and the usages it was created with.
//!
//! - A [`TextureView`](crate::texture::view::TextureView) selects a
//!   [`SubresourceRange`](crate::texture::subresource::SubresourceRange) of a texture. Two views
//!   of the same texture may alias.
//!
//! - A [`BindGroup`](crate::bind_group::BindGroup) binds texture views to the entries of a
//!   [`BindGroupLayout`](crate::bind_group::layout::BindGroupLayout). Each entry declares which
//!   shader stages can see it and how the texture is accessed.
//!
//! - A [`RecordingCommandBuffer`](crate::command_buffer::RecordingCommandBuffer) records render
//!   passes, compute passes, bind group changes, draws, dispatches and the execution of
//!   [`RenderBundle`](crate::command_buffer::bundle::RenderBundle)s into a
//!   [`CommandBuffer`](crate::command_buffer::CommandBuffer).
//!
//! - The [`Validator`](crate::command_buffer::validator::Validator) walks the recorded commands and
//!   returns either `Ok` or a [`ValidationError`](crate::command_buffer::ValidationError).
//!
//! # Validation scopes
//!
//! Hazards are only detected between usages that belong to the same *scope*. A render pass is a
//! single scope that accumulates every binding that was ever set during the pass, including
//! bindings that were later replaced, plus the pass's attachments and the bindings set by executed
//! bundles. A compute pass opens a fresh scope for each dispatch, containing only the bind groups
//! that are bound at the moment of the dispatch.
//!
//! Validation is synchronous and keeps no global state, so independent command buffers can be
//! validated on different threads at the same time.

pub use crate::command_buffer::{
    validator::{Validator, ValidatorCreateInfo},
    CommandBuffer, RecordingCommandBuffer, ValidationError,
};

mod macros;

pub mod bind_group;
pub mod command_buffer;
pub mod pipeline;
pub mod shader;
pub mod texture;

#[cfg(test)]
mod tests;

/// A helper type for non-exhaustive structs.
///
/// This type cannot be constructed outside this crate. Structures with a field of this type can
/// only be constructed by calling a constructor function or `Default::default()`. The effect is
/// similar to the standard Rust `#[non_exhaustive]` attribute, except that it does not prevent
/// update syntax from being used.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)] // add traits as needed
pub struct NonExhaustive(pub(crate) ());

