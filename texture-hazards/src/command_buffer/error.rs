// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

use super::{
    usage_scope::{BundleUseRef, ScopeKind, UsageKind, UsageRef},
    AttachmentSlot,
};
use crate::{
    pipeline::PipelineBindPoint,
    texture::{SubresourceRange, Texture, TextureUsage},
};
use std::{error::Error, fmt, sync::Arc};

/// Error returned when finalizing a command buffer fails.
///
/// Every variant is terminal: the command buffer is rejected as a whole.
#[derive(Clone, Debug)]
pub enum ValidationError {
    /// Two usages in the same scope overlap with incompatible kinds.
    ///
    /// Contains at least one conflict. How many are listed depends on the validator's
    /// [`ConflictReporting`](super::validator::ConflictReporting).
    HazardConflict { conflicts: Vec<Conflict> },

    /// A draw or dispatch was recorded while no pipeline was set.
    MissingPipeline {
        command_index: usize,
        command_name: &'static str,
        bundle_use_ref: Option<BundleUseRef>,
    },

    /// A command was recorded where it is not allowed.
    StructuralMisuse {
        command_index: usize,
        command_name: &'static str,
        bundle_use_ref: Option<BundleUseRef>,
        misuse: StructuralMisuse,
    },
}

impl ValidationError {
    /// Returns the conflicts if this is a `HazardConflict`.
    #[inline]
    pub fn conflicts(&self) -> &[Conflict] {
        match self {
            ValidationError::HazardConflict { conflicts } => conflicts,
            _ => &[],
        }
    }
}

impl Error for ValidationError {}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::HazardConflict { conflicts } => match conflicts.as_slice() {
                [conflict] => write!(f, "{}", conflict),
                [first, rest @ ..] => write!(
                    f,
                    "{} (and {} more conflicts)",
                    first,
                    rest.len(),
                ),
                [] => write!(f, "conflicting texture usages"),
            },
            ValidationError::MissingPipeline {
                command_index,
                command_name,
                bundle_use_ref,
            } => {
                write!(f, "`{}` ", command_name)?;
                write_location(f, *command_index, *bundle_use_ref)?;
                write!(f, " was recorded without a pipeline being set")
            }
            ValidationError::StructuralMisuse {
                command_index,
                command_name,
                bundle_use_ref,
                misuse,
            } => {
                write!(f, "`{}` ", command_name)?;
                write_location(f, *command_index, *bundle_use_ref)?;
                write!(f, " is not allowed: {}", misuse)
            }
        }
    }
}

fn write_location(
    f: &mut fmt::Formatter<'_>,
    command_index: usize,
    bundle_use_ref: Option<BundleUseRef>,
) -> fmt::Result {
    match bundle_use_ref {
        Some(BundleUseRef {
            bundle_index,
            command_index: bundle_command_index,
        }) => write!(
            f,
            "(command {} of bundle {} executed by command {})",
            bundle_command_index, bundle_index, command_index,
        ),
        None => write!(f, "(command {})", command_index),
    }
}

/// Two texture usages of the same scope that may not overlap.
#[derive(Clone, Debug)]
pub struct Conflict {
    /// The texture both usages belong to.
    pub texture: Arc<Texture>,

    /// The subresources both usages touch.
    pub subresource_range: SubresourceRange,

    /// The kind of the usage that was recorded first.
    pub first_kind: UsageKind,

    /// The kind of the usage that was recorded second.
    pub second_kind: UsageKind,

    pub first_use: UsageRef,
    pub second_use: UsageRef,

    /// The scope the usages were recorded in.
    pub scope: ScopeKind,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "`{:?}` usage (command {}) and `{:?}` usage (command {}) of texture {} overlap on mip \
            levels {:?}, array layers {:?} ({:?}) in {}",
            self.first_kind,
            self.first_use.command_index,
            self.second_kind,
            self.second_use.command_index,
            self.texture.id(),
            self.subresource_range.mip_levels,
            self.subresource_range.array_layers,
            self.subresource_range.aspect,
            self.scope,
        )
    }
}

/// A command recorded in a place where the encoding rules forbid it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StructuralMisuse {
    /// A pass was begun while another pass was still open.
    NestedPass,

    /// A command that needs an open pass was recorded outside of any pass.
    NotInPass,

    /// A draw was recorded outside of a render pass.
    DrawOutsideRenderPass,

    /// A dispatch was recorded outside of a compute pass.
    DispatchOutsideComputePass,

    /// Render bundles were executed inside a compute pass.
    BundleInComputePass,

    /// A render bundle contains a command that only a pass can record: beginning or ending a
    /// pass (and with it, binding render targets), dispatching, or executing bundles.
    PassCommandInBundle,

    /// A pipeline was set in a pass of the other type.
    PipelineBindPointMismatch {
        required: PipelineBindPoint,
        provided: PipelineBindPoint,
    },

    /// An attachment of a render pass is unusable.
    InvalidAttachment {
        slot: AttachmentSlot,
        problem: AttachmentProblem,
    },

    /// The command buffer was finalized while a pass was still open.
    UnterminatedPass,
}

impl fmt::Display for StructuralMisuse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NestedPass => write!(f, "a pass is already open"),
            Self::NotInPass => write!(f, "no pass is open"),
            Self::DrawOutsideRenderPass => write!(f, "draws are only allowed in a render pass"),
            Self::DispatchOutsideComputePass => {
                write!(f, "dispatches are only allowed in a compute pass")
            }
            Self::BundleInComputePass => {
                write!(f, "render bundles cannot be executed in a compute pass")
            }
            Self::PassCommandInBundle => {
                write!(f, "render bundles cannot contain pass-level commands")
            }
            Self::PipelineBindPointMismatch { required, provided } => write!(
                f,
                "the pass needs a `{:?}` pipeline, but a `{:?}` pipeline was provided",
                required, provided,
            ),
            Self::InvalidAttachment { slot, problem } => {
                write!(f, "the {} attachment {}", slot, problem)
            }
            Self::UnterminatedPass => write!(f, "the pass was never ended"),
        }
    }
}

/// Why an attachment was rejected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttachmentProblem {
    /// The view covers more than one mip level or array layer.
    MultipleSubresources,

    /// The texture was not created with the attachment usage.
    MissingUsage { required_usage: TextureUsage },

    /// A depth/stencil texture was used as a color attachment, or the other way around.
    WrongAspects,
}

impl fmt::Display for AttachmentProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MultipleSubresources => {
                write!(f, "covers more than one mip level or array layer")
            }
            Self::MissingUsage { required_usage } => write!(
                f,
                "belongs to a texture that was not created with the `{:?}` usage",
                required_usage,
            ),
            Self::WrongAspects => write!(f, "has the wrong aspects for its slot"),
        }
    }
}
