// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Recording of commands, and validation of the recorded command stream.
//!
//! Commands are recorded into a [`RecordingCommandBuffer`]. Recording never fails: every rule is
//! checked when the resulting [`CommandBuffer`] is finalized, which walks the commands in order
//! and returns the first fatal error, or the hazard conflicts that were found.
//!
//! ```
//! use texture_hazards::{
//!     bind_group::{
//!         layout::{
//!             BindGroupLayout, BindGroupLayoutCreateInfo, BindGroupLayoutEntry, BindingType,
//!         },
//!         BindGroup, BindGroupCreateInfo, BindGroupEntry,
//!     },
//!     command_buffer::{RecordingCommandBuffer, RenderPassBeginInfo, RenderPassColorAttachment},
//!     pipeline::Pipeline,
//!     shader::ShaderStages,
//!     texture::{Texture, TextureCreateInfo, TextureUsage, TextureView},
//!     ValidationError,
//! };
//!
//! let texture = Texture::new(TextureCreateInfo {
//!     usage: TextureUsage::SAMPLED | TextureUsage::COLOR_ATTACHMENT,
//!     ..Default::default()
//! })
//! .unwrap();
//! let view = TextureView::new_default(texture).unwrap();
//!
//! let layout = BindGroupLayout::new(BindGroupLayoutCreateInfo {
//!     entries: vec![BindGroupLayoutEntry {
//!         binding: 0,
//!         visibility: ShaderStages::FRAGMENT,
//!         ty: BindingType::SampledTexture,
//!     }],
//!     ..Default::default()
//! })
//! .unwrap();
//! let bind_group = BindGroup::new(
//!     layout,
//!     BindGroupCreateInfo {
//!         entries: vec![BindGroupEntry::new(0, view.clone())],
//!         ..Default::default()
//!     },
//! )
//! .unwrap();
//!
//! let mut builder = RecordingCommandBuffer::new();
//! builder
//!     .begin_render_pass(RenderPassBeginInfo {
//!         color_attachments: vec![Some(RenderPassColorAttachment::new(view))],
//!         ..Default::default()
//!     })
//!     .set_pipeline(Pipeline::graphics())
//!     .set_bind_group(0, bind_group)
//!     .draw(3, 1)
//!     .end_pass();
//!
//! // The texture is sampled while it is being rendered to.
//! let command_buffer = builder.end();
//! assert!(matches!(
//!     command_buffer.finalize(),
//!     Err(ValidationError::HazardConflict { .. }),
//! ));
//! ```

pub use self::{
    bundle::{RenderBundle, RenderBundleEncoder},
    error::{AttachmentProblem, Conflict, StructuralMisuse, ValidationError},
    usage_scope::{
        BundleUseRef, ScopeKind, UsageKind, UsageRecord, UsageRef, UsageScope, UsageSource,
    },
    validator::{ConflictReporting, Validator, ValidatorCreateInfo},
};
use crate::{bind_group::BindGroup, pipeline::Pipeline, texture::TextureView, NonExhaustive};
use std::{fmt, sync::Arc};

pub mod bundle;
mod error;
mod state;
pub mod usage_scope;
pub mod validator;

/// A command recorded into a command buffer or a render bundle.
#[derive(Clone, Debug)]
pub enum Command {
    /// Begins a render pass, binding its attachments.
    BeginRenderPass(RenderPassBeginInfo),

    /// Begins a compute pass.
    BeginComputePass,

    /// Sets the pipeline used by subsequent draws or dispatches.
    SetPipeline(Arc<Pipeline>),

    /// Binds a bind group at a slot, replacing the previous occupant.
    SetBindGroup {
        index: u32,
        bind_group: Arc<BindGroup>,
    },

    /// Draws primitives in a render pass.
    Draw {
        vertex_count: u32,
        instance_count: u32,
    },

    /// Dispatches compute work groups in a compute pass.
    Dispatch { group_counts: [u32; 3] },

    /// Replays render bundles in a render pass.
    ExecuteBundles(Vec<Arc<RenderBundle>>),

    /// Ends the current pass.
    EndPass,
}

impl Command {
    /// Returns the name of the command, for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Command::BeginRenderPass(_) => "begin_render_pass",
            Command::BeginComputePass => "begin_compute_pass",
            Command::SetPipeline(_) => "set_pipeline",
            Command::SetBindGroup { .. } => "set_bind_group",
            Command::Draw { .. } => "draw",
            Command::Dispatch { .. } => "dispatch",
            Command::ExecuteBundles(_) => "execute_bundles",
            Command::EndPass => "end_pass",
        }
    }
}

/// Identifies an attachment of a render pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AttachmentSlot {
    /// The color attachment at `index`.
    Color { index: u32 },

    /// The resolve target of the color attachment at `index`.
    Resolve { index: u32 },

    /// The depth/stencil attachment.
    DepthStencil,
}

impl fmt::Display for AttachmentSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Color { index } => write!(f, "color {}", index),
            Self::Resolve { index } => write!(f, "resolve {}", index),
            Self::DepthStencil => write!(f, "depth/stencil"),
        }
    }
}

/// Parameters to begin a render pass.
#[derive(Clone, Debug)]
pub struct RenderPassBeginInfo {
    /// The color attachments. `None` leaves the attachment at that index unused.
    ///
    /// The default value is empty.
    pub color_attachments: Vec<Option<RenderPassColorAttachment>>,

    /// The depth/stencil attachment, if any.
    ///
    /// The default value is `None`.
    pub depth_stencil_attachment: Option<RenderPassDepthStencilAttachment>,

    pub _ne: NonExhaustive,
}

impl Default for RenderPassBeginInfo {
    #[inline]
    fn default() -> Self {
        Self {
            color_attachments: Vec::new(),
            depth_stencil_attachment: None,
            _ne: NonExhaustive(()),
        }
    }
}

/// A color attachment of a render pass.
#[derive(Clone, Debug)]
pub struct RenderPassColorAttachment {
    /// The view that is rendered to.
    pub view: Arc<TextureView>,

    /// The view that multisampled results are resolved into.
    ///
    /// The default value is `None`.
    pub resolve_target: Option<Arc<TextureView>>,
}

impl RenderPassColorAttachment {
    #[inline]
    pub fn new(view: Arc<TextureView>) -> Self {
        Self {
            view,
            resolve_target: None,
        }
    }
}

/// The depth/stencil attachment of a render pass.
#[derive(Clone, Debug)]
pub struct RenderPassDepthStencilAttachment {
    pub view: Arc<TextureView>,

    /// Whether the depth aspect is only read by the pass.
    ///
    /// The default value is `false`.
    pub depth_read_only: bool,

    /// Whether the stencil aspect is only read by the pass.
    ///
    /// The default value is `false`.
    pub stencil_read_only: bool,
}

impl RenderPassDepthStencilAttachment {
    #[inline]
    pub fn new(view: Arc<TextureView>) -> Self {
        Self {
            view,
            depth_read_only: false,
            stencil_read_only: false,
        }
    }
}

/// Records commands into a [`CommandBuffer`].
#[derive(Debug, Default)]
pub struct RecordingCommandBuffer {
    commands: Vec<Command>,
}

impl RecordingCommandBuffer {
    /// Creates an empty command buffer builder.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an arbitrary command.
    #[inline]
    pub fn record(&mut self, command: Command) -> &mut Self {
        self.commands.push(command);
        self
    }

    #[inline]
    pub fn begin_render_pass(&mut self, begin_info: RenderPassBeginInfo) -> &mut Self {
        self.record(Command::BeginRenderPass(begin_info))
    }

    #[inline]
    pub fn begin_compute_pass(&mut self) -> &mut Self {
        self.record(Command::BeginComputePass)
    }

    #[inline]
    pub fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) -> &mut Self {
        self.record(Command::SetPipeline(pipeline))
    }

    #[inline]
    pub fn set_bind_group(&mut self, index: u32, bind_group: Arc<BindGroup>) -> &mut Self {
        self.record(Command::SetBindGroup { index, bind_group })
    }

    #[inline]
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) -> &mut Self {
        self.record(Command::Draw {
            vertex_count,
            instance_count,
        })
    }

    #[inline]
    pub fn dispatch(&mut self, group_counts: [u32; 3]) -> &mut Self {
        self.record(Command::Dispatch { group_counts })
    }

    #[inline]
    pub fn execute_bundles(
        &mut self,
        bundles: impl IntoIterator<Item = Arc<RenderBundle>>,
    ) -> &mut Self {
        self.record(Command::ExecuteBundles(bundles.into_iter().collect()))
    }

    #[inline]
    pub fn end_pass(&mut self) -> &mut Self {
        self.record(Command::EndPass)
    }

    /// Finishes recording.
    #[inline]
    pub fn end(self) -> CommandBuffer {
        CommandBuffer {
            commands: self.commands,
        }
    }
}

/// A fully recorded command buffer.
#[derive(Clone, Debug)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    /// Returns the recorded commands, in recording order.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Validates the command buffer with a default [`Validator`].
    ///
    /// The command buffer is not modified, so finalizing it again gives the same result.
    #[inline]
    pub fn finalize(&self) -> Result<(), ValidationError> {
        Validator::default().finalize(self)
    }
}
