// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Render bundles: pre-recorded command lists replayed inside a render pass.
//!
//! A bundle is only a list of commands. When it is executed, its commands are replayed through
//! the same code that handles commands recorded directly in the pass, so every texture usage of
//! the bundle lands in the enclosing render pass's scope.

use super::Command;
use crate::{bind_group::BindGroup, macros::impl_id_counter, pipeline::Pipeline};
use std::{num::NonZero, sync::Arc};

/// A recorded list of commands that can be executed in render passes.
#[derive(Debug)]
pub struct RenderBundle {
    id: NonZero<u64>,
    commands: Vec<Command>,
}

impl RenderBundle {
    /// Creates a bundle from a list of commands.
    ///
    /// Any command can be put in a bundle, but commands other than `SetPipeline`,
    /// `SetBindGroup` and `Draw` make the command buffer that executes the bundle invalid.
    #[inline]
    pub fn new(commands: impl IntoIterator<Item = Command>) -> Arc<RenderBundle> {
        Arc::new(RenderBundle {
            id: Self::next_id(),
            commands: commands.into_iter().collect(),
        })
    }

    /// Returns the commands of the bundle, in recording order.
    #[inline]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }
}

impl_id_counter!(RenderBundle);

/// Records the commands of a [`RenderBundle`].
#[derive(Debug, Default)]
pub struct RenderBundleEncoder {
    commands: Vec<Command>,
}

impl RenderBundleEncoder {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn set_pipeline(&mut self, pipeline: Arc<Pipeline>) -> &mut Self {
        self.commands.push(Command::SetPipeline(pipeline));
        self
    }

    #[inline]
    pub fn set_bind_group(&mut self, index: u32, bind_group: Arc<BindGroup>) -> &mut Self {
        self.commands
            .push(Command::SetBindGroup { index, bind_group });
        self
    }

    #[inline]
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32) -> &mut Self {
        self.commands.push(Command::Draw {
            vertex_count,
            instance_count,
        });
        self
    }

    /// Finishes recording the bundle.
    #[inline]
    pub fn finish(self) -> Arc<RenderBundle> {
        RenderBundle::new(self.commands)
    }
}
