// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Pipelines, as far as the hazard validator is concerned.
//!
//! The validator does not reflect on shaders: a pipeline only needs to exist and to match the
//! kind of pass it is bound in. Which bindings a pipeline actually reads is never used to skip a
//! binding during validation.

use crate::{macros::impl_id_counter, NonExhaustive};
use std::{num::NonZero, sync::Arc};

/// The type of pass a pipeline can be bound in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PipelineBindPoint {
    /// A render pipeline, bound inside render passes and render bundles.
    Graphics,

    /// A compute pipeline, bound inside compute passes.
    Compute,
}

/// Parameters to create a new `Pipeline`.
#[derive(Clone, Debug)]
pub struct PipelineCreateInfo {
    /// The type of pass the pipeline is bound in.
    ///
    /// The default value is [`PipelineBindPoint::Graphics`].
    pub bind_point: PipelineBindPoint,

    /// A name used in diagnostics.
    ///
    /// The default value is `None`.
    pub label: Option<String>,

    pub _ne: NonExhaustive,
}

impl Default for PipelineCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            bind_point: PipelineBindPoint::Graphics,
            label: None,
            _ne: NonExhaustive(()),
        }
    }
}

#[derive(Debug)]
pub struct Pipeline {
    id: NonZero<u64>,
    bind_point: PipelineBindPoint,
    label: Option<String>,
}

impl Pipeline {
    #[inline]
    pub fn new(create_info: PipelineCreateInfo) -> Arc<Pipeline> {
        let PipelineCreateInfo {
            bind_point,
            label,
            _ne: _,
        } = create_info;

        Arc::new(Pipeline {
            id: Self::next_id(),
            bind_point,
            label,
        })
    }

    /// Shortcut for a render pipeline without a label.
    #[inline]
    pub fn graphics() -> Arc<Pipeline> {
        Self::new(PipelineCreateInfo::default())
    }

    /// Shortcut for a compute pipeline without a label.
    #[inline]
    pub fn compute() -> Arc<Pipeline> {
        Self::new(PipelineCreateInfo {
            bind_point: PipelineBindPoint::Compute,
            ..Default::default()
        })
    }

    #[inline]
    pub fn bind_point(&self) -> PipelineBindPoint {
        self.bind_point
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

impl_id_counter!(Pipeline);
