// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The entry point of validation.

use super::{state::EncodingState, Command, CommandBuffer, ValidationError};
use crate::NonExhaustive;
use tracing::debug_span;

/// How many hazard conflicts a validation reports.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ConflictReporting {
    /// Stop looking for conflicts after the first one.
    #[default]
    First,

    /// Report every conflicting pair of usages of every scope.
    All,
}

/// Parameters to create a new `Validator`.
#[derive(Clone, Debug)]
pub struct ValidatorCreateInfo {
    /// How many conflicts to report.
    ///
    /// The default value is [`ConflictReporting::First`].
    pub conflict_reporting: ConflictReporting,

    pub _ne: NonExhaustive,
}

impl Default for ValidatorCreateInfo {
    #[inline]
    fn default() -> Self {
        Self {
            conflict_reporting: ConflictReporting::First,
            _ne: NonExhaustive(()),
        }
    }
}

/// Decides whether a recorded command stream is free of texture usage hazards.
///
/// A validator holds no state between calls. The same command stream always gives the same
/// result, and one validator can be shared between threads.
#[derive(Clone, Debug, Default)]
pub struct Validator {
    conflict_reporting: ConflictReporting,
}

impl Validator {
    /// Creates a new `Validator`.
    #[inline]
    pub fn new(create_info: ValidatorCreateInfo) -> Self {
        let ValidatorCreateInfo {
            conflict_reporting,
            _ne: _,
        } = create_info;

        Validator { conflict_reporting }
    }

    /// Returns how many conflicts the validator reports.
    #[inline]
    pub fn conflict_reporting(&self) -> ConflictReporting {
        self.conflict_reporting
    }

    /// Validates `command_buffer`.
    #[inline]
    pub fn finalize(&self, command_buffer: &CommandBuffer) -> Result<(), ValidationError> {
        self.validate(command_buffer.commands())
    }

    /// Validates a command stream.
    ///
    /// Structural errors and missing pipelines are returned as soon as they are found, and take
    /// precedence over hazard conflicts anywhere in the stream.
    pub fn validate(&self, commands: &[Command]) -> Result<(), ValidationError> {
        let _span = debug_span!("validate", commands = commands.len()).entered();
        let mut state = EncodingState::new(self.conflict_reporting);

        for (command_index, command) in commands.iter().enumerate() {
            state.command(command_index, command)?;
        }

        state.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::{ConflictReporting, Validator, ValidatorCreateInfo};
    use crate::{
        bind_group::{
            layout::{BindingType, StorageTextureAccess},
            BindGroup, BindGroupCreateInfo, BindGroupEntry,
        },
        command_buffer::{RecordingCommandBuffer, ScopeKind, ValidationError},
        pipeline::Pipeline,
        shader::ShaderStages,
        tests::{color_texture, layout, view},
    };

    #[test]
    fn empty_stream_is_valid() {
        assert!(Validator::default().validate(&[]).is_ok());
    }

    #[test]
    fn reporting_modes() {
        let texture = color_texture(1, 1);
        let whole = view(&texture, 0..1, 0..1);
        let layout = layout(&[
            (0, ShaderStages::COMPUTE, BindingType::SampledTexture),
            (
                1,
                ShaderStages::COMPUTE,
                BindingType::StorageTexture {
                    access: StorageTextureAccess::WriteOnly,
                },
            ),
        ]);
        let bind_group = BindGroup::new(
            layout,
            BindGroupCreateInfo {
                entries: vec![
                    BindGroupEntry::new(0, whole.clone()),
                    BindGroupEntry::new(1, whole),
                ],
                ..Default::default()
            },
        )
        .unwrap();

        // Two dispatches, each with the same conflict.
        let mut builder = RecordingCommandBuffer::new();
        builder
            .begin_compute_pass()
            .set_pipeline(Pipeline::compute())
            .set_bind_group(0, bind_group)
            .dispatch([1, 1, 1])
            .dispatch([1, 1, 1])
            .end_pass();
        let command_buffer = builder.end();

        let first = command_buffer.finalize().unwrap_err();
        let [conflict] = first.conflicts() else {
            panic!("expected exactly one conflict");
        };
        assert_eq!(
            conflict.scope,
            ScopeKind::Dispatch {
                pass_index: 0,
                dispatch_index: 0,
            },
        );

        let all = Validator::new(ValidatorCreateInfo {
            conflict_reporting: ConflictReporting::All,
            ..Default::default()
        })
        .finalize(&command_buffer)
        .unwrap_err();
        let scopes: Vec<_> = all.conflicts().iter().map(|c| c.scope).collect();
        assert_eq!(
            scopes,
            [
                ScopeKind::Dispatch {
                    pass_index: 0,
                    dispatch_index: 0,
                },
                ScopeKind::Dispatch {
                    pass_index: 0,
                    dispatch_index: 1,
                },
            ],
        );
        assert!(matches!(all, ValidationError::HazardConflict { .. }));
    }
}
