// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! The encoding state machine that drives usage scopes.
//!
//! Render and compute passes use two different scope lifetimes:
//!
//! - A render pass owns one scope from begin to end. Attachments are recorded when the pass
//!   begins, and every bind group is recorded as soon as it is set, so bind groups that are later
//!   replaced still take part in validation.
//! - A compute pass owns no scope. Each dispatch builds a fresh scope from the bind groups bound
//!   at that moment and validates it immediately.

use super::{
    error::{AttachmentProblem, Conflict, StructuralMisuse, ValidationError},
    usage_scope::{BundleUseRef, ScopeKind, UsageKind, UsageRef, UsageScope, UsageSource},
    validator::ConflictReporting,
    AttachmentSlot, Command, RenderPassBeginInfo,
};
use crate::{
    bind_group::{resolve_bind_group, BindGroup},
    pipeline::{Pipeline, PipelineBindPoint},
    shader::ShaderStages,
    texture::{AspectSelector, SubresourceRange, TextureAspects, TextureView},
};
use foldhash::HashMap;
use smallvec::SmallVec;
use std::sync::Arc;
use tracing::{debug, trace};

/// Where a command sits in the recorded stream.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Location {
    command_index: usize,
    bundle_use_ref: Option<BundleUseRef>,
}

impl Location {
    #[inline]
    fn direct(command_index: usize) -> Self {
        Location {
            command_index,
            bundle_use_ref: None,
        }
    }

    fn usage_ref(self, source: UsageSource) -> UsageRef {
        UsageRef {
            command_index: self.command_index,
            bundle_use_ref: self.bundle_use_ref,
            source,
        }
    }

    fn misuse(self, command: &Command, misuse: StructuralMisuse) -> ValidationError {
        ValidationError::StructuralMisuse {
            command_index: self.command_index,
            command_name: command.name(),
            bundle_use_ref: self.bundle_use_ref,
            misuse,
        }
    }

    fn missing_pipeline(self, command: &Command) -> ValidationError {
        ValidationError::MissingPipeline {
            command_index: self.command_index,
            command_name: command.name(),
            bundle_use_ref: self.bundle_use_ref,
        }
    }
}

#[derive(Clone, Debug)]
struct BoundBindGroup {
    bind_group: Arc<BindGroup>,
    location: Location,
}

/// The pipeline and bind group slot table of a pass or of a bundle being replayed.
#[derive(Debug, Default)]
struct BindingState {
    pipeline: Option<Arc<Pipeline>>,
    bind_groups: HashMap<u32, BoundBindGroup>,
}

impl BindingState {
    fn set_pipeline(
        &mut self,
        pipeline: &Arc<Pipeline>,
        required: PipelineBindPoint,
    ) -> Result<(), StructuralMisuse> {
        if pipeline.bind_point() != required {
            return Err(StructuralMisuse::PipelineBindPointMismatch {
                required,
                provided: pipeline.bind_point(),
            });
        }

        self.pipeline = Some(pipeline.clone());

        Ok(())
    }

    fn set_bind_group(&mut self, index: u32, bind_group: &Arc<BindGroup>, location: Location) {
        self.bind_groups.insert(
            index,
            BoundBindGroup {
                bind_group: bind_group.clone(),
                location,
            },
        );
    }

    /// Returns the bound bind groups, sorted by slot.
    fn bound(&self) -> SmallVec<[(u32, &BoundBindGroup); 4]> {
        let mut bound: SmallVec<[_; 4]> = self
            .bind_groups
            .iter()
            .map(|(&index, bound)| (index, bound))
            .collect();
        bound.sort_unstable_by_key(|&(index, _)| index);

        bound
    }

    fn reset(&mut self) {
        self.pipeline = None;
        self.bind_groups.clear();
    }
}

#[derive(Debug)]
struct RenderPassState {
    begin_index: usize,
    scope: UsageScope,
    bindings: BindingState,
}

#[derive(Debug)]
struct ComputePassState {
    pass_index: usize,
    begin_index: usize,
    dispatch_count: u32,
    bindings: BindingState,
}

#[derive(Debug, Default)]
enum PassState {
    #[default]
    Idle,
    Render(RenderPassState),
    Compute(ComputePassState),
}

/// Walks a command stream, one command at a time.
///
/// A fatal error is returned as soon as the offending command is seen. Hazard conflicts are
/// collected and only returned by [`finish`](Self::finish), so a fatal error anywhere in the
/// stream takes precedence over them.
#[derive(Debug)]
pub(super) struct EncodingState {
    conflict_reporting: ConflictReporting,
    pass: PassState,
    pass_count: usize,
    conflicts: Vec<Conflict>,
}

impl EncodingState {
    pub(super) fn new(conflict_reporting: ConflictReporting) -> Self {
        EncodingState {
            conflict_reporting,
            pass: PassState::Idle,
            pass_count: 0,
            conflicts: Vec::new(),
        }
    }

    pub(super) fn command(
        &mut self,
        command_index: usize,
        command: &Command,
    ) -> Result<(), ValidationError> {
        let location = Location::direct(command_index);

        match command {
            Command::BeginRenderPass(begin_info) => {
                self.check_idle(location, command)?;
                let pass_index = self.next_pass_index();
                let mut scope = UsageScope::new(ScopeKind::RenderPass { pass_index });
                record_attachments(&mut scope, begin_info, location)
                    .map_err(|misuse| location.misuse(command, misuse))?;

                debug!(pass_index, command_index, "began render pass");

                self.pass = PassState::Render(RenderPassState {
                    begin_index: command_index,
                    scope,
                    bindings: BindingState::default(),
                });
            }
            Command::BeginComputePass => {
                self.check_idle(location, command)?;
                let pass_index = self.next_pass_index();

                debug!(pass_index, command_index, "began compute pass");

                self.pass = PassState::Compute(ComputePassState {
                    pass_index,
                    begin_index: command_index,
                    dispatch_count: 0,
                    bindings: BindingState::default(),
                });
            }
            Command::ExecuteBundles(bundles) => match &mut self.pass {
                PassState::Idle => {
                    return Err(location.misuse(command, StructuralMisuse::NotInPass));
                }
                PassState::Compute(_) => {
                    return Err(location.misuse(command, StructuralMisuse::BundleInComputePass));
                }
                PassState::Render(render_pass) => {
                    for (bundle_index, bundle) in bundles.iter().enumerate() {
                        trace!(command_index, bundle_index, "replaying render bundle");

                        // A bundle does not see the pass's pipeline and bind groups.
                        let mut bundle_bindings = BindingState::default();

                        for (bundle_command_index, bundle_command) in
                            bundle.commands().iter().enumerate()
                        {
                            let location = Location {
                                command_index,
                                bundle_use_ref: Some(BundleUseRef {
                                    bundle_index,
                                    command_index: bundle_command_index,
                                }),
                            };

                            render_command(
                                &mut render_pass.scope,
                                &mut bundle_bindings,
                                location,
                                bundle_command,
                            )?;
                        }
                    }

                    render_pass.bindings.reset();
                }
            },
            Command::Dispatch { .. } => match &mut self.pass {
                PassState::Idle => {
                    return Err(location.misuse(command, StructuralMisuse::NotInPass));
                }
                PassState::Render(_) => {
                    return Err(
                        location.misuse(command, StructuralMisuse::DispatchOutsideComputePass)
                    );
                }
                PassState::Compute(compute_pass) => {
                    if compute_pass.bindings.pipeline.is_none() {
                        return Err(location.missing_pipeline(command));
                    }

                    let scope = dispatch_scope(compute_pass);
                    compute_pass.dispatch_count += 1;
                    self.close_scope(scope);
                }
            },
            Command::EndPass => match std::mem::take(&mut self.pass) {
                PassState::Idle => {
                    return Err(location.misuse(command, StructuralMisuse::NotInPass));
                }
                PassState::Render(render_pass) => {
                    debug!(
                        scope = %render_pass.scope.kind(),
                        usages = render_pass.scope.len(),
                        command_index,
                        "ended render pass",
                    );
                    self.close_scope(render_pass.scope);
                }
                PassState::Compute(compute_pass) => {
                    debug!(
                        pass_index = compute_pass.pass_index,
                        dispatches = compute_pass.dispatch_count,
                        command_index,
                        "ended compute pass",
                    );
                }
            },
            Command::SetPipeline(_) | Command::SetBindGroup { .. } | Command::Draw { .. } => {
                match &mut self.pass {
                    PassState::Idle => {
                        return Err(location.misuse(command, StructuralMisuse::NotInPass));
                    }
                    PassState::Render(render_pass) => {
                        render_command(
                            &mut render_pass.scope,
                            &mut render_pass.bindings,
                            location,
                            command,
                        )?;
                    }
                    PassState::Compute(compute_pass) => {
                        compute_command(&mut compute_pass.bindings, location, command)?;
                    }
                }
            }
        }

        Ok(())
    }

    /// Ends the walk, returning the collected conflicts if there are any.
    pub(super) fn finish(self) -> Result<(), ValidationError> {
        let open_pass = match &self.pass {
            PassState::Idle => None,
            PassState::Render(render_pass) => {
                Some((render_pass.begin_index, "begin_render_pass"))
            }
            PassState::Compute(compute_pass) => {
                Some((compute_pass.begin_index, "begin_compute_pass"))
            }
        };

        if let Some((command_index, command_name)) = open_pass {
            return Err(ValidationError::StructuralMisuse {
                command_index,
                command_name,
                bundle_use_ref: None,
                misuse: StructuralMisuse::UnterminatedPass,
            });
        }

        if self.conflicts.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::HazardConflict {
                conflicts: self.conflicts,
            })
        }
    }

    fn check_idle(&self, location: Location, command: &Command) -> Result<(), ValidationError> {
        match self.pass {
            PassState::Idle => Ok(()),
            _ => Err(location.misuse(command, StructuralMisuse::NestedPass)),
        }
    }

    fn next_pass_index(&mut self) -> usize {
        let pass_index = self.pass_count;
        self.pass_count += 1;

        pass_index
    }

    fn close_scope(&mut self, scope: UsageScope) {
        let len_before = self.conflicts.len();

        match self.conflict_reporting {
            ConflictReporting::First => {
                if self.conflicts.is_empty() {
                    self.conflicts.extend(scope.validate().err());
                }
            }
            ConflictReporting::All => self.conflicts.extend(scope.conflicts()),
        }

        let found = self.conflicts.len() - len_before;

        if found != 0 {
            debug!(scope = %scope.kind(), conflicts = found, "scope has conflicting usages");
        }
    }
}

/// Handles a command that is valid inside a render pass, whether it was recorded directly or
/// comes from a bundle.
///
/// Bind groups are recorded into `scope` as soon as they are set.
fn render_command(
    scope: &mut UsageScope,
    bindings: &mut BindingState,
    location: Location,
    command: &Command,
) -> Result<(), ValidationError> {
    match command {
        Command::SetPipeline(pipeline) => bindings
            .set_pipeline(pipeline, PipelineBindPoint::Graphics)
            .map_err(|misuse| location.misuse(command, misuse)),
        Command::SetBindGroup { index, bind_group } => {
            bindings.set_bind_group(*index, bind_group, location);
            record_bind_group(
                scope,
                *index,
                bind_group,
                ShaderStages::all_graphics(),
                location,
            );

            Ok(())
        }
        Command::Draw { .. } => {
            if bindings.pipeline.is_none() {
                return Err(location.missing_pipeline(command));
            }

            Ok(())
        }
        // Only reachable from bundles; the pass handles these itself.
        Command::BeginRenderPass(_)
        | Command::BeginComputePass
        | Command::Dispatch { .. }
        | Command::ExecuteBundles(_)
        | Command::EndPass => Err(location.misuse(command, StructuralMisuse::PassCommandInBundle)),
    }
}

fn compute_command(
    bindings: &mut BindingState,
    location: Location,
    command: &Command,
) -> Result<(), ValidationError> {
    match command {
        Command::SetPipeline(pipeline) => bindings
            .set_pipeline(pipeline, PipelineBindPoint::Compute)
            .map_err(|misuse| location.misuse(command, misuse)),
        Command::SetBindGroup { index, bind_group } => {
            bindings.set_bind_group(*index, bind_group, location);

            Ok(())
        }
        Command::Draw { .. } => {
            Err(location.misuse(command, StructuralMisuse::DrawOutsideRenderPass))
        }
        Command::BeginRenderPass(_)
        | Command::BeginComputePass
        | Command::Dispatch { .. }
        | Command::ExecuteBundles(_)
        | Command::EndPass => unreachable!(),
    }
}

/// Builds the scope of the next dispatch of `compute_pass` from its current slot table.
fn dispatch_scope(compute_pass: &ComputePassState) -> UsageScope {
    let mut scope = UsageScope::new(ScopeKind::Dispatch {
        pass_index: compute_pass.pass_index,
        dispatch_index: compute_pass.dispatch_count,
    });

    for (index, bound) in compute_pass.bindings.bound() {
        record_bind_group(
            &mut scope,
            index,
            &bound.bind_group,
            ShaderStages::COMPUTE,
            bound.location,
        );
    }

    scope
}

fn record_bind_group(
    scope: &mut UsageScope,
    slot: u32,
    bind_group: &BindGroup,
    invocable_stages: ShaderStages,
    location: Location,
) {
    for usage in resolve_bind_group(bind_group, invocable_stages) {
        scope.record(
            &usage.view,
            usage.kind,
            location.usage_ref(UsageSource::BindGroup {
                slot,
                binding: usage.binding,
                visible: usage.visible,
            }),
        );
    }
}

fn record_attachments(
    scope: &mut UsageScope,
    begin_info: &RenderPassBeginInfo,
    location: Location,
) -> Result<(), StructuralMisuse> {
    let RenderPassBeginInfo {
        color_attachments,
        depth_stencil_attachment,
        _ne: _,
    } = begin_info;

    for (index, color_attachment) in (0..).zip(color_attachments) {
        let Some(color_attachment) = color_attachment else {
            continue;
        };

        let slot = AttachmentSlot::Color { index };
        check_attachment(&color_attachment.view, slot, false)?;
        scope.record(
            &color_attachment.view,
            UsageKind::RenderTarget,
            location.usage_ref(UsageSource::Attachment(slot)),
        );

        if let Some(resolve_target) = &color_attachment.resolve_target {
            let slot = AttachmentSlot::Resolve { index };
            check_attachment(resolve_target, slot, false)?;
            scope.record(
                resolve_target,
                UsageKind::RenderTarget,
                location.usage_ref(UsageSource::Attachment(slot)),
            );
        }
    }

    if let Some(depth_stencil_attachment) = depth_stencil_attachment {
        let slot = AttachmentSlot::DepthStencil;
        let view = &depth_stencil_attachment.view;
        check_attachment(view, slot, true)?;

        let kind = |read_only| {
            if read_only {
                UsageKind::ReadOnly
            } else {
                UsageKind::RenderTarget
            }
        };
        let aspects = view.aspects();
        let depth = aspects
            .intersects(TextureAspects::DEPTH)
            .then(|| kind(depth_stencil_attachment.depth_read_only));
        let stencil = aspects
            .intersects(TextureAspects::STENCIL)
            .then(|| kind(depth_stencil_attachment.stencil_read_only));
        let use_ref = location.usage_ref(UsageSource::Attachment(slot));

        match (depth, stencil) {
            (Some(depth), Some(stencil)) if depth != stencil => {
                let range = view.subresource_range();

                for (aspect, kind) in [
                    (AspectSelector::DepthOnly, depth),
                    (AspectSelector::StencilOnly, stencil),
                ] {
                    scope.record_range(
                        view.texture(),
                        SubresourceRange {
                            aspect,
                            ..range.clone()
                        },
                        kind,
                        use_ref,
                    );
                }
            }
            (Some(kind), _) | (None, Some(kind)) => scope.record(view, kind, use_ref),
            (None, None) => {}
        }
    }

    Ok(())
}

fn check_attachment(
    view: &TextureView,
    slot: AttachmentSlot,
    depth_stencil: bool,
) -> Result<(), StructuralMisuse> {
    let texture = view.texture();
    let problem = if texture.aspects().is_depth_stencil() != depth_stencil {
        Some(AttachmentProblem::WrongAspects)
    } else if !texture.usage().contains(texture.attachment_usage()) {
        Some(AttachmentProblem::MissingUsage {
            required_usage: texture.attachment_usage(),
        })
    } else if !view.subresource_range().is_single_subresource() {
        Some(AttachmentProblem::MultipleSubresources)
    } else {
        None
    };

    match problem {
        Some(problem) => Err(StructuralMisuse::InvalidAttachment { slot, problem }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::EncodingState;
    use crate::{
        command_buffer::{
            validator::ConflictReporting, AttachmentProblem, AttachmentSlot, Command,
            RenderPassBeginInfo, RenderPassColorAttachment, RenderPassDepthStencilAttachment,
            StructuralMisuse, UsageKind, UsageSource, ValidationError,
        },
        tests::{color_texture, depth_stencil_texture, view},
        texture::{AspectSelector, Texture, TextureCreateInfo, TextureUsage, TextureView},
    };

    fn run(commands: &[Command]) -> Result<(), ValidationError> {
        let mut state = EncodingState::new(ConflictReporting::All);

        for (index, command) in commands.iter().enumerate() {
            state.command(index, command)?;
        }

        state.finish()
    }

    fn render_pass(begin_info: RenderPassBeginInfo) -> Result<(), ValidationError> {
        run(&[Command::BeginRenderPass(begin_info), Command::EndPass])
    }

    #[test]
    fn read_only_depth_with_written_stencil() {
        let texture = depth_stencil_texture();
        let attachment = TextureView::new_default(texture.clone()).unwrap();

        let mut state = EncodingState::new(ConflictReporting::All);
        state
            .command(
                0,
                &Command::BeginRenderPass(RenderPassBeginInfo {
                    depth_stencil_attachment: Some(RenderPassDepthStencilAttachment {
                        depth_read_only: true,
                        ..RenderPassDepthStencilAttachment::new(attachment)
                    }),
                    ..Default::default()
                }),
            )
            .unwrap();

        let super::PassState::Render(render_pass) = &state.pass else {
            panic!("expected a render pass");
        };
        let usages: Vec<_> = render_pass
            .scope
            .usages(&texture)
            .iter()
            .map(|record| (record.range.aspect, record.kind, record.use_ref.source))
            .collect();
        let source = UsageSource::Attachment(AttachmentSlot::DepthStencil);
        assert_eq!(
            usages,
            [
                (AspectSelector::DepthOnly, UsageKind::ReadOnly, source),
                (AspectSelector::StencilOnly, UsageKind::RenderTarget, source),
            ],
        );
    }

    #[test]
    fn color_attachment_must_be_single_subresource() {
        let texture = color_texture(2, 1);

        let err = render_pass(RenderPassBeginInfo {
            color_attachments: vec![
                None,
                Some(RenderPassColorAttachment::new(view(&texture, 0..2, 0..1))),
            ],
            ..Default::default()
        })
        .unwrap_err();

        assert!(matches!(
            err,
            ValidationError::StructuralMisuse {
                command_index: 0,
                misuse: StructuralMisuse::InvalidAttachment {
                    slot: AttachmentSlot::Color { index: 1 },
                    problem: AttachmentProblem::MultipleSubresources,
                },
                ..
            },
        ));
    }

    #[test]
    fn attachment_usage_and_aspects() {
        let sampled_only = Texture::new(TextureCreateInfo {
            usage: TextureUsage::SAMPLED,
            ..Default::default()
        })
        .unwrap();

        let err = render_pass(RenderPassBeginInfo {
            color_attachments: vec![Some(RenderPassColorAttachment::new(
                TextureView::new_default(sampled_only).unwrap(),
            ))],
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::StructuralMisuse {
                misuse: StructuralMisuse::InvalidAttachment {
                    problem: AttachmentProblem::MissingUsage {
                        required_usage: TextureUsage::COLOR_ATTACHMENT,
                    },
                    ..
                },
                ..
            },
        ));

        let err = render_pass(RenderPassBeginInfo {
            depth_stencil_attachment: Some(RenderPassDepthStencilAttachment::new(view(
                &color_texture(1, 1),
                0..1,
                0..1,
            ))),
            ..Default::default()
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::StructuralMisuse {
                misuse: StructuralMisuse::InvalidAttachment {
                    slot: AttachmentSlot::DepthStencil,
                    problem: AttachmentProblem::WrongAspects,
                },
                ..
            },
        ));
    }

    #[test]
    fn resolve_target_conflicts_with_its_own_attachment() {
        let texture = color_texture(1, 1);
        let target = view(&texture, 0..1, 0..1);

        let err = render_pass(RenderPassBeginInfo {
            color_attachments: vec![Some(RenderPassColorAttachment {
                resolve_target: Some(target.clone()),
                ..RenderPassColorAttachment::new(target)
            })],
            ..Default::default()
        })
        .unwrap_err();

        let [conflict] = err.conflicts() else {
            panic!("expected exactly one conflict");
        };
        assert_eq!(
            conflict.second_use.source,
            UsageSource::Attachment(AttachmentSlot::Resolve { index: 0 }),
        );
    }

    #[test]
    fn unterminated_pass_points_at_begin() {
        let err = run(&[Command::BeginComputePass]).unwrap_err();

        assert!(matches!(
            err,
            ValidationError::StructuralMisuse {
                command_index: 0,
                command_name: "begin_compute_pass",
                misuse: StructuralMisuse::UnterminatedPass,
                ..
            },
        ));
    }
}
