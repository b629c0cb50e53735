// Copyright (c) 2022 The texture-hazards developers
// Licensed under the Apache License, Version 2.0
// <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT
// license <LICENSE-MIT or https://opensource.org/licenses/MIT>,
// at your option. All files in the project carrying such
// notice may not be copied, modified, or distributed except
// according to those terms.

//! Shader stages, used to describe which stages can see a binding.

use crate::macros::vulkan_bitflags_enum;

vulkan_bitflags_enum! {
    /// A set of [`ShaderStage`] values.
    ShaderStages impl {
        /// Returns the stages that a render pass can invoke.
        #[inline]
        pub const fn all_graphics() -> ShaderStages {
            ShaderStages::VERTEX.union(ShaderStages::FRAGMENT)
        }
    },

    /// A shader stage within a pipeline.
    ShaderStage,

    = ShaderStageFlags(u32);

    /// The vertex stage of a render pipeline.
    VERTEX, Vertex = VERTEX,

    /// The fragment stage of a render pipeline.
    FRAGMENT, Fragment = FRAGMENT,

    /// The single stage of a compute pipeline.
    COMPUTE, Compute = COMPUTE,
}

#[cfg(test)]
mod tests {
    use super::{ShaderStage, ShaderStages};

    #[test]
    fn iterate_stages() {
        let stages = ShaderStages::VERTEX | ShaderStages::COMPUTE;
        let collected: Vec<_> = stages.into_iter().collect();
        assert_eq!(collected, [ShaderStage::Vertex, ShaderStage::Compute]);
        assert_eq!(collected.into_iter().collect::<ShaderStages>(), stages);
    }

    #[test]
    fn matches_vulkan_bits() {
        assert_eq!(
            ash::vk::ShaderStageFlags::from(ShaderStages::all_graphics()),
            ash::vk::ShaderStageFlags::VERTEX | ash::vk::ShaderStageFlags::FRAGMENT,
        );
        assert!(ShaderStages::all_graphics().contains_enum(ShaderStage::Fragment));
        assert!(!ShaderStages::all_graphics().contains_enum(ShaderStage::Compute));
    }
}
