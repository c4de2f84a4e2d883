use crate::pixel_buffer::RenderLevel;
use serde::{Deserialize, Serialize};

/// One pass of a progressive render.
///
/// A pass samples one point per `step x step` block and fills the whole block
/// at `level`. The final pass has step 1 and level `Full`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RenderPass {
    pub level: RenderLevel,
    pub step: u32,
}

impl RenderPass {
    pub const fn new(level: RenderLevel, step: u32) -> Self {
        Self { level, step }
    }

    pub fn is_full(&self) -> bool {
        self.level == RenderLevel::Full
    }

    /// Number of sampled blocks in a `width x height` image.
    pub fn sample_count(&self, width: u32, height: u32) -> u64 {
        let step = self.step.max(1);
        width.div_ceil(step) as u64 * height.div_ceil(step) as u64
    }
}

/// Sequence of passes a render runs through.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PassPlan {
    /// Coarse (8), Medium (4), Fine (2), Full.
    #[default]
    Progressive,
    /// Coarse (4), Full.
    Quick,
    FullOnly,
}

const PROGRESSIVE: [RenderPass; 4] = [
    RenderPass::new(RenderLevel::Coarse, 8),
    RenderPass::new(RenderLevel::Medium, 4),
    RenderPass::new(RenderLevel::Fine, 2),
    RenderPass::new(RenderLevel::Full, 1),
];

const QUICK: [RenderPass; 2] = [
    RenderPass::new(RenderLevel::Coarse, 4),
    RenderPass::new(RenderLevel::Full, 1),
];

const FULL_ONLY: [RenderPass; 1] = [RenderPass::new(RenderLevel::Full, 1)];

impl PassPlan {
    pub fn passes(self) -> &'static [RenderPass] {
        match self {
            PassPlan::Progressive => &PROGRESSIVE,
            PassPlan::Quick => &QUICK,
            PassPlan::FullOnly => &FULL_ONLY,
        }
    }

    /// Preview passes, i.e. everything before the full-resolution pass.
    pub fn previews(self) -> &'static [RenderPass] {
        let passes = self.passes();
        &passes[..passes.len() - 1]
    }
}
