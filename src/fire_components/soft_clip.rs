// src/fire_components/soft_clip.rs

//! Final summing stage and the saturating soft clipper.

/// Sums the three sources: modulated pink noise, tone and crackle.
#[inline(always)]
pub fn combine(pink: f32, modulation: f32, tone: f32, crackle: f32) -> f32 {
    pink * modulation + tone + crackle
}

/// `x / (1 + |x|)`. Bounded to (-1, 1) for every finite input.
#[inline(always)]
pub fn soft_clip(x: f32) -> f32 {
    x / (1.0 + x.abs())
}
