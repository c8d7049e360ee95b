//! Scalar helpers shared by decoding and suppression.

/// Clamps a coordinate to the normalized range `[0, 1]`.
#[inline]
pub(crate) fn clamp_unit(v: f32) -> f32 {
    v.clamp(0.0, 1.0)
}

/// Returns `true` when `v` lies in `[0, 1]`.
#[inline]
pub(crate) fn in_unit_range(v: f32) -> bool {
    (0.0..=1.0).contains(&v)
}
