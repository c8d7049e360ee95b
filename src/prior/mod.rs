//! Prior (anchor) buffers and their geometry.
//!
//! A prior block stores `num_priors` rows of `prior_size` values, optionally
//! followed by `num_priors` rows of 4 variances. With `prior_size == 5` each
//! row starts with an image id, and an id of `-1` terminates the valid rows.

use crate::bbox::BBox;
use crate::util::{DetOutError, DetOutResult};

/// Values per prior row when priors are normalized.
pub const NORMALIZED_PRIOR_SIZE: usize = 4;
/// Values per prior row when each row carries a leading image id.
pub const PIXEL_PRIOR_SIZE: usize = 5;
/// Leading image id that marks the end of the valid prior rows.
pub const PRIOR_TERMINATOR: f32 = -1.0;

const IDENTITY_VARIANCE: [f32; 4] = [1.0; 4];

/// Coordinate space of the stored prior corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PriorCoords {
    /// Corners already lie in `[0, 1]`.
    Normalized,
    /// Corners are pixels of a `width` x `height` network input.
    Pixel { width: f32, height: f32 },
}

/// Number of elements one prior block occupies.
pub fn prior_block_len(num_priors: usize, prior_size: usize, with_variance: bool) -> usize {
    num_priors * prior_row_len(prior_size, with_variance)
}

pub(crate) fn prior_row_len(prior_size: usize, with_variance: bool) -> usize {
    if with_variance {
        prior_size + 4
    } else {
        prior_size
    }
}

/// Borrowed view over one block of priors.
#[derive(Clone, Copy, Debug)]
pub struct PriorSet<'a> {
    coords: &'a [f32],
    variances: Option<&'a [f32]>,
    prior_size: usize,
    num_priors: usize,
    space: PriorCoords,
}

impl<'a> PriorSet<'a> {
    /// Wraps a prior block holding exactly `num_priors` priors.
    pub fn new(
        block: &'a [f32],
        num_priors: usize,
        prior_size: usize,
        with_variance: bool,
        space: PriorCoords,
    ) -> DetOutResult<Self> {
        if prior_size != NORMALIZED_PRIOR_SIZE && prior_size != PIXEL_PRIOR_SIZE {
            return Err(DetOutError::InvalidInput("prior size must be 4 or 5"));
        }
        let expected = prior_block_len(num_priors, prior_size, with_variance);
        if num_priors == 0 || block.len() != expected {
            return Err(DetOutError::ShapeMismatch {
                tensor: "priors",
                expected: expected.max(prior_row_len(prior_size, with_variance)),
                got: block.len(),
            });
        }
        let (coords, rest) = block.split_at(num_priors * prior_size);
        let variances = if with_variance { Some(rest) } else { None };
        Ok(Self {
            coords,
            variances,
            prior_size,
            num_priors,
            space,
        })
    }

    /// Number of prior rows in the block, valid or not.
    pub fn len(&self) -> usize {
        self.num_priors
    }

    /// Returns true when the block holds no priors.
    pub fn is_empty(&self) -> bool {
        self.num_priors == 0
    }

    /// Number of leading rows before the first terminator.
    pub fn num_valid(&self) -> usize {
        if self.prior_size != PIXEL_PRIOR_SIZE {
            return self.num_priors;
        }
        self.coords
            .chunks_exact(self.prior_size)
            .position(|row| row[0] == PRIOR_TERMINATOR)
            .unwrap_or(self.num_priors)
    }

    /// Returns prior `idx` in normalized coordinates.
    ///
    /// Pixel priors get their far corner moved one pixel out before being
    /// divided by the input size. That matches producers that store
    /// inclusive pixel corners, but looks like an off-by-one for producers
    /// that do not.
    pub fn bbox(&self, idx: usize) -> BBox {
        let start = idx * self.prior_size + (self.prior_size - NORMALIZED_PRIOR_SIZE);
        let c = &self.coords[start..start + 4];
        match self.space {
            PriorCoords::Normalized => BBox::new(c[0], c[1], c[2], c[3]),
            PriorCoords::Pixel { width, height } => BBox::new(
                c[0] / width,
                c[1] / height,
                (c[2] + 1.0) / width,
                (c[3] + 1.0) / height,
            ),
        }
    }

    /// Returns the variance of prior `idx`, or the identity when the block
    /// stores none.
    pub fn variance(&self, idx: usize) -> [f32; 4] {
        match self.variances {
            Some(v) => {
                let s = &v[idx * 4..idx * 4 + 4];
                [s[0], s[1], s[2], s[3]]
            }
            None => IDENTITY_VARIANCE,
        }
    }
}
