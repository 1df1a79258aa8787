//! Continuous box space

use super::Space;
use crate::{BrawlError, Result};
use ndarray::{ArrayD, IxDyn, Zip};
use rand::Rng;

/// Element-wise `[low, high]` interval. Either bound may be infinite.
#[derive(Clone, Debug, PartialEq)]
pub struct Box {
    pub low: ArrayD<f32>,
    pub high: ArrayD<f32>,
    shape: Vec<usize>,
}

impl Box {
    /// Bounds must share a shape and satisfy `low <= high` everywhere.
    pub fn new(low: ArrayD<f32>, high: ArrayD<f32>) -> Result<Self> {
        if low.shape() != high.shape() {
            return Err(BrawlError::ShapeMismatch {
                expected: low.shape().to_vec(),
                actual: high.shape().to_vec(),
            });
        }
        if Zip::from(&low).and(&high).any(|&l, &h| !(l <= h)) {
            return Err(BrawlError::InvalidConfig(
                "box bounds need low <= high".to_string(),
            ));
        }
        let shape = low.shape().to_vec();
        Ok(Self { low, high, shape })
    }

    /// Same interval for every element
    pub fn uniform(shape: &[usize], low: f32, high: f32) -> Self {
        let (low, high) = if low <= high { (low, high) } else { (high, low) };
        Self {
            low: ArrayD::from_elem(IxDyn(shape), low),
            high: ArrayD::from_elem(IxDyn(shape), high),
            shape: shape.to_vec(),
        }
    }

    pub fn unbounded(shape: &[usize]) -> Self {
        Self::uniform(shape, f32::NEG_INFINITY, f32::INFINITY)
    }

    pub fn unit(shape: &[usize]) -> Self {
        Self::uniform(shape, 0.0, 1.0)
    }

    /// `[-1, 1]` everywhere, the control range of a torque actuator
    pub fn symmetric(shape: &[usize]) -> Self {
        Self::uniform(shape, -1.0, 1.0)
    }

    pub fn is_bounded(&self) -> bool {
        self.low.iter().chain(self.high.iter()).all(|v| v.is_finite())
    }

    /// Clamp element-wise. `value` keeps its own shape; its element count
    /// must match the space. NaN entries are left as NaN.
    pub fn clip(&self, value: &ArrayD<f32>) -> Result<ArrayD<f32>> {
        if value.len() != self.low.len() {
            return Err(BrawlError::ShapeMismatch {
                expected: self.shape.clone(),
                actual: value.shape().to_vec(),
            });
        }
        let mut out = value.clone();
        out.iter_mut()
            .zip(self.low.iter().zip(self.high.iter()))
            .for_each(|(v, (&l, &h))| *v = v.clamp(l, h));
        Ok(out)
    }
}

impl Space for Box {
    type Sample = ArrayD<f32>;

    /// Uniform inside finite bounds. Half-open or unbounded dimensions
    /// sample the finite bound if there is one, else zero.
    fn sample<R: Rng>(&self, rng: &mut R) -> Self::Sample {
        let mut out = ArrayD::zeros(IxDyn(&self.shape));
        Zip::from(&mut out)
            .and(&self.low)
            .and(&self.high)
            .for_each(|o, &l, &h| {
                *o = match (l.is_finite(), h.is_finite()) {
                    (true, true) if l < h => rng.gen_range(l..h),
                    (true, _) => l,
                    (false, true) => h,
                    (false, false) => 0.0,
                }
            });
        out
    }

    fn contains(&self, value: &Self::Sample) -> bool {
        value.shape() == self.low.shape()
            && Zip::from(value)
                .and(&self.low)
                .and(&self.high)
                .all(|&v, &l, &h| l <= v && v <= h)
    }

    fn shape(&self) -> &[usize] {
        &self.shape
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn arr(values: &[f32]) -> ArrayD<f32> {
        ArrayD::from_shape_vec(IxDyn(&[values.len()]), values.to_vec()).unwrap()
    }

    #[test]
    fn test_sample_within_bounds() {
        let space = Box::uniform(&[3, 4], -1.0, 1.0);
        let mut rng = StdRng::seed_from_u64(42);

        for _ in 0..100 {
            let sample = space.sample(&mut rng);
            assert_eq!(sample.shape(), &[3, 4]);
            assert!(space.contains(&sample));
        }
    }

    #[test]
    fn test_contains_checks_shape_and_bounds() {
        let space = Box::uniform(&[2], 0.0, 1.0);
        assert!(space.contains(&arr(&[0.5, 1.0])));
        assert!(!space.contains(&arr(&[1.5, 0.5])));
        assert!(!space.contains(&arr(&[0.5, 0.5, 0.5])));
    }

    #[test]
    fn test_clip_torques() {
        let space = Box::symmetric(&[3]);
        let clipped = space.clip(&arr(&[-4.0, 0.25, 2.0])).unwrap();
        assert_eq!(clipped.as_slice().unwrap(), &[-1.0, 0.25, 1.0]);
        assert!(space.contains(&clipped));

        // a longer action is rejected rather than clipped partway
        assert!(matches!(
            space.clip(&arr(&[0.0, 0.0, 0.0, 5.0])),
            Err(BrawlError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_new_rejects_bad_bounds() {
        assert!(Box::new(arr(&[0.0, 0.0]), arr(&[1.0])).is_err());
        assert!(Box::new(arr(&[2.0]), arr(&[1.0])).is_err());
        let space = Box::new(arr(&[-2.0, 0.0]), arr(&[2.0, 0.0])).unwrap();
        assert_eq!(space.shape(), &[2]);
    }

    #[test]
    fn test_half_open_sample() {
        let space = Box::new(arr(&[f32::NEG_INFINITY, 3.0]), arr(&[-5.0, f32::INFINITY])).unwrap();
        let sample = space.sample(&mut StdRng::seed_from_u64(7));
        assert_eq!(sample.as_slice().unwrap(), &[-5.0, 3.0]);
        assert!(!Box::unbounded(&[5]).is_bounded());
    }

    #[test]
    fn test_unit_box() {
        let space = Box::unit(&[2, 2]);
        assert!(space.is_bounded());
        assert!(space.contains(&ArrayD::from_elem(IxDyn(&[2, 2]), 1.0)));
        assert!(!space.contains(&ArrayD::from_elem(IxDyn(&[2, 2]), -0.1)));
    }
}
