//! Constant-velocity Kalman filter over center-size boxes, using ndarray with
//! a nalgebra-based 4x4 inverse.
//!
//! The 8-dimensional state is `[cx, cy, w, h, vcx, vcy, vw, vh]`; only the
//! first four components are observed.

use ndarray::{Array1, Array2};

use crate::error::TrackerError;

const NDIM: usize = 4;

/// Lower bound on the width/height used to scale noise, so zero-size boxes
/// still get a positive-definite covariance.
const MIN_NOISE_SCALE: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    std_weight_position: f64,
    std_weight_velocity: f64,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        let mut motion_mat = Array2::eye(2 * NDIM);
        for i in 0..NDIM {
            motion_mat[[i, NDIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((NDIM, 2 * NDIM));
        for i in 0..NDIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            std_weight_position: 1.0 / 20.0,
            std_weight_velocity: 1.0 / 160.0,
        }
    }

    /// Create a track state from an unassociated `[cx, cy, w, h]` measurement.
    /// Velocities start at zero.
    pub fn initiate(&self, measurement: [f64; 4]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(2 * NDIM);
        for i in 0..NDIM {
            mean[i] = measurement[i];
        }

        let (w, h) = noise_scale(measurement[2], measurement[3]);
        let pos = 2.0 * self.std_weight_position;
        let vel = 10.0 * self.std_weight_velocity;
        let std = [
            pos * w,
            pos * h,
            pos * w,
            pos * h,
            vel * w,
            vel * h,
            vel * w,
            vel * h,
        ];

        (mean, diag_squared(&std))
    }

    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let (w, h) = noise_scale(mean[2], mean[3]);
        let pos = self.std_weight_position;
        let vel = self.std_weight_velocity;
        let std = [
            pos * w,
            pos * h,
            pos * w,
            pos * h,
            vel * w,
            vel * h,
            vel * w,
            vel * h,
        ];
        let motion_cov = diag_squared(&std);

        let new_mean = self.motion_mat.dot(mean);
        let new_covariance = self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + motion_cov;

        (new_mean, new_covariance)
    }

    /// Project the state distribution into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let (w, h) = noise_scale(mean[2], mean[3]);
        let pos = self.std_weight_position;
        let innovation_cov = diag_squared(&[pos * w, pos * h, pos * w, pos * h]);

        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + innovation_cov;

        (mean_proj, covariance_proj)
    }

    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; 4],
    ) -> Result<(Array1<f64>, Array2<f64>), TrackerError> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        // Since H is [I 0], P * H^T is the first 4 columns of P (8x4).
        let s_inv = invert_4x4(&projected_cov)?;

        let pht = covariance.dot(&self.update_mat.t());
        let kalman_gain = pht.dot(&s_inv);

        let new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());

        Ok((new_mean, new_covariance))
    }
}

fn noise_scale(w: f64, h: f64) -> (f64, f64) {
    (w.max(MIN_NOISE_SCALE), h.max(MIN_NOISE_SCALE))
}

fn diag_squared(std: &[f64]) -> Array2<f64> {
    let mut cov = Array2::zeros((std.len(), std.len()));
    for (i, s) in std.iter().enumerate() {
        cov[[i, i]] = s * s;
    }
    cov
}

/// Invert a 4x4 matrix with nalgebra (pure Rust, no BLAS/LAPACK).
fn invert_4x4(m: &Array2<f64>) -> Result<Array2<f64>, TrackerError> {
    let nm = nalgebra::Matrix4::from_fn(|i, j| m[[i, j]]);
    let inv = nm.try_inverse().ok_or(TrackerError::SingularCovariance)?;
    Ok(Array2::from_shape_fn((NDIM, NDIM), |(i, j)| inv[(i, j)]))
}
