//! Constant-velocity Kalman filter over (cx, cy, scale, aspect) using ndarray,
//! with nalgebra for the 4x4 innovation inverse.

use log::warn;
use ndarray::{Array1, Array2};

/// Dimension of the state vector: (cx, cy, s, r, vx, vy, vs).
pub const STATE_DIM: usize = 7;
/// Dimension of the measurement vector: (cx, cy, s, r).
pub const MEASUREMENT_DIM: usize = 4;

/// Lower bound applied to scale and aspect ratio after correction.
pub const MIN_SHAPE: f64 = 1e-6;

pub const DEFAULT_MEASUREMENT_NOISE: [f64; MEASUREMENT_DIM] = [1.0, 1.0, 10.0, 10.0];
pub const DEFAULT_PROCESS_NOISE: [f64; STATE_DIM] = [1.0, 1.0, 1.0, 1.0, 0.01, 0.01, 1e-4];
const INITIAL_VARIANCE: [f64; STATE_DIM] = [10.0, 10.0, 10.0, 10.0, 1e4, 1e4, 1e4];

#[derive(Debug, Clone)]
pub struct KalmanFilter {
    motion_mat: Array2<f64>,
    update_mat: Array2<f64>,
    process_cov: Array2<f64>,
    measurement_cov: Array2<f64>,
}

impl Default for KalmanFilter {
    fn default() -> Self {
        Self::new()
    }
}

impl KalmanFilter {
    pub fn new() -> Self {
        Self::with_noise(DEFAULT_MEASUREMENT_NOISE, DEFAULT_PROCESS_NOISE)
    }

    /// Build a filter from the diagonals of the measurement (R) and process (Q) covariances.
    pub fn with_noise(
        measurement_noise: [f64; MEASUREMENT_DIM],
        process_noise: [f64; STATE_DIM],
    ) -> Self {
        // Position and scale advance by their velocities; the aspect ratio has none.
        let mut motion_mat = Array2::eye(STATE_DIM);
        for i in 0..3 {
            motion_mat[[i, MEASUREMENT_DIM + i]] = 1.0;
        }

        let mut update_mat = Array2::zeros((MEASUREMENT_DIM, STATE_DIM));
        for i in 0..MEASUREMENT_DIM {
            update_mat[[i, i]] = 1.0;
        }

        Self {
            motion_mat,
            update_mat,
            process_cov: diagonal(&process_noise),
            measurement_cov: diagonal(&measurement_noise),
        }
    }

    /// Create a track state from an unassociated measurement: zero velocity, high uncertainty.
    pub fn initiate(&self, measurement: [f64; MEASUREMENT_DIM]) -> (Array1<f64>, Array2<f64>) {
        let mut mean = Array1::zeros(STATE_DIM);
        for i in 0..MEASUREMENT_DIM {
            mean[i] = measurement[i];
        }
        clamp_shape(&mut mean);

        (mean, diagonal(&INITIAL_VARIANCE))
    }

    /// Run the prediction step one frame ahead.
    pub fn predict(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mut mean = mean.clone();
        // Never let the scale velocity drive the area through zero.
        if mean[2] + mean[6] <= 0.0 {
            mean[6] = 0.0;
        }

        let new_mean = self.motion_mat.dot(&mean);
        let new_covariance =
            self.motion_mat.dot(covariance).dot(&self.motion_mat.t()) + &self.process_cov;

        (new_mean, symmetrize(new_covariance))
    }

    /// Project the state distribution into measurement space.
    pub fn project(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
    ) -> (Array1<f64>, Array2<f64>) {
        let mean_proj = self.update_mat.dot(mean);
        let covariance_proj =
            self.update_mat.dot(covariance).dot(&self.update_mat.t()) + &self.measurement_cov;

        (mean_proj, covariance_proj)
    }

    /// Run the correction step.
    ///
    /// Returns `None` when the innovation covariance cannot be inverted; callers keep
    /// the predicted state in that case.
    pub fn update(
        &self,
        mean: &Array1<f64>,
        covariance: &Array2<f64>,
        measurement: [f64; MEASUREMENT_DIM],
    ) -> Option<(Array1<f64>, Array2<f64>)> {
        let (projected_mean, projected_cov) = self.project(mean, covariance);

        let measurement_arr = Array1::from_vec(measurement.to_vec());
        let innovation = measurement_arr - projected_mean;

        // K = P * H^T * S^-1
        let s_inv = invert_4x4(&projected_cov)?;
        let pht = covariance.dot(&self.update_mat.t()); // 7x4
        let kalman_gain = pht.dot(&s_inv); // 7x4

        let mut new_mean = mean + &kalman_gain.dot(&innovation);
        let new_covariance = covariance - &kalman_gain.dot(&projected_cov).dot(&kalman_gain.t());
        clamp_shape(&mut new_mean);

        Some((new_mean, symmetrize(new_covariance)))
    }
}

fn diagonal(values: &[f64]) -> Array2<f64> {
    Array2::from_diag(&Array1::from_vec(values.to_vec()))
}

fn clamp_shape(mean: &mut Array1<f64>) {
    for i in [2, 3] {
        if !(mean[i] > MIN_SHAPE) {
            mean[i] = MIN_SHAPE;
        }
    }
}

fn symmetrize(m: Array2<f64>) -> Array2<f64> {
    let t = m.t().to_owned();
    (m + t) * 0.5
}

/// Invert a 4x4 matrix using nalgebra (pure Rust).
fn invert_4x4(m: &Array2<f64>) -> Option<Array2<f64>> {
    let mut nm = nalgebra::Matrix4::zeros();
    for i in 0..4 {
        for j in 0..4 {
            nm[(i, j)] = m[[i, j]];
        }
    }
    let Some(inv) = nm.try_inverse() else {
        warn!("innovation covariance is singular, skipping correction");
        return None;
    };
    let mut res = Array2::zeros((4, 4));
    for i in 0..4 {
        for j in 0..4 {
            res[[i, j]] = inv[(i, j)];
        }
    }
    Some(res)
}
