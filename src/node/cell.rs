//! The uniform cell interface. Each [`CellKind`] is a tagged variant with a
//! fixed, fan-in-independent weight count — connection strength lives on
//! edges, cell-internal gate parameters live here — dispatched as a closed
//! enum rather than through a trait object.
//!
//! Backward propagation here truncates BPTT at one step: a cell's own
//! recurrent state (`h_prev`, `c_prev`) is treated as a constant when
//! differentiating, and gradient only flows further back in time through
//! explicit recurrent *edges* (which do carry a gradient at `t - depth`).

use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Simple,
    Jordan,
    Elman,
    Lstm,
    Gru,
    Mgu,
    Ugrnn,
    Delta,
    Enarc,
    EnasDag,
    RandomDag,
    Dnas,
    Sin,
    Cos,
    Tanh,
    Sigmoid,
    Inverse,
    Sum,
    Multiply,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CombineMode {
    Sum,
    Product,
}

/// Cached intermediate values needed to differentiate a cell's forward
/// formula; `scratch[0]` is always the combined input `x_t`.
pub type Scratch = Vec<f64>;

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

impl CellKind {
    pub fn num_weights(&self) -> usize {
        match self {
            CellKind::Simple
            | CellKind::Jordan
            | CellKind::Elman
            | CellKind::Enarc
            | CellKind::EnasDag
            | CellKind::RandomDag
            | CellKind::Dnas => 1,
            CellKind::Lstm => 8,
            CellKind::Gru => 6,
            CellKind::Mgu => 4,
            CellKind::Ugrnn => 4,
            CellKind::Delta => 4,
            CellKind::Sin
            | CellKind::Cos
            | CellKind::Tanh
            | CellKind::Sigmoid
            | CellKind::Inverse
            | CellKind::Sum
            | CellKind::Multiply => 0,
        }
    }

    pub fn scratch_size(&self) -> usize {
        match self {
            CellKind::Lstm => 6,   // x, i, f, o, g, c_new
            CellKind::Gru => 4,    // x, r, z, n
            CellKind::Mgu => 3,    // x, f, n
            CellKind::Ugrnn => 3,  // x, z, n
            CellKind::Delta => 3,  // x, d1, d2
            _ => 1,                // x
        }
    }

    pub fn combine_mode(&self) -> CombineMode {
        match self {
            CellKind::Multiply => CombineMode::Product,
            _ => CombineMode::Sum,
        }
    }

    pub fn uses_cell_state(&self) -> bool {
        matches!(self, CellKind::Lstm)
    }

    pub fn uses_recurrent_self(&self) -> bool {
        matches!(
            self,
            CellKind::Lstm | CellKind::Gru | CellKind::Mgu | CellKind::Ugrnn | CellKind::Delta
        )
    }

    /// Forward pass. Returns `(output, scratch, new_cell_state)`.
    pub fn forward(&self, weights: &[f64], x: f64, h_prev: f64, c_prev: f64) -> (f64, Scratch, f64) {
        match self {
            CellKind::Simple
            | CellKind::Jordan
            | CellKind::Elman
            | CellKind::Enarc
            | CellKind::EnasDag
            | CellKind::RandomDag
            | CellKind::Dnas => {
                let out = (x + weights[0]).tanh();
                (out, vec![x], 0.0)
            }
            CellKind::Sin => (x.sin(), vec![x], 0.0),
            CellKind::Cos => (x.cos(), vec![x], 0.0),
            CellKind::Tanh => (x.tanh(), vec![x], 0.0),
            CellKind::Sigmoid => (sigmoid(x), vec![x], 0.0),
            CellKind::Inverse => (-x, vec![x], 0.0),
            CellKind::Sum => (x, vec![x], 0.0),
            CellKind::Multiply => (x, vec![x], 0.0),
            CellKind::Lstm => {
                let i = sigmoid(x + weights[0] + weights[1] * h_prev);
                let f = sigmoid(x + weights[2] + weights[3] * h_prev);
                let o = sigmoid(x + weights[4] + weights[5] * h_prev);
                let g = (x + weights[6] + weights[7] * h_prev).tanh();
                let c_new = f * c_prev + i * g;
                let out = o * c_new.tanh();
                (out, vec![x, i, f, o, g, c_new], c_new)
            }
            CellKind::Gru => {
                let r = sigmoid(x + weights[0] + weights[1] * h_prev);
                let z = sigmoid(x + weights[2] + weights[3] * h_prev);
                let n = (x + weights[4] + weights[5] * (r * h_prev)).tanh();
                let out = (1.0 - z) * n + z * h_prev;
                (out, vec![x, r, z, n], 0.0)
            }
            CellKind::Mgu => {
                let f = sigmoid(x + weights[0] + weights[1] * h_prev);
                let n = (x + weights[2] + weights[3] * (f * h_prev)).tanh();
                let out = (1.0 - f) * h_prev + f * n;
                (out, vec![x, f, n], 0.0)
            }
            CellKind::Ugrnn => {
                let z = sigmoid(x + weights[0] + weights[1] * h_prev);
                let n = (x + weights[2] + weights[3] * h_prev).tanh();
                let out = z * h_prev + (1.0 - z) * n;
                (out, vec![x, z, n], 0.0)
            }
            CellKind::Delta => {
                let d1 = weights[0] * h_prev * x + weights[2];
                let d2 = weights[1] * h_prev + weights[3];
                let out = (d1 + d2).tanh();
                (out, vec![x, d1, d2], 0.0)
            }
        }
    }

    /// Backward pass. `d_out` is dE/d(output). Returns `(d_x, d_weights)`.
    pub fn backward(
        &self,
        weights: &[f64],
        scratch: &[f64],
        h_prev: f64,
        d_out: f64,
    ) -> (f64, Vec<f64>) {
        match self {
            CellKind::Simple
            | CellKind::Jordan
            | CellKind::Elman
            | CellKind::Enarc
            | CellKind::EnasDag
            | CellKind::RandomDag
            | CellKind::Dnas => {
                let out = (scratch[0] + weights[0]).tanh();
                let d_pre = d_out * (1.0 - out * out);
                (d_pre, vec![d_pre])
            }
            CellKind::Sin => (d_out * scratch[0].cos(), vec![]),
            CellKind::Cos => (-d_out * scratch[0].sin(), vec![]),
            CellKind::Tanh => {
                let t = scratch[0].tanh();
                (d_out * (1.0 - t * t), vec![])
            }
            CellKind::Sigmoid => {
                let s = sigmoid(scratch[0]);
                (d_out * s * (1.0 - s), vec![])
            }
            CellKind::Inverse => (-d_out, vec![]),
            CellKind::Sum => (d_out, vec![]),
            CellKind::Multiply => (d_out, vec![]),
            CellKind::Lstm => {
                let (x, i, f, o, g, c_new) =
                    (scratch[0], scratch[1], scratch[2], scratch[3], scratch[4], scratch[5]);
                let tanh_c = c_new.tanh();
                let d_o = d_out * tanh_c;
                let d_c = d_out * o * (1.0 - tanh_c * tanh_c);
                let d_i = d_c * g;
                let d_g = d_c * i;
                let d_f = d_c * 0.0; // c_prev treated as constant; forget gate's contribution to
                                     // further-back time steps flows only via recurrent edges.
                let d_i_pre = d_i * i * (1.0 - i);
                let d_f_pre = d_f * f * (1.0 - f);
                let d_o_pre = d_o * o * (1.0 - o);
                let d_g_pre = d_g * (1.0 - g * g);
                let d_x = d_i_pre + d_f_pre + d_o_pre + d_g_pre;
                let d_weights = vec![
                    d_i_pre,
                    d_i_pre * h_prev,
                    d_f_pre,
                    d_f_pre * h_prev,
                    d_o_pre,
                    d_o_pre * h_prev,
                    d_g_pre,
                    d_g_pre * h_prev,
                ];
                let _ = x;
                (d_x, d_weights)
            }
            CellKind::Gru => {
                let (_x, r, z, n) = (scratch[0], scratch[1], scratch[2], scratch[3]);
                let d_n = d_out * (1.0 - z);
                let d_z = d_out * (h_prev - n);
                let d_n_pre = d_n * (1.0 - n * n);
                let d_r = d_n_pre * weights[5] * h_prev;
                let d_z_pre = d_z * z * (1.0 - z);
                let d_r_pre = d_r * r * (1.0 - r);
                let d_x = d_r_pre + d_z_pre + d_n_pre;
                let d_weights = vec![
                    d_r_pre,
                    d_r_pre * h_prev,
                    d_z_pre,
                    d_z_pre * h_prev,
                    d_n_pre,
                    d_n_pre * (r * h_prev),
                ];
                (d_x, d_weights)
            }
            CellKind::Mgu => {
                let (_x, f, n) = (scratch[0], scratch[1], scratch[2]);
                let d_n = d_out * f;
                let d_f_direct = d_out * (n - h_prev);
                let d_n_pre = d_n * (1.0 - n * n);
                let d_f_from_n = d_n_pre * weights[3] * h_prev;
                let d_f_pre = (d_f_direct + d_f_from_n) * f * (1.0 - f);
                let d_x = d_f_pre + d_n_pre;
                let d_weights = vec![d_f_pre, d_f_pre * h_prev, d_n_pre, d_n_pre * (f * h_prev)];
                (d_x, d_weights)
            }
            CellKind::Ugrnn => {
                let (_x, z, n) = (scratch[0], scratch[1], scratch[2]);
                let d_n = d_out * (1.0 - z);
                let d_z = d_out * (h_prev - n);
                let d_n_pre = d_n * (1.0 - n * n);
                let d_z_pre = d_z * z * (1.0 - z);
                let d_x = d_z_pre + d_n_pre;
                let d_weights = vec![d_z_pre, d_z_pre * h_prev, d_n_pre, d_n_pre * h_prev];
                (d_x, d_weights)
            }
            CellKind::Delta => {
                let (x, d1, d2) = (scratch[0], scratch[1], scratch[2]);
                let total = (d1 + d2).tanh();
                let d_total = d_out * (1.0 - total * total);
                let d_alpha = d_total * h_prev * x;
                let d_beta = d_total * h_prev;
                let d_bias1 = d_total;
                let d_bias2 = d_total;
                let d_x = d_total * weights[0] * h_prev;
                (d_x, vec![d_alpha, d_beta, d_bias1, d_bias2])
            }
        }
    }

    /// Xavier init: fan-in + fan-out symmetric range √6/√(fan_in+fan_out).
    pub fn init_xavier<R: Rng>(&self, fan_in: usize, fan_out: usize, rng: &mut R) -> Vec<f64> {
        let bound = (6.0_f64 / ((fan_in + fan_out).max(1) as f64)).sqrt();
        (0..self.num_weights())
            .map(|_| rng.gen_range(-bound..=bound))
            .collect()
    }

    /// Kaiming init: Gaussian draws scaled by √2/√fan_in.
    pub fn init_kaiming<R: Rng>(&self, fan_in: usize, rng: &mut R) -> Vec<f64> {
        let scale = (2.0_f64 / (fan_in.max(1) as f64)).sqrt();
        (0..self.num_weights())
            .map(|_| gaussian(rng, 0.0, 1.0) * scale)
            .collect()
    }

    pub fn init_uniform<R: Rng>(&self, rng: &mut R) -> Vec<f64> {
        (0..self.num_weights()).map(|_| rng.gen_range(-0.5..=0.5)).collect()
    }

    /// Lamarckian init: `Gaussian(mu, sigma)` per-weight from parent statistics.
    pub fn init_lamarckian<R: Rng>(&self, mu: &[f64], sigma: &[f64], rng: &mut R) -> Vec<f64> {
        (0..self.num_weights())
            .map(|i| {
                let (m, s) = (
                    mu.get(i).copied().unwrap_or(0.0),
                    sigma.get(i).copied().unwrap_or(1.0),
                );
                gaussian(rng, m, s)
            })
            .collect()
    }
}

/// Box-Muller transform; [`CellKind`] only ever needs a single scalar
/// Gaussian sample at a time, so this stays self-contained rather than
/// pulling in a distributions crate.
pub fn gaussian<R: Rng>(rng: &mut R, mu: f64, sigma: f64) -> f64 {
    let u1: f64 = rng.gen_range(f64::EPSILON..1.0);
    let u2: f64 = rng.gen_range(0.0..1.0);
    let z0 = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    mu + sigma * z0
}
