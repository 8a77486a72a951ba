//! Recurrent node primitives.
pub mod cell;

pub use cell::CellKind;
use rand::Rng;

pub const WEIGHT_BOUND: f64 = 10.0;

/// `depth` lives in `[0, 1]`: 0 for input, 1 for output, strictly between
/// for hidden.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LayerType {
    Input,
    Hidden,
    Output,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub innovation: u64,
    pub layer_type: LayerType,
    pub cell_kind: CellKind,
    pub depth: f64,
    pub enabled: bool,
    /// Schema key; `Some` only for input/output nodes.
    pub parameter_name: Option<String>,
    pub weights: Vec<f64>,
    pub forward_reachable: bool,
    pub backward_reachable: bool,
    /// DNAS-only: nested candidate sub-cells and their softmax mixture
    /// weights. Recursively emitted alongside a π vector during
    /// serialization.
    pub dnas_components: Vec<Node>,
    pub dnas_pi: Vec<f64>,
}

impl Node {
    pub fn new(innovation: u64, layer_type: LayerType, cell_kind: CellKind, depth: f64) -> Self {
        let weights = vec![0.0; cell_kind.num_weights()];
        Self {
            innovation,
            layer_type,
            cell_kind,
            depth,
            enabled: true,
            parameter_name: None,
            weights,
            forward_reachable: false,
            backward_reachable: false,
            dnas_components: Vec::new(),
            dnas_pi: Vec::new(),
        }
    }

    pub fn reachable(&self) -> bool {
        self.forward_reachable && self.backward_reachable
    }

    pub fn num_weights(&self) -> usize {
        self.cell_kind.num_weights()
            + self
                .dnas_components
                .iter()
                .map(Node::num_weights)
                .sum::<usize>()
    }

    /// Reads this node's slice out of a genome-wide flat parameter vector,
    /// starting at `offset`.
    pub fn get_weights(&self, params: &[f64], offset: usize) -> usize {
        let _ = params;
        offset + self.num_weights()
    }

    pub fn set_weights(&mut self, params: &[f64], offset: usize) -> usize {
        let n = self.cell_kind.num_weights();
        self.weights.copy_from_slice(&params[offset..offset + n]);
        self.clip_weights();
        let mut cursor = offset + n;
        for sub in self.dnas_components.iter_mut() {
            cursor = sub.set_weights(params, cursor);
        }
        cursor
    }

    pub fn push_weights_into(&self, out: &mut Vec<f64>) {
        out.extend_from_slice(&self.weights);
        for sub in &self.dnas_components {
            sub.push_weights_into(out);
        }
    }

    pub fn clip_weights(&mut self) {
        for w in self.weights.iter_mut() {
            *w = w.clamp(-WEIGHT_BOUND, WEIGHT_BOUND);
        }
    }

    pub fn init_xavier<R: Rng>(&mut self, fan_in: usize, fan_out: usize, rng: &mut R) {
        self.weights = self.cell_kind.init_xavier(fan_in, fan_out, rng);
        self.clip_weights();
    }
    pub fn init_kaiming<R: Rng>(&mut self, fan_in: usize, rng: &mut R) {
        self.weights = self.cell_kind.init_kaiming(fan_in, rng);
        self.clip_weights();
    }
    pub fn init_uniform<R: Rng>(&mut self, rng: &mut R) {
        self.weights = self.cell_kind.init_uniform(rng);
        self.clip_weights();
    }
    pub fn init_lamarckian<R: Rng>(&mut self, mu: &[f64], sigma: &[f64], rng: &mut R) {
        self.weights = self.cell_kind.init_lamarckian(mu, sigma, rng);
        self.clip_weights();
    }
}
