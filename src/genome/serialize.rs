//! Binary genome encoding: a fixed preamble of scalar fields followed by
//! length-prefixed node/edge/recurrent-edge blocks and normalization maps.
use super::Genome;
use crate::edge::{Edge, RecurrentEdge};
use crate::error::DeserializeError;
use crate::node::{CellKind, LayerType, Node};
use crate::serialize_helpers::{
    write_bool, write_f64, write_f64_vec, write_i32, write_i64_vec, write_string,
    write_string_f64_map, write_u32, write_u64, Reader,
};

fn layer_type_tag(t: LayerType) -> i32 {
    match t {
        LayerType::Input => 0,
        LayerType::Hidden => 1,
        LayerType::Output => 2,
    }
}
fn layer_type_from_tag(tag: i32) -> Result<LayerType, DeserializeError> {
    match tag {
        0 => Ok(LayerType::Input),
        1 => Ok(LayerType::Hidden),
        2 => Ok(LayerType::Output),
        other => Err(DeserializeError(format!("unknown layer type tag {other}"))),
    }
}

fn cell_kind_tag(k: CellKind) -> i32 {
    match k {
        CellKind::Simple => 0,
        CellKind::Jordan => 1,
        CellKind::Elman => 2,
        CellKind::Lstm => 3,
        CellKind::Gru => 4,
        CellKind::Mgu => 5,
        CellKind::Ugrnn => 6,
        CellKind::Delta => 7,
        CellKind::Enarc => 8,
        CellKind::EnasDag => 9,
        CellKind::RandomDag => 10,
        CellKind::Dnas => 11,
        CellKind::Sin => 12,
        CellKind::Cos => 13,
        CellKind::Tanh => 14,
        CellKind::Sigmoid => 15,
        CellKind::Inverse => 16,
        CellKind::Sum => 17,
        CellKind::Multiply => 18,
    }
}
fn cell_kind_from_tag(tag: i32) -> Result<CellKind, DeserializeError> {
    Ok(match tag {
        0 => CellKind::Simple,
        1 => CellKind::Jordan,
        2 => CellKind::Elman,
        3 => CellKind::Lstm,
        4 => CellKind::Gru,
        5 => CellKind::Mgu,
        6 => CellKind::Ugrnn,
        7 => CellKind::Delta,
        8 => CellKind::Enarc,
        9 => CellKind::EnasDag,
        10 => CellKind::RandomDag,
        11 => CellKind::Dnas,
        12 => CellKind::Sin,
        13 => CellKind::Cos,
        14 => CellKind::Tanh,
        15 => CellKind::Sigmoid,
        16 => CellKind::Inverse,
        17 => CellKind::Sum,
        18 => CellKind::Multiply,
        other => return Err(DeserializeError(format!("unknown cell kind tag {other}"))),
    })
}

fn write_node(out: &mut Vec<u8>, node: &Node) {
    write_u64(out, node.innovation);
    write_i32(out, layer_type_tag(node.layer_type));
    write_i32(out, cell_kind_tag(node.cell_kind));
    write_f64(out, node.depth);
    write_bool(out, node.enabled);
    write_bool(out, node.parameter_name.is_some());
    if let Some(name) = &node.parameter_name {
        write_string(out, name);
    }
    write_f64_vec(out, &node.weights);
    write_u32(out, node.dnas_components.len() as u32);
    for sub in &node.dnas_components {
        write_node(out, sub);
    }
    write_f64_vec(out, &node.dnas_pi);
}

fn read_node(r: &mut Reader) -> Result<Node, DeserializeError> {
    let innovation = r.read_u64()?;
    let layer_type = layer_type_from_tag(r.read_i32()?)?;
    let cell_kind = cell_kind_from_tag(r.read_i32()?)?;
    let depth = r.read_f64()?;
    let enabled = r.read_bool()?;
    let has_name = r.read_bool()?;
    let parameter_name = if has_name { Some(r.read_string()?) } else { None };
    let weights = r.read_f64_vec()?;
    let num_dnas = r.read_u32()?;
    let mut dnas_components = Vec::with_capacity(num_dnas as usize);
    for _ in 0..num_dnas {
        dnas_components.push(read_node(r)?);
    }
    let dnas_pi = r.read_f64_vec()?;
    Ok(Node {
        innovation,
        layer_type,
        cell_kind,
        depth,
        enabled,
        parameter_name,
        weights,
        forward_reachable: false,
        backward_reachable: false,
        dnas_components,
        dnas_pi,
    })
}

fn write_edge(out: &mut Vec<u8>, edge: &Edge) {
    write_u64(out, edge.innovation);
    write_u32(out, edge.input_node as u32);
    write_u32(out, edge.output_node as u32);
    write_f64(out, edge.weight);
    write_bool(out, edge.enabled);
}

fn read_edge(r: &mut Reader) -> Result<Edge, DeserializeError> {
    let innovation = r.read_u64()?;
    let input_node = r.read_u32()? as usize;
    let output_node = r.read_u32()? as usize;
    let weight = r.read_f64()?;
    let enabled = r.read_bool()?;
    Ok(Edge {
        innovation,
        input_node,
        output_node,
        weight,
        enabled,
        forward_reachable: false,
        backward_reachable: false,
    })
}

fn write_recurrent_edge(out: &mut Vec<u8>, edge: &RecurrentEdge) {
    write_u64(out, edge.innovation);
    write_u32(out, edge.input_node as u32);
    write_u32(out, edge.output_node as u32);
    write_u32(out, edge.recurrent_depth as u32);
    write_f64(out, edge.weight);
    write_bool(out, edge.enabled);
}

fn read_recurrent_edge(r: &mut Reader) -> Result<RecurrentEdge, DeserializeError> {
    let innovation = r.read_u64()?;
    let input_node = r.read_u32()? as usize;
    let output_node = r.read_u32()? as usize;
    let recurrent_depth = r.read_u32()? as usize;
    let weight = r.read_f64()?;
    let enabled = r.read_bool()?;
    Ok(RecurrentEdge {
        innovation,
        input_node,
        output_node,
        recurrent_depth,
        weight,
        enabled,
        forward_reachable: false,
        backward_reachable: false,
    })
}

impl Genome {
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        write_u64(&mut out, self.generation_id);
        write_u32(&mut out, self.group_id as u32);
        write_i32(&mut out, self.bp_iterations as i32);
        write_bool(&mut out, self.dropout);
        write_f64(&mut out, self.dropout_probability);

        write_u32(&mut out, self.input_parameter_names.len() as u32);
        for name in &self.input_parameter_names {
            write_string(&mut out, name);
        }
        write_u32(&mut out, self.output_parameter_names.len() as u32);
        for name in &self.output_parameter_names {
            write_string(&mut out, name);
        }

        write_u32(&mut out, self.nodes.len() as u32);
        for node in &self.nodes {
            write_node(&mut out, node);
        }
        write_u32(&mut out, self.edges.len() as u32);
        for edge in &self.edges {
            write_edge(&mut out, edge);
        }
        write_u32(&mut out, self.recurrent_edges.len() as u32);
        for edge in &self.recurrent_edges {
            write_recurrent_edge(&mut out, edge);
        }

        write_string(&mut out, &self.normalize_type);
        write_string_f64_map(&mut out, &self.normalize_mins);
        write_string_f64_map(&mut out, &self.normalize_maxs);
        write_string_f64_map(&mut out, &self.normalize_avgs);
        write_string_f64_map(&mut out, &self.normalize_std_devs);

        write_i64_vec(&mut out, &self.training_indices);
        write_f64(&mut out, self.best_validation_mse);
        write_f64(&mut out, self.best_validation_mae);
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DeserializeError> {
        let mut r = Reader::new(bytes);
        let generation_id = r.read_u64()?;
        let group_id = r.read_u32()? as usize;
        let bp_iterations = r.read_i32()? as usize;
        let dropout = r.read_bool()?;
        let dropout_probability = r.read_f64()?;

        let num_inputs = r.read_u32()?;
        let mut input_parameter_names = Vec::with_capacity(num_inputs as usize);
        for _ in 0..num_inputs {
            input_parameter_names.push(r.read_string()?);
        }
        let num_outputs = r.read_u32()?;
        let mut output_parameter_names = Vec::with_capacity(num_outputs as usize);
        for _ in 0..num_outputs {
            output_parameter_names.push(r.read_string()?);
        }

        let num_nodes = r.read_u32()?;
        let mut nodes = Vec::with_capacity(num_nodes as usize);
        for _ in 0..num_nodes {
            nodes.push(read_node(&mut r)?);
        }
        let num_edges = r.read_u32()?;
        let mut edges = Vec::with_capacity(num_edges as usize);
        for _ in 0..num_edges {
            edges.push(read_edge(&mut r)?);
        }
        let num_recurrent = r.read_u32()?;
        let mut recurrent_edges = Vec::with_capacity(num_recurrent as usize);
        for _ in 0..num_recurrent {
            recurrent_edges.push(read_recurrent_edge(&mut r)?);
        }

        let normalize_type = r.read_string()?;
        let normalize_mins = r.read_string_f64_map()?;
        let normalize_maxs = r.read_string_f64_map()?;
        let normalize_avgs = r.read_string_f64_map()?;
        let normalize_std_devs = r.read_string_f64_map()?;

        let training_indices = r.read_i64_vec()?;
        let best_validation_mse = r.read_f64()?;
        let best_validation_mae = r.read_f64()?;

        let mut genome = Genome {
            nodes,
            edges,
            recurrent_edges,
            next_innovation: 0,
            group_id,
            generation_id,
            input_parameter_names,
            output_parameter_names,
            initial_parameters: Vec::new(),
            best_parameters: Vec::new(),
            best_validation_mse,
            best_validation_mae,
            bp_iterations,
            dropout,
            dropout_probability,
            normalize_type,
            normalize_mins,
            normalize_maxs,
            normalize_avgs,
            normalize_std_devs,
            training_indices,
            log_filename: String::new(),
            rng_state_strings: Vec::new(),
            fitness: super::EXAMM_MAX_DOUBLE,
            total_inputs: 0,
            total_outputs: 0,
        };
        genome.next_innovation = genome
            .nodes
            .iter()
            .map(|n| n.innovation)
            .chain(genome.edges.iter().map(|e| e.innovation))
            .chain(genome.recurrent_edges.iter().map(|e| e.innovation))
            .max()
            .map_or(0, |m| m + 1);
        genome.assign_reachability();
        genome.best_parameters = genome.get_weights();
        genome.initial_parameters = genome.best_parameters.clone();
        Ok(genome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CellKind;

    #[test]
    fn round_trip_preserves_structural_hash() {
        let genome = Genome::new_seed(
            vec!["a".into(), "b".into()],
            vec!["y".into()],
            CellKind::Lstm,
        );
        let bytes = genome.to_bytes();
        let restored = Genome::from_bytes(&bytes).unwrap();
        assert_eq!(genome.structural_hash(), restored.structural_hash());
        assert_eq!(genome.get_number_weights(), restored.get_number_weights());
    }

    #[test]
    fn truncated_stream_is_rejected() {
        let genome = Genome::new_seed(vec!["a".into()], vec!["y".into()], CellKind::Simple);
        let mut bytes = genome.to_bytes();
        bytes.truncate(bytes.len() / 2);
        assert!(Genome::from_bytes(&bytes).is_err());
    }
}
