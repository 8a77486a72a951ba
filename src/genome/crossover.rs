//! Innovation-aligned crossover between two parent genomes.
use super::Genome;
use crate::edge::{Edge, RecurrentEdge};
use crate::node::Node;
use itertools::Itertools;
use rand::Rng;
use rustc_hash::FxHashMap;

/// Recombines `more_fit` and `less_fit` by innovation number: matching genes
/// are blended by weight, disjoint/excess genes are inherited from whichever
/// parent introduced them, weighted toward the fitter parent. A disabled
/// gene in either parent has a chance of re-enabling in the child.
pub fn crossover<R: Rng>(more_fit: &Genome, less_fit: &Genome, rng: &mut R) -> Genome {
    let mut child = more_fit.clone();
    child.nodes.clear();
    child.edges.clear();
    child.recurrent_edges.clear();

    let mut node_by_innovation: FxHashMap<u64, Node> = FxHashMap::default();
    for node in &more_fit.nodes {
        node_by_innovation.insert(node.innovation, node.clone());
    }
    for node in &less_fit.nodes {
        node_by_innovation
            .entry(node.innovation)
            .or_insert_with(|| node.clone());
    }
    let innovations: Vec<u64> = node_by_innovation.keys().copied().sorted().collect();

    let mut old_to_new: FxHashMap<u64, usize> = FxHashMap::default();
    for innovation in innovations {
        let mut node = node_by_innovation.remove(&innovation).unwrap();
        let matched_in_less = less_fit.nodes.iter().find(|n| n.innovation == innovation);
        if let (Some(more), Some(less)) = (
            more_fit.nodes.iter().find(|n| n.innovation == innovation),
            matched_in_less,
        ) {
            for (w, (a, b)) in node
                .weights
                .iter_mut()
                .zip(more.weights.iter().zip(less.weights.iter()))
            {
                *w = (a + b) / 2.0;
            }
            node.enabled = more.enabled || (less.enabled && rng.gen_bool(0.25));
        }
        old_to_new.insert(innovation, child.nodes.len());
        child.nodes.push(node);
    }

    let mut edge_by_innovation: FxHashMap<u64, Edge> = FxHashMap::default();
    for edge in &more_fit.edges {
        edge_by_innovation.insert(edge.innovation, edge.clone());
    }
    for edge in &less_fit.edges {
        edge_by_innovation
            .entry(edge.innovation)
            .or_insert_with(|| edge.clone());
    }
    for (_, mut edge) in edge_by_innovation {
        let in_innovation = more_fit
            .nodes
            .get(edge.input_node)
            .or_else(|| less_fit.nodes.get(edge.input_node))
            .map(|n| n.innovation);
        let out_innovation = more_fit
            .nodes
            .get(edge.output_node)
            .or_else(|| less_fit.nodes.get(edge.output_node))
            .map(|n| n.innovation);
        let (Some(in_i), Some(out_i)) = (in_innovation, out_innovation) else {
            continue;
        };
        let (Some(&new_in), Some(&new_out)) = (old_to_new.get(&in_i), old_to_new.get(&out_i))
        else {
            continue;
        };
        if let (Some(more), Some(less)) = (
            more_fit.edges.iter().find(|e| e.innovation == edge.innovation),
            less_fit.edges.iter().find(|e| e.innovation == edge.innovation),
        ) {
            edge.weight = (more.weight + less.weight) / 2.0;
            edge.enabled = more.enabled || (less.enabled && rng.gen_bool(0.25));
        }
        edge.input_node = new_in;
        edge.output_node = new_out;
        child.edges.push(edge);
    }

    let mut rec_by_innovation: FxHashMap<u64, RecurrentEdge> = FxHashMap::default();
    for edge in &more_fit.recurrent_edges {
        rec_by_innovation.insert(edge.innovation, edge.clone());
    }
    for edge in &less_fit.recurrent_edges {
        rec_by_innovation
            .entry(edge.innovation)
            .or_insert_with(|| edge.clone());
    }
    for (_, mut edge) in rec_by_innovation {
        let in_innovation = more_fit
            .nodes
            .get(edge.input_node)
            .or_else(|| less_fit.nodes.get(edge.input_node))
            .map(|n| n.innovation);
        let out_innovation = more_fit
            .nodes
            .get(edge.output_node)
            .or_else(|| less_fit.nodes.get(edge.output_node))
            .map(|n| n.innovation);
        let (Some(in_i), Some(out_i)) = (in_innovation, out_innovation) else {
            continue;
        };
        let (Some(&new_in), Some(&new_out)) = (old_to_new.get(&in_i), old_to_new.get(&out_i))
        else {
            continue;
        };
        edge.input_node = new_in;
        edge.output_node = new_out;
        child.recurrent_edges.push(edge);
    }

    child.assign_reachability();
    child.best_parameters = child.get_weights();
    child.initial_parameters = child.best_parameters.clone();
    child.fitness = super::EXAMM_MAX_DOUBLE;
    child
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::CellKind;
    use rand::rngs::SmallRng;
    use rand::SeedableRng;

    #[test]
    fn crossover_of_identical_seeds_yields_same_topology() {
        let a = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        let b = a.clone();
        let mut rng = SmallRng::seed_from_u64(3);
        let child = crossover(&a, &b, &mut rng);
        assert_eq!(child.nodes.len(), a.nodes.len());
        assert_eq!(child.edges.len(), a.edges.len());
        assert!(!child.outputs_unreachable());
    }

    #[test]
    fn crossover_child_has_fresh_fitness() {
        let mut a = Genome::new_seed(vec!["x".into()], vec!["y".into()], CellKind::Simple);
        a.fitness = 0.5;
        let mut b = a.clone();
        b.fitness = 0.25;
        let mut rng = SmallRng::seed_from_u64(9);
        let child = crossover(&b, &a, &mut rng);
        assert_eq!(child.fitness, super::super::EXAMM_MAX_DOUBLE);
    }
}
