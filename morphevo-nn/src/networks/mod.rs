//! A Network is a simple near-isomorphism of a Genome
//! generated as the phenotype of said Genome,
//! with suppressed genes being ignored. Genes are
//! converted into connections, and genome nodes
//! into network nodes.
//!
//! [`RealTimeNetwork`] is the controller type: new inputs are set
//! for each activation, and signals advance one connection per
//! activation, so recurrent controllers keep state across steps.
//! [`CppnNetwork`] wraps one for instantaneous function queries.
//! [`RobotNetwork`] pairs a controller with the sensor morphology
//! its inputs are read from.
mod connection;
mod cppn;
mod robot;

pub use cppn::CppnNetwork;
pub use robot::{Encoding, RobotNetwork};

use crate::genomics::{ActivationType, NNGenome, NodeType};
use connection::Connection;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashMap;
use std::fmt;

/// A neural network best suited for real-time control tasks.
///
/// Nodes are laid out as inputs, then outputs, then hidden nodes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RealTimeNetwork {
    input_count: usize,
    output_count: usize,
    input_sums: Box<[f32]>,
    activation_levels: Box<[f32]>,
    activation_functions: Box<[ActivationType]>,
    connections: Box<[Box<[Connection]>]>,
}

impl RealTimeNetwork {
    /// Generates the phenotype of `genome`.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    /// use morphevo_nn::networks::RealTimeNetwork;
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let network = RealTimeNetwork::new(&NNGenome::new(&config));
    ///
    /// assert_eq!(network.input_count(), 3);
    /// assert_eq!(network.output_count(), 2);
    /// assert_eq!(network.connection_count(), 6);
    /// ```
    pub fn new(genome: &NNGenome) -> RealTimeNetwork {
        let mut input_nodes = vec![];
        let mut output_nodes = vec![];
        let mut hidden_nodes = vec![];

        for node in genome.nodes() {
            match node.node_type() {
                NodeType::Sensor => &mut input_nodes,
                NodeType::Actuator => &mut output_nodes,
                NodeType::Neuron => &mut hidden_nodes,
            }
            .push((node.innovation(), node.activation_type()));
        }
        // Sorting by id makes the resulting network
        // deterministic, independently of node iteration order.
        input_nodes.sort_unstable_by_key(|(id, _)| *id);
        output_nodes.sort_unstable_by_key(|(id, _)| *id);
        hidden_nodes.sort_unstable_by_key(|(id, _)| *id);

        let node_index_from_id: HashMap<_, _, RandomState> = input_nodes
            .iter()
            .chain(&output_nodes)
            .chain(&hidden_nodes)
            .enumerate()
            .map(|(i, (id, _))| (*id, i))
            .collect();

        let output_activations: Vec<_> = output_nodes.iter().map(|(_, a)| *a).collect();
        let hidden_activations: Vec<_> = hidden_nodes.iter().map(|(_, a)| *a).collect();
        let connections = genome
            .genes()
            .filter(|g| !g.suppressed())
            .filter_map(|g| {
                Some((
                    *node_index_from_id.get(&g.input())?,
                    *node_index_from_id.get(&g.output())?,
                    g.weight(),
                ))
            });

        Self::from_layout(
            input_nodes.len(),
            &output_activations,
            &hidden_activations,
            connections,
        )
    }

    /// Builds a network from an explicit layout. Node indices
    /// run over inputs first, then outputs, then hidden nodes;
    /// `connections` are `(from, to, weight)` triples over them.
    /// Connections into input nodes, or between nonexistent
    /// nodes, are ignored.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::ActivationType;
    /// use morphevo_nn::networks::RealTimeNetwork;
    ///
    /// // One input feeding one identity output through one hidden node.
    /// let mut network = RealTimeNetwork::from_layout(
    ///     1,
    ///     &[ActivationType::Identity],
    ///     &[ActivationType::Identity],
    ///     vec![(0, 2, 2.0), (2, 1, 3.0)],
    /// );
    /// network.set_inputs(&[1.0]);
    /// network.activate();
    /// network.activate();
    /// assert_eq!(network.outputs(), vec![6.0]);
    /// ```
    pub fn from_layout(
        input_count: usize,
        output_activations: &[ActivationType],
        hidden_activations: &[ActivationType],
        connections: impl IntoIterator<Item = (usize, usize, f32)>,
    ) -> RealTimeNetwork {
        let output_count = output_activations.len();
        let total_node_count = input_count + output_count + hidden_activations.len();

        let activation_functions: Vec<ActivationType> =
            std::iter::repeat(ActivationType::Identity)
                .take(input_count)
                .chain(output_activations.iter().copied())
                .chain(hidden_activations.iter().copied())
                .collect();

        let mut outgoing = vec![vec![]; total_node_count];
        for (from, to, weight) in connections {
            if from < total_node_count && (input_count..total_node_count).contains(&to) {
                outgoing[from].push(Connection::new(to, weight));
            }
        }

        RealTimeNetwork {
            input_count,
            output_count,
            input_sums: vec![0.0; total_node_count].into(),
            activation_levels: vec![0.0; total_node_count].into(),
            activation_functions: activation_functions.into(),
            connections: outgoing.into_iter().map(|v| v.into()).collect(),
        }
    }

    /// Activates the network: every node sends its current
    /// activation along its connections, and every non-input
    /// node then computes its new activation.
    pub fn activate(&mut self) {
        self.fire_nodes();
        self.compute_activations();
    }

    fn fire_nodes(&mut self) {
        for (activation, output_connections) in
            self.activation_levels.iter().zip(self.connections.iter())
        {
            for connection in output_connections.iter() {
                self.input_sums[connection.output] += *activation * connection.weight;
            }
        }
    }

    fn compute_activations(&mut self) {
        for ((input_sum, activation_level), activation_function) in self.input_sums
            [self.input_count..]
            .iter_mut()
            .zip(&mut self.activation_levels[self.input_count..])
            .zip(&self.activation_functions[self.input_count..])
        {
            *activation_level = activation_function.apply(*input_sum);
            *input_sum = 0.0;
        }
    }

    /// Resets all activations to 0.
    pub fn clear_state(&mut self) {
        self.input_sums.iter_mut().for_each(|s| *s = 0.0);
        self.activation_levels.iter_mut().for_each(|a| *a = 0.0);
    }

    /// Sets the activations of the input nodes.
    ///
    /// # Panics
    /// This function panics if `values` does not have
    /// exactly one value per input node.
    pub fn set_inputs(&mut self, values: &[f32]) {
        self.activation_levels[..self.input_count].copy_from_slice(values);
    }

    /// Returns the activations of the output nodes.
    pub fn outputs(&self) -> Vec<f32> {
        self.activation_levels[self.input_count..self.input_count + self.output_count].to_vec()
    }

    pub fn input_count(&self) -> usize {
        self.input_count
    }

    pub fn output_count(&self) -> usize {
        self.output_count
    }

    /// Returns the number of hidden nodes.
    pub fn hidden_count(&self) -> usize {
        self.activation_levels.len() - self.input_count - self.output_count
    }

    /// Returns the number of expressed connections.
    pub fn connection_count(&self) -> usize {
        self.connections.iter().map(|c| c.len()).sum()
    }
}

impl fmt::Display for RealTimeNetwork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "RealTimeNetwork[{} in, {} hidden, {} out, {} connections]",
            self.input_count,
            self.hidden_count(),
            self.output_count,
            self.connection_count()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::GeneticConfig;
    use std::num::NonZeroUsize;

    fn sigmoid(x: f32) -> f32 {
        1.0 / (1.0 + (-4.9 * x).exp())
    }

    #[test]
    fn from_genome() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            output_activation_types: vec![ActivationType::Sigmoid, ActivationType::Gaussian],
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_node(4, ActivationType::Sigmoid).unwrap();

        let ids = [0, 2, 6, 7, 3, 5, 4];
        let inputs = [0, 0, 1, 3, 4, 4, 4];
        let outputs = [2, 4, 4, 3, 3, 2, 4];
        let weights = [1.0, 1.0, 2.5, -2.0, -1.0, -1.5, 3.2];

        for i in 0..7 {
            genome.add_gene(ids[i], inputs[i], outputs[i], weights[i]).unwrap();
        }
        // Suppressed gene shouldn't be expressed in network.
        genome.add_gene(1, 0, 3, -1.0).unwrap().set_suppressed(true);

        let network = RealTimeNetwork::new(&genome);
        assert_eq!(network.input_count(), 2);
        assert_eq!(network.output_count(), 2);
        assert_eq!(network.hidden_count(), 1);
        assert_eq!(network.connection_count(), 7);
        assert_eq!(network.activation_functions[2], ActivationType::Sigmoid);
        assert_eq!(network.activation_functions[3], ActivationType::Gaussian);
        assert!(!network.connections[0].contains(&Connection::new(3, -1.0)));
        // Node ids map onto indices directly here: 0,1 in; 2,3 out; 4 hidden.
        for idx in 0..7 {
            assert!(network.connections[inputs[idx]]
                .contains(&Connection::new(outputs[idx], weights[idx])));
        }
    }

    #[test]
    fn activate_empty() {
        let genome = NNGenome::new(&GeneticConfig::zero());
        let mut network = RealTimeNetwork::new(&genome);
        assert!((0..100).all(|_| {
            network.activate();
            network.outputs()[0] == sigmoid(0.0)
        }));
    }

    #[test]
    fn activate_single() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_gene(0, 0, 1, 1.0).unwrap();
        let mut network = RealTimeNetwork::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            network.clear_state();
            network.set_inputs(&[input]);
            network.activate();
            assert_eq!(network.outputs()[0], sigmoid(input))
        }
    }

    #[test]
    fn activate_single_recursive() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_gene(0, 0, 1, 1.0).unwrap();
        genome.add_gene(1, 1, 1, -1.0).unwrap();
        let mut network = RealTimeNetwork::new(&genome);
        let mut prev_output = 0.0;
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            network.set_inputs(&[input]);
            network.activate();
            assert_eq!(network.outputs()[0], sigmoid(input - prev_output));
            prev_output = network.outputs()[0];
        }
    }

    #[test]
    fn activate_double() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_node(2, ActivationType::Sigmoid).unwrap();
        genome.add_gene(0, 0, 2, 1.0).unwrap();
        genome.add_gene(1, 2, 1, 1.0).unwrap();
        let mut network = RealTimeNetwork::new(&genome);
        for input in -20..=20 {
            let input = input as f32 / 10.0;
            network.clear_state();
            network.set_inputs(&[input]);
            network.activate();
            network.activate();
            assert_eq!(network.outputs()[0], sigmoid(sigmoid(input)))
        }
    }

    #[test]
    fn layout_ignores_connections_into_inputs() {
        let network = RealTimeNetwork::from_layout(
            2,
            &[ActivationType::Sigmoid],
            &[],
            vec![(0, 1, 1.0), (2, 0, 1.0), (0, 9, 1.0), (1, 2, 0.5)],
        );
        assert_eq!(network.connection_count(), 1);
    }

    #[test]
    fn layout_without_inputs_still_runs() {
        let mut network = RealTimeNetwork::from_layout(
            0,
            &[ActivationType::Sigmoid, ActivationType::Sigmoid],
            &[],
            vec![],
        );
        network.set_inputs(&[]);
        network.activate();
        assert_eq!(network.outputs(), vec![0.5, 0.5]);
    }
}
