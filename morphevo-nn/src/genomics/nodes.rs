use crate::Innovation;

use ahash::RandomState;
use serde::{Deserialize, Serialize};

use std::collections::HashSet;
use std::fmt;

/// Node activation functions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum ActivationType {
    /// `1 / (1 + exp(-4.9x))`
    Sigmoid,
    /// `x`
    Identity,
    /// `max(x, 0)`
    ReLU,
    /// `exp(-x²)`
    Gaussian,
    /// `sin(πx)`
    Sinusoidal,
}

impl ActivationType {
    /// Applies the activation function to `x`.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::ActivationType;
    ///
    /// assert_eq!(ActivationType::Sigmoid.apply(0.0), 0.5);
    /// assert_eq!(ActivationType::ReLU.apply(-3.0), 0.0);
    /// assert_eq!(ActivationType::Gaussian.apply(0.0), 1.0);
    /// ```
    pub fn apply(self, x: f32) -> f32 {
        match self {
            ActivationType::Sigmoid => 1.0 / (1.0 + (-4.9 * x).exp()),
            ActivationType::Identity => x,
            ActivationType::ReLU => x.max(0.0),
            ActivationType::Gaussian => (-x.powi(2)).exp(),
            ActivationType::Sinusoidal => (x * std::f32::consts::PI).sin(),
        }
    }
}

/// Node types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeType {
    /// Input node; one per robot sensor (or CPPN coordinate).
    Sensor,
    /// Hidden node.
    Neuron,
    /// Output node; one per robot actuator (or CPPN output).
    Actuator,
}

/// Nodes are the structural elements of genomes
/// between which genes are created. They keep
/// track of the genes entering and leaving them.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Node {
    id: Innovation,
    inputs: HashSet<Innovation, RandomState>,
    outputs: HashSet<Innovation, RandomState>,
    node_type: NodeType,
    activation_type: ActivationType,
}

impl Node {
    /// Returns a new node with no connected genes.
    pub fn new(id: Innovation, node_type: NodeType, activation_type: ActivationType) -> Node {
        Node {
            id,
            inputs: HashSet::default(),
            outputs: HashSet::default(),
            node_type,
            activation_type,
        }
    }

    /// Records a gene entering the node.
    /// Returns `false` if it was already recorded.
    pub(super) fn link_input_gene(&mut self, gene_id: Innovation) -> bool {
        self.inputs.insert(gene_id)
    }

    /// Forgets a gene entering the node.
    /// Returns `false` if it was not recorded.
    pub(super) fn unlink_input_gene(&mut self, gene_id: Innovation) -> bool {
        self.inputs.remove(&gene_id)
    }

    /// Records a gene leaving the node.
    /// Returns `false` if it was already recorded.
    pub(super) fn link_output_gene(&mut self, gene_id: Innovation) -> bool {
        self.outputs.insert(gene_id)
    }

    /// Forgets a gene leaving the node.
    /// Returns `false` if it was not recorded.
    pub(super) fn unlink_output_gene(&mut self, gene_id: Innovation) -> bool {
        self.outputs.remove(&gene_id)
    }

    /// Returns the node's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns an iterator over the innovation numbers
    /// of the genes entering the node.
    pub fn input_genes(&self) -> impl Iterator<Item = &Innovation> {
        self.inputs.iter()
    }

    /// Returns an iterator over the innovation numbers
    /// of the genes leaving the node.
    pub fn output_genes(&self) -> impl Iterator<Item = &Innovation> {
        self.outputs.iter()
    }

    pub fn node_type(&self) -> NodeType {
        self.node_type
    }

    pub fn activation_type(&self) -> ActivationType {
        self.activation_type
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}[{:?}, {:?}, IN: {:?}, OUT: {:?}]",
            self.id, self.node_type, self.activation_type, self.inputs, self.outputs,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linking_is_idempotent() {
        let mut node = Node::new(3, NodeType::Neuron, ActivationType::Sigmoid);
        assert!(node.link_input_gene(10));
        assert!(!node.link_input_gene(10));
        assert!(node.link_output_gene(11));
        assert_eq!(node.input_genes().count(), 1);
        assert!(node.unlink_output_gene(11));
        assert!(!node.unlink_output_gene(11));
        assert!(!node.unlink_input_gene(99));
    }

    #[test]
    fn sinusoid_is_periodic() {
        let f = ActivationType::Sinusoidal;
        assert!((f.apply(0.5) - f.apply(2.5)).abs() < 1e-5);
    }
}
