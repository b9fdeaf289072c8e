use crate::genomics::NNGenome;
use crate::networks::RealTimeNetwork;

/// A network queried as a function of its inputs, such as the
/// compositional pattern-producing network of an indirect encoding.
///
/// Each query starts from a cleared state and activates the
/// network enough times for a signal to cross every non-input
/// node once, so feed-forward networks always settle.
#[derive(Clone, Debug)]
pub struct CppnNetwork {
    network: RealTimeNetwork,
    settle_steps: usize,
}

impl From<&NNGenome> for CppnNetwork {
    /// Generates a new network from the passed genome.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    /// use morphevo_nn::networks::CppnNetwork;
    ///
    /// let genome = NNGenome::new(&GeneticConfig::zero());
    /// let network = CppnNetwork::from(&genome);
    /// assert_eq!(network.input_count(), 1);
    /// ```
    fn from(genome: &NNGenome) -> CppnNetwork {
        let network = RealTimeNetwork::new(genome);
        let settle_steps = (network.output_count() + network.hidden_count()).max(1);
        CppnNetwork {
            network,
            settle_steps,
        }
    }
}

impl CppnNetwork {
    /// Returns the network's value at the point given by `inputs`.
    ///
    /// # Panics
    /// This function panics if `inputs` does not have
    /// exactly one value per input node.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{ActivationType, GeneticConfig, NNGenome};
    /// use morphevo_nn::networks::CppnNetwork;
    ///
    /// fn sigmoid(x: f32) -> f32 {
    ///     1.0 / (1.0 + (-4.9 * x).exp())
    /// }
    ///
    /// // Create a network with two chained sigmoid nodes.
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// genome.add_node(2, ActivationType::Sigmoid).unwrap();
    /// genome.add_gene(0, 0, 2, 1.0).unwrap();
    /// genome.add_gene(1, 2, 1, 1.0).unwrap();
    /// let mut network = CppnNetwork::from(&genome);
    ///
    /// // The result is identical to double application of a sigmoid function.
    /// for input in -20..=20 {
    ///     let input = input as f32 / 10.0;
    ///     assert_eq!(network.query(&[input])[0], sigmoid(sigmoid(input)));
    /// }
    /// ```
    pub fn query(&mut self, inputs: &[f32]) -> Vec<f32> {
        self.network.clear_state();
        self.network.set_inputs(inputs);
        for _ in 0..self.settle_steps {
            self.network.activate();
        }
        self.network.outputs()
    }

    pub fn input_count(&self) -> usize {
        self.network.input_count()
    }

    pub fn output_count(&self) -> usize {
        self.network.output_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genomics::{ActivationType, GeneticConfig};
    use std::num::NonZeroUsize;

    #[test]
    fn queries_are_independent() {
        let mut genome = NNGenome::new(&GeneticConfig::zero());
        genome.add_gene(0, 0, 1, 1.0).unwrap();
        genome.add_gene(1, 1, 1, 1.0).unwrap();
        let mut network = CppnNetwork::from(&genome);
        let first = network.query(&[0.3]);
        network.query(&[-2.0]);
        assert_eq!(network.query(&[0.3]), first);
    }

    #[test]
    fn deep_chains_settle() {
        let config = GeneticConfig {
            output_activation_types: vec![ActivationType::Identity],
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        let mut previous = 0;
        for (i, node) in (2..6).enumerate() {
            genome.add_node(node, ActivationType::Identity).unwrap();
            genome.add_gene(i, previous, node, 2.0).unwrap();
            previous = node;
        }
        genome.add_gene(10, previous, 1, 1.0).unwrap();
        let mut network = CppnNetwork::from(&genome);
        assert_eq!(network.query(&[1.0]), vec![16.0]);
    }

    #[test]
    fn multiple_inputs() {
        let config = GeneticConfig {
            input_count: NonZeroUsize::new(3).unwrap(),
            output_activation_types: vec![ActivationType::Identity],
            ..GeneticConfig::zero()
        };
        let mut genome = NNGenome::new(&config);
        genome.add_gene(0, 0, 3, -1.0).unwrap();
        genome.add_gene(1, 1, 3, 1.0).unwrap();
        genome.add_gene(2, 2, 3, 0.5).unwrap();
        let mut network = CppnNetwork::from(&genome);
        assert_eq!(network.query(&[1.0, 2.0, 4.0]), vec![3.0]);
    }
}
