use crate::genomics::GeneticConfig;
use crate::Innovation;

use std::fmt;

use rand::{thread_rng, Rng};
use serde::{Deserialize, Serialize};

/// Genes are the principal components of genomes.
/// They are created between two nodes, and mainly
/// serve as the representation of the network
/// connections in their genome's neural network.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct Gene {
    id: Innovation,
    input: Innovation,
    output: Innovation,
    weight: f32,
    suppressed: bool,
}

impl Gene {
    /// Returns a new _unsuppressed_ gene with the specified parameters.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::Gene;
    ///
    /// let gene = Gene::new(42, 0, 1, 2.0);
    /// assert_eq!(gene.endpoints(), (0, 1));
    /// assert!(!gene.suppressed());
    /// ```
    pub fn new(id: Innovation, input: Innovation, output: Innovation, weight: f32) -> Gene {
        Gene {
            id,
            input,
            output,
            weight,
            suppressed: false,
        }
    }

    /// Returns a random weight in the range
    /// `[-weight_bound, weight_bound]`.
    pub(super) fn random_weight(config: &GeneticConfig) -> f32 {
        if config.weight_bound <= 0.0 {
            return 0.0;
        }
        thread_rng().gen_range(-config.weight_bound..=config.weight_bound)
    }

    /// Sets the gene's weight to a random value
    /// within the configured bound.
    pub fn randomize_weight(&mut self, config: &GeneticConfig) {
        self.weight = Self::random_weight(config);
    }

    /// Nudges the gene's weight by a random amount
    /// no larger than the configured mutation power,
    /// keeping it within the weight bound.
    pub fn nudge_weight(&mut self, config: &GeneticConfig) {
        if config.weight_mutation_power > 0.0 {
            self.weight += thread_rng()
                .gen_range(-config.weight_mutation_power..=config.weight_mutation_power);
        }
        self.weight = self.weight.clamp(-config.weight_bound, config.weight_bound);
    }

    /// Returns the gene's innovation number.
    pub fn innovation(&self) -> Innovation {
        self.id
    }

    /// Returns the innovation number of the gene's input node.
    pub fn input(&self) -> Innovation {
        self.input
    }

    /// Returns the innovation number of the gene's output node.
    pub fn output(&self) -> Innovation {
        self.output
    }

    /// Returns the gene's `(input, output)` node pair.
    pub fn endpoints(&self) -> (Innovation, Innovation) {
        (self.input, self.output)
    }

    pub fn weight(&self) -> f32 {
        self.weight
    }

    pub fn set_weight(&mut self, w: f32) {
        self.weight = w;
    }

    /// Returns whether the gene is suppressed, i.e.,
    /// not expressed in the genome's phenotype.
    pub fn suppressed(&self) -> bool {
        self.suppressed
    }

    pub fn set_suppressed(&mut self, suppression: bool) {
        self.suppressed = suppression;
    }
}

impl fmt::Display for Gene {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{:?}[{:?}->{:?}, {:.3}]{}",
            if self.suppressed { "(" } else { "" },
            self.id,
            self.input,
            self.output,
            self.weight,
            if self.suppressed { ")" } else { "" },
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nudge_stays_within_bound() {
        let config = GeneticConfig {
            weight_bound: 1.0,
            weight_mutation_power: 5.0,
            ..GeneticConfig::zero()
        };
        let mut gene = Gene::new(0, 0, 1, 0.9);
        for _ in 0..100 {
            gene.nudge_weight(&config);
            assert!(gene.weight().abs() <= 1.0);
        }
    }

    #[test]
    fn zero_bound_gives_zero_weight() {
        let mut gene = Gene::new(0, 0, 1, 3.0);
        gene.randomize_weight(&GeneticConfig::zero());
        assert_eq!(gene.weight(), 0.0);
    }

    #[test]
    fn suppressed_genes_display_in_parentheses() {
        let mut gene = Gene::new(7, 1, 2, 0.5);
        gene.set_suppressed(true);
        assert_eq!(gene.to_string(), "(7[1->2, 0.500])");
    }
}
