use crate::genomics::GeneticConfig;
use crate::Innovation;

use ahash::RandomState;
use morphevo_engine::InnovationHistory;
use serde::{Deserialize, Serialize};

use std::collections::hash_map::{Entry, HashMap};

/// Innovation record of genomes generated under one
/// configuration. Structurally identical mutations
/// (a gene between the same pair of nodes, or a node
/// splitting the same gene) receive the same innovation
/// numbers, which is what makes genomes comparable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    next_gene_innovation: Innovation,
    next_node_innovation: Innovation,
    gene_innovations: HashMap<(Innovation, Innovation), Innovation, RandomState>,
    node_innovations: HashMap<Innovation, (Innovation, Innovation, Innovation), RandomState>,
}

impl InnovationHistory for History {
    type Config = GeneticConfig;

    fn new(config: &GeneticConfig) -> History {
        Self::new(config)
    }
}

impl History {
    /// Returns a history pre-populated with the
    /// innovations of every possible initial gene.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, History};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// let history = History::new(&config);
    ///
    /// assert_eq!(history.max_gene_innovation(), 3 * 2 - 1);
    /// assert_eq!(history.max_node_innovation(), 3 + 2 - 1);
    /// ```
    pub fn new(config: &GeneticConfig) -> History {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        let gene_innovations = (0..input_count)
            .flat_map(|i| (0..output_count).map(move |o| (i, o)))
            .map(|(i, o)| ((i, o + input_count), o + i * output_count))
            .collect();
        History {
            next_gene_innovation: input_count * output_count,
            next_node_innovation: input_count + output_count,
            gene_innovations,
            node_innovations: HashMap::default(),
        }
    }

    /// Returns the innovation number a gene between
    /// the given nodes has, or would have if it were
    /// created now.
    pub(crate) fn next_gene_innovation(
        &self,
        input_id: Innovation,
        output_id: Innovation,
    ) -> Innovation {
        *self
            .gene_innovations
            .get(&(input_id, output_id))
            .unwrap_or(&self.next_gene_innovation)
    }

    /// Returns the `(input gene, node, output gene)` innovation
    /// numbers a node splitting `split_gene` has, or would have.
    /// `duplicate` requests fresh numbers, for genomes which
    /// already contain the historical node.
    pub(crate) fn next_node_innovation(
        &self,
        split_gene: Innovation,
        duplicate: bool,
    ) -> (Innovation, Innovation, Innovation) {
        match self.node_innovations.get(&split_gene) {
            Some(record) if !duplicate => *record,
            _ => (
                self.next_gene_innovation,
                self.next_node_innovation,
                self.next_gene_innovation + 1,
            ),
        }
    }

    pub(crate) fn add_gene_innovation(&mut self, input_id: Innovation, output_id: Innovation) {
        if let Entry::Vacant(entry) = self.gene_innovations.entry((input_id, output_id)) {
            entry.insert(self.next_gene_innovation);
            self.next_gene_innovation += 1;
        }
    }

    /// Records the split of `split_gene`, whose
    /// endpoints are `(input, output)`.
    pub(crate) fn add_node_innovation(
        &mut self,
        split_gene: Innovation,
        (input, output): (Innovation, Innovation),
        duplicate: bool,
    ) {
        if self.node_innovations.contains_key(&split_gene) && !duplicate {
            return;
        }
        let new_node = self.next_node_innovation;
        let new_input_gene = self.next_gene_innovation;
        self.force_gene_innovation(input, new_node);
        let new_output_gene = self.next_gene_innovation;
        self.force_gene_innovation(new_node, output);

        self.node_innovations
            .insert(split_gene, (new_input_gene, new_node, new_output_gene));
        self.next_node_innovation += 1;
    }

    /// Consumes a fresh node innovation number for an added sensor.
    /// Each added sensor is a new innovation, as sensors are not
    /// derived from existing structure.
    pub(crate) fn add_sensor_innovation(&mut self) -> Innovation {
        let sensor = self.next_node_innovation;
        self.next_node_innovation += 1;
        sensor
    }

    /// Like [`add_gene_innovation`](History::add_gene_innovation),
    /// but always consumes a fresh innovation number, so that both
    /// genes of a node split are numbered consecutively.
    fn force_gene_innovation(&mut self, input_id: Innovation, output_id: Innovation) {
        self.gene_innovations
            .insert((input_id, output_id), self.next_gene_innovation);
        self.next_gene_innovation += 1;
    }

    /// Returns the highest gene innovation number assigned.
    pub fn max_gene_innovation(&self) -> Innovation {
        self.next_gene_innovation - 1
    }

    /// Returns the highest node innovation number assigned.
    pub fn max_node_innovation(&self) -> Innovation {
        self.next_node_innovation - 1
    }

    /// Returns an iterator over all recorded
    /// `(input, output)` → gene innovation pairs.
    pub fn gene_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&(Innovation, Innovation), &Innovation)> {
        self.gene_innovations.iter()
    }

    /// Returns an iterator over all recorded split gene →
    /// `(input gene, node, output gene)` innovation triplets.
    pub fn node_innovation_history(
        &self,
    ) -> impl Iterator<Item = (&Innovation, &(Innovation, Innovation, Innovation))> {
        self.node_innovations.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn config() -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(2).unwrap(),
            output_count: NonZeroUsize::new(2).unwrap(),
            ..GeneticConfig::zero()
        }
    }

    #[test]
    fn initial_genes_are_prenumbered() {
        let history = History::new(&config());
        // Input 1 -> output node 3 (second output).
        assert_eq!(history.next_gene_innovation(1, 3), 3);
        assert_eq!(history.next_gene_innovation(0, 2), 0);
        // Unknown pairs get the next free number.
        assert_eq!(history.next_gene_innovation(3, 2), 4);
    }

    #[test]
    fn identical_splits_share_innovations() {
        let mut history = History::new(&config());
        let first = history.next_node_innovation(0, false);
        assert_eq!(first, (4, 4, 5));
        history.add_node_innovation(0, (0, 2), false);
        assert_eq!(history.next_node_innovation(0, false), first);
        history.add_node_innovation(0, (0, 2), false);
        assert_eq!(history.max_node_innovation(), 4);

        let duplicate = history.next_node_innovation(0, true);
        assert_eq!(duplicate, (6, 5, 7));
        history.add_node_innovation(0, (0, 2), true);
        assert_eq!(history.max_gene_innovation(), 7);
    }

    #[test]
    fn sensor_innovations_are_never_shared() {
        let mut history = History::new(&config());
        let first = history.add_sensor_innovation();
        let second = history.add_sensor_innovation();
        assert_eq!((first, second), (4, 5));
        assert_eq!(history.next_node_innovation(0, false).1, 6);
    }

    #[test]
    fn gene_innovations_are_recorded_once() {
        let mut history = History::new(&config());
        history.add_gene_innovation(2, 3);
        history.add_gene_innovation(2, 3);
        assert_eq!(history.next_gene_innovation(2, 3), 4);
        assert_eq!(history.max_gene_innovation(), 4);
    }
}
