//! Genomes are the focus of evolution in NEAT.
//! They are a collection of genes and nodes that can be instantiated
//! as a phenotype (a neural network). Genomes can be progressively mutated,
//! thus adding complexity and functionality.
//!
//! [`NNGenome`] is the direct encoding: its phenotype is the network
//! itself. [`MorphGenome`] pairs an [`NNGenome`] with the sensor
//! morphology the network's inputs are wired to.

mod config;
mod errors;
mod genes;
mod history;
mod morph;
mod nodes;

pub use config::GeneticConfig;
pub use errors::*;
pub use genes::Gene;
pub use history::History;
pub use morph::{MorphConfig, MorphGenome, MorphHistory};
pub use nodes::{ActivationType, Node, NodeType};

use crate::Innovation;

use ahash::RandomState;
use morphevo_engine::Genome;
use rand::prelude::{IteratorRandom, Rng, SliceRandom};
use serde::{Deserialize, Serialize};

use std::collections::{HashMap, HashSet};
use std::fmt;

/// A mutable collection of genes and nodes.
///
/// Supports Serde for convenient genome saving and loading.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
pub struct NNGenome {
    genes: HashMap<Innovation, Gene, RandomState>,
    nodes: HashMap<Innovation, Node, RandomState>,
    node_pairings: HashSet<(Innovation, Innovation), RandomState>,
    fitness: f32,
}

impl NNGenome {
    /// Create a new genome with the specified configuration.
    ///
    /// Initially generated genes are given the innovation number
    /// `o + i ⨯ output_count`, where `i` is the innovation number
    /// of their input node and `o` is the index of their output node.
    /// Thus, genes created through mutation start at innovation
    /// number `input_count ⨯ output_count`.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome, NodeType};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig {
    ///     input_count: NonZeroUsize::new(3).unwrap(),
    ///     output_count: NonZeroUsize::new(2).unwrap(),
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let genome = NNGenome::new(&config);
    ///
    /// // As configured, the genome should have 3 sensors + 2 actuators.
    /// assert_eq!(genome.nodes().count(), 3 + 2);
    /// assert_eq!(genome.input_count(), 3);
    /// assert_eq!(genome.output_count(), 2);
    ///
    /// // And with an initial_expression_chance of 1, there is a gene for every pair of nodes.
    /// assert_eq!(genome.genes().count(), 3 * 2);
    ///
    /// // All genes should have weights within the established bound.
    /// assert!(genome.genes().all(|g| g.weight().abs() <= config.weight_bound));
    /// ```
    pub fn new(config: &GeneticConfig) -> NNGenome {
        let mut genome = NNGenome {
            genes: HashMap::default(),
            nodes: Self::generate_nodes(config),
            node_pairings: HashSet::default(),
            fitness: 0.0,
        };
        genome.generate_initial_genes(config);
        genome
    }

    fn generate_nodes(config: &GeneticConfig) -> HashMap<Innovation, Node, RandomState> {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();

        let sensors = (0..input_count)
            .map(|i| Node::new(i, NodeType::Sensor, ActivationType::Identity));
        let actuators = (0..output_count).map(|o| {
            Node::new(
                o + input_count,
                NodeType::Actuator,
                *config
                    .output_activation_types
                    .get(o)
                    .unwrap_or(&ActivationType::Sigmoid),
            )
        });

        sensors
            .chain(actuators)
            .map(|n| (n.innovation(), n))
            .collect()
    }

    fn generate_initial_genes(&mut self, config: &GeneticConfig) {
        if config.initial_expression_chance <= 0.0 {
            return;
        }
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        let mut rng = rand::thread_rng();
        for i in 0..input_count {
            for o in 0..output_count {
                if rng.gen::<f32>() < config.initial_expression_chance {
                    self.add_gene_unchecked(
                        o + i * output_count,
                        i,
                        o + input_count,
                        Gene::random_weight(config),
                    );
                }
            }
        }
    }

    /// Add a new gene to the genome.
    /// Returns a reference to the new gene.
    ///
    /// # Errors
    ///
    /// This function will return an error if a gene with the same
    /// `gene_id` already existed in the genome, if either `input_id`
    /// or `output_id` do not correspond to nodes present in the genome,
    /// if the nodes are already connected, or if `output_id` corresponds
    /// to a sensor node.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    ///
    /// // The genome is initially empty.
    /// assert_eq!(genome.genes().count(), 0);
    ///
    /// let inserted_gene = genome.add_gene(42, 0, 1, 2.5).unwrap().clone();
    /// assert_eq!(&inserted_gene, genome.genes().next().unwrap());
    /// assert_eq!(inserted_gene.endpoints(), (0, 1));
    ///
    /// // Recursive gene.
    /// assert!(genome.add_gene(43, 1, 1, -1.0).is_ok());
    /// // Genes may not end in sensors.
    /// assert!(genome.add_gene(44, 1, 0, 1.0).is_err());
    /// ```
    pub fn add_gene(
        &mut self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
        weight: f32,
    ) -> Result<&mut Gene, GeneInsertionError> {
        self.check_gene_viability(gene_id, input_id, output_id)?;
        Ok(self.add_gene_unchecked(gene_id, input_id, output_id, weight))
    }

    /// Add a new gene to the genome.
    /// Returns a reference to the new gene.
    /// Assumes that the gene is not a duplicate
    /// or invalid gene for the genome.
    fn add_gene_unchecked(
        &mut self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
        weight: f32,
    ) -> &mut Gene {
        if let Some(node) = self.nodes.get_mut(&input_id) {
            node.link_output_gene(gene_id);
        }
        if let Some(node) = self.nodes.get_mut(&output_id) {
            node.link_input_gene(gene_id);
        }
        self.node_pairings.insert((input_id, output_id));
        self.genes
            .entry(gene_id)
            .or_insert_with(|| Gene::new(gene_id, input_id, output_id, weight))
    }

    /// Checks whether a gene is a duplicate or
    /// is invalid for the genome.
    fn check_gene_viability(
        &self,
        gene_id: Innovation,
        input_id: Innovation,
        output_id: Innovation,
    ) -> Result<(), GeneInsertionError> {
        use GeneInsertionError::*;
        let endpoints = (input_id, output_id);
        if self.genes.contains_key(&gene_id) {
            Err(InnovationTaken {
                gene: gene_id,
                endpoints,
            })
        } else if !(self.nodes.contains_key(&input_id) && self.nodes.contains_key(&output_id)) {
            Err(MissingEndpoint {
                input: input_id,
                output: output_id,
            })
        } else if self.node_pairings.contains(&endpoints) {
            Err(AlreadyLinked {
                gene: gene_id,
                endpoints,
            })
        } else if self.nodes[&output_id].node_type() == NodeType::Sensor {
            Err(IntoSensor(output_id))
        } else {
            Ok(())
        }
    }

    /// Add a new hidden node to the genome.
    /// Returns a reference to the newly created node.
    ///
    /// # Errors
    ///
    /// This function returns an error if a node of the
    /// same ID already existed in the genome.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{ActivationType, GeneticConfig, NNGenome, NodeType};
    ///
    /// let mut genome = NNGenome::new(&GeneticConfig::zero());
    /// let inserted_node = genome.add_node(42, ActivationType::Gaussian).unwrap().clone();
    ///
    /// assert_eq!(genome.nodes().count(), 1 + 1 + 1);
    /// assert_eq!(inserted_node.node_type(), NodeType::Neuron);
    /// assert!(genome.add_node(42, ActivationType::Sigmoid).is_err());
    /// ```
    pub fn add_node(
        &mut self,
        node_id: Innovation,
        activation_type: ActivationType,
    ) -> Result<&mut Node, NodeInsertionError> {
        if self.nodes.contains_key(&node_id) {
            return Err(NodeInsertionError(node_id));
        }
        Ok(self.add_node_unchecked(node_id, activation_type))
    }

    fn add_node_unchecked(
        &mut self,
        node_id: Innovation,
        activation_type: ActivationType,
    ) -> &mut Node {
        self.nodes
            .entry(node_id)
            .or_insert_with(|| Node::new(node_id, NodeType::Neuron, activation_type))
    }

    /// Induces a _weight mutation_ in the genome.
    ///
    /// Each gene's weight is either reset to a random value in
    /// `[-weight_bound, weight_bound]` or nudged by at most
    /// `weight_mutation_power`. Older genes have a lower chance
    /// of being reset.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 5.0,
    ///     weight_mutation_power: 2.5,
    ///     weight_nudge_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    ///
    /// let mut genome = NNGenome::new(&config);
    /// let initial_weight = genome.genes().next().unwrap().weight();
    ///
    /// genome.mutate_weights(&config);
    /// let new_weight = genome.genes().next().unwrap().weight();
    ///
    /// assert!(new_weight.abs() <= config.weight_bound);
    /// assert!((new_weight - initial_weight).abs() <= config.weight_mutation_power);
    /// ```
    pub fn mutate_weights(&mut self, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        let max_innovation = self.genes.keys().copied().max().unwrap_or_default().max(1) as f32;
        for gene in self.genes.values_mut() {
            if rng.gen::<f32>()
                < config.weight_reset_chance
                    * ((gene.innovation() + 1) as f32 / max_innovation).powi(2)
            {
                gene.randomize_weight(config);
            } else if rng.gen::<f32>() < config.weight_nudge_chance {
                gene.nudge_weight(config);
            }
        }
    }

    /// Induces a _gene addition mutation_ in the genome:
    /// connects a randomly chosen pair of unconnected nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if every node is fully connected, or
    /// no suitable pair was found within
    /// `max_gene_addition_mutation_attempts` attempts.
    pub fn mutate_add_gene(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
    ) -> Result<&Gene, MutationError> {
        let non_sensor_nodes = self.select_non_sensor_nodes();
        let mut potential_inputs = self.select_potential_input_nodes(&non_sensor_nodes);

        if potential_inputs.is_empty() {
            return Err(MutationError::FullyConnected);
        }

        potential_inputs.shuffle(&mut rand::thread_rng());

        let (input, output) = self
            .find_node_pair(&potential_inputs, &non_sensor_nodes, config)
            .ok_or(MutationError::NoUnlinkedPair)?;

        let gene_id = history.next_gene_innovation(input, output);
        history.add_gene_innovation(input, output);
        match self.add_gene(gene_id, input, output, Gene::random_weight(config)) {
            Ok(gene) => Ok(&*gene),
            Err(_) => Err(MutationError::NoUnlinkedPair),
        }
    }

    fn select_non_sensor_nodes(&self) -> HashSet<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.node_type() != NodeType::Sensor)
            .map(|n| n.innovation())
            .collect()
    }

    fn select_potential_input_nodes(&self, non_sensor_nodes: &HashSet<Innovation>) -> Vec<Innovation> {
        self.nodes
            .values()
            .filter(|n| n.output_genes().count() < non_sensor_nodes.len())
            .map(|n| n.innovation())
            .collect()
    }

    fn find_node_pair(
        &self,
        potential_inputs: &[Innovation],
        potential_outputs: &HashSet<Innovation>,
        config: &GeneticConfig,
    ) -> Option<(Innovation, Innovation)> {
        potential_inputs
            .iter()
            .take(config.max_gene_addition_mutation_attempts.max(1))
            .find_map(|i| {
                self.choose_output_node_for(*i, potential_outputs, config)
                    .map(|output| (*i, output))
            })
    }

    fn choose_output_node_for(
        &self,
        candidate_input: Innovation,
        potential_outputs: &HashSet<Innovation>,
        config: &GeneticConfig,
    ) -> Option<Innovation> {
        let mut rng = rand::thread_rng();
        let node = &self.nodes[&candidate_input];
        let connected: HashSet<Innovation> = node
            .output_genes()
            .filter_map(|id| self.genes.get(id))
            .map(|g| g.output())
            .collect();

        if node.node_type() != NodeType::Sensor
            && !connected.contains(&candidate_input)
            && rng.gen::<f32>() < config.recursion_chance
        {
            return Some(candidate_input);
        }
        potential_outputs
            .iter()
            .filter(|o| **o != candidate_input && !connected.contains(o))
            .choose(&mut rng)
            .copied()
    }

    /// Induces a _node addition mutation_ in the genome:
    /// a random expressed gene is suppressed and replaced by
    /// a new node and two genes. The gene into the new node
    /// has weight 1, and the gene out of it has a random weight.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no expressed genes to split.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, History, NNGenome, NodeType};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     weight_bound: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut genome = NNGenome::new(&config);
    ///
    /// let (input, node, output) = genome.mutate_add_node(&mut history, &config).unwrap();
    /// assert_eq!(node.node_type(), NodeType::Neuron);
    /// assert_eq!(input.weight(), 1.0);
    /// assert_eq!(input.output(), output.input());
    ///
    /// // The split gene is kept, suppressed.
    /// assert_eq!(genome.genes().filter(|g| g.suppressed()).count(), 1);
    /// ```
    pub fn mutate_add_node(
        &mut self,
        history: &mut History,
        config: &GeneticConfig,
    ) -> Result<(&Gene, &Node, &Gene), MutationError> {
        let gene_to_split = self
            .genes
            .values()
            .filter(|g| !g.suppressed())
            .map(|g| g.innovation())
            .choose(&mut rand::thread_rng())
            .ok_or(MutationError::NothingToSplit)?;

        let mut duplicate = false;
        let mut mutation = history.next_node_innovation(gene_to_split, false);
        if self.nodes.contains_key(&mutation.1) {
            duplicate = true;
            mutation = history.next_node_innovation(gene_to_split, true);
        }
        let (input_gene, new_node, output_gene) = mutation;
        let (input_node, output_node) = self.genes[&gene_to_split].endpoints();

        history.add_node_innovation(gene_to_split, (input_node, output_node), duplicate);

        if let Some(gene) = self.genes.get_mut(&gene_to_split) {
            gene.set_suppressed(true);
        }
        let activation_type = *config
            .activation_types
            .choose(&mut rand::thread_rng())
            .unwrap_or(&ActivationType::Sigmoid);
        self.add_node_unchecked(new_node, activation_type);
        self.add_gene_unchecked(input_gene, input_node, new_node, 1.0);
        self.add_gene_unchecked(
            output_gene,
            new_node,
            output_node,
            Gene::random_weight(config),
        );

        Ok((
            &self.genes[&input_gene],
            &self.nodes[&new_node],
            &self.genes[&output_gene],
        ))
    }

    /// Removes a random gene from the genome, returning it.
    /// Returns `None` if the genome has no genes.
    pub fn mutate_delete_gene(&mut self) -> Option<Gene> {
        let innovation = self
            .genes
            .keys()
            .copied()
            .choose(&mut rand::thread_rng())?;
        self.remove_gene(innovation)
    }

    /// Removes a random hidden node from the genome,
    /// along with all genes connected to it.
    /// Returns `None` if the genome has no hidden nodes.
    pub fn mutate_delete_node(&mut self) -> Option<(Node, Vec<Gene>)> {
        let innovation = self
            .nodes
            .values()
            .filter(|n| n.node_type() == NodeType::Neuron)
            .map(|n| n.innovation())
            .choose(&mut rand::thread_rng())?;

        let connected: HashSet<Innovation> = self.nodes[&innovation]
            .input_genes()
            .chain(self.nodes[&innovation].output_genes())
            .copied()
            .collect();
        let genes = connected
            .into_iter()
            .filter_map(|gene| self.remove_gene(gene))
            .collect();
        self.nodes.remove(&innovation).map(|node| (node, genes))
    }

    /// Returns the ids of the sensor nodes in input order.
    pub fn sensor_ids(&self) -> Vec<Innovation> {
        let mut ids: Vec<Innovation> = self
            .nodes
            .values()
            .filter(|n| n.node_type() == NodeType::Sensor)
            .map(|n| n.innovation())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Adds a sensor node with a fresh innovation number, which
    /// makes it the last input of the network. It is linked to each
    /// actuator with a chance of `initial_expression_chance`.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, History, NNGenome, NodeType};
    ///
    /// let config = GeneticConfig {
    ///     initial_expression_chance: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let mut history = History::new(&config);
    /// let mut genome = NNGenome::new(&config);
    ///
    /// let sensor = genome.add_sensor(&mut history, &config).innovation();
    /// assert_eq!(genome.input_count(), 2);
    /// assert_eq!(genome.sensor_ids().last(), Some(&sensor));
    /// assert_eq!(genome.genes().filter(|g| g.input() == sensor).count(), 1);
    /// ```
    pub fn add_sensor(&mut self, history: &mut History, config: &GeneticConfig) -> &Node {
        let sensor = history.add_sensor_innovation();
        self.nodes.insert(
            sensor,
            Node::new(sensor, NodeType::Sensor, ActivationType::Identity),
        );

        let mut actuators: Vec<Innovation> = self
            .nodes
            .values()
            .filter(|n| n.node_type() == NodeType::Actuator)
            .map(|n| n.innovation())
            .collect();
        actuators.sort_unstable();
        let mut rng = rand::thread_rng();
        for actuator in actuators {
            if rng.gen::<f32>() < config.initial_expression_chance {
                let gene_id = history.next_gene_innovation(sensor, actuator);
                history.add_gene_innovation(sensor, actuator);
                self.add_gene_unchecked(gene_id, sensor, actuator, Gene::random_weight(config));
            }
        }
        &self.nodes[&sensor]
    }

    /// Removes the sensor feeding input `index`, along with
    /// its genes. Later inputs shift down by one.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no such input, or
    /// it is the genome's only sensor.
    pub fn remove_sensor(&mut self, index: usize) -> Result<(Node, Vec<Gene>), MutationError> {
        let sensors = self.sensor_ids();
        let sensor = *sensors.get(index).ok_or(MutationError::NoSuchSensor(index))?;
        if sensors.len() == 1 {
            return Err(MutationError::LastSensor);
        }

        let linked: Vec<Innovation> = self.nodes[&sensor].output_genes().copied().collect();
        let genes = linked
            .into_iter()
            .filter_map(|gene| self.remove_gene(gene))
            .collect();
        self.nodes
            .remove(&sensor)
            .map(|node| (node, genes))
            .ok_or(MutationError::NoSuchSensor(index))
    }

    /// Removes a gene, unlinking it from its endpoints.
    fn remove_gene(&mut self, innovation: Innovation) -> Option<Gene> {
        let gene = self.genes.remove(&innovation)?;
        if let Some(node) = self.nodes.get_mut(&gene.input()) {
            node.unlink_output_gene(innovation);
        }
        if let Some(node) = self.nodes.get_mut(&gene.output()) {
            node.unlink_input_gene(innovation);
        }
        self.node_pairings.remove(&gene.endpoints());
        Some(gene)
    }

    /// Mates two genomes, returning their child.
    ///
    /// The child inherits the structure of the fitter parent
    /// (of both, if they are equally fit), with the weights
    /// of common genes chosen from either parent or averaged.
    /// The child is then mutated with a chance of
    /// `child_mutation_chance`, and starts with 0 fitness.
    pub fn mate(
        parent1: &NNGenome,
        parent2: &NNGenome,
        history: &mut History,
        config: &GeneticConfig,
    ) -> NNGenome {
        let (fitter, other) = if parent1.fitness >= parent2.fitness {
            (parent1, parent2)
        } else {
            (parent2, parent1)
        };

        let mut child = fitter.clone();
        child.fitness = 0.0;

        child.combine(other, fitter.fitness, config);
        if rand::thread_rng().gen::<f32>() < config.child_mutation_chance {
            child.mutate_all(history, config);
        }

        child.reset_suppresseds(config);

        child
    }

    fn mutate_all(&mut self, history: &mut History, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        if rng.gen::<f32>() < config.node_deletion_mutation_chance {
            let _ = self.mutate_delete_node();
        }
        if rng.gen::<f32>() < config.gene_deletion_mutation_chance {
            let _ = self.mutate_delete_gene();
        }
        self.mutate_weights(config);
        if rng.gen::<f32>() < config.node_addition_mutation_chance {
            let _ = self.mutate_add_node(history, config);
        }
        if rng.gen::<f32>() < config.gene_addition_mutation_chance {
            let _ = self.mutate_add_gene(history, config);
        }
    }

    fn combine(&mut self, other: &NNGenome, own_fitness: f32, config: &GeneticConfig) {
        if (own_fitness - other.fitness).abs() < f32::EPSILON {
            self.add_noncommon_structure(other);
        }
        if rand::thread_rng().gen::<f32>() < config.mate_by_averaging_chance {
            self.average_common_genes(other);
        } else {
            self.randomly_choose_common_genes(other);
        }
    }

    /// Copies the other genome's hidden nodes and genes missing
    /// in this one. Conflicting structure is skipped, and so are
    /// genes from sensors this genome lacks.
    fn add_noncommon_structure(&mut self, other: &NNGenome) {
        for (id, node) in &other.nodes {
            if node.node_type() == NodeType::Neuron && !self.nodes.contains_key(id) {
                let _ = self.add_node(*id, node.activation_type());
            }
        }

        for (id, gene) in &other.genes {
            if let Ok(added) = self.add_gene(*id, gene.input(), gene.output(), gene.weight()) {
                added.set_suppressed(gene.suppressed());
            }
        }
    }

    fn average_common_genes(&mut self, other: &NNGenome) {
        for (id, others_gene) in &other.genes {
            if let Some(own_gene) = self.genes.get_mut(id) {
                own_gene.set_weight((own_gene.weight() + others_gene.weight()) / 2.0);
            }
        }
    }

    fn randomly_choose_common_genes(&mut self, other: &NNGenome) {
        let mut rng = rand::thread_rng();
        for (id, gene) in &other.genes {
            if let Some(own) = self.genes.get_mut(id) {
                if rng.gen::<bool>() {
                    own.set_weight(gene.weight());
                }
            }
        }
    }

    fn reset_suppresseds(&mut self, config: &GeneticConfig) {
        let mut rng = rand::thread_rng();
        for gene in self.genes.values_mut() {
            if gene.suppressed() && rng.gen::<f32>() < config.suppression_reset_chance {
                gene.set_suppressed(false);
            }
        }
    }

    /// Returns the genetic distance between two genomes:
    /// a weighted sum of their disjoint and excess gene counts
    /// and the average weight difference of their common genes.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    ///
    /// let config = GeneticConfig {
    ///     excess_gene_factor: 1.0,
    ///     ..GeneticConfig::zero()
    /// };
    /// let empty = NNGenome::new(&config);
    /// let mut connected = empty.clone();
    /// connected.add_gene(0, 0, 1, 1.0).unwrap();
    ///
    /// assert_eq!(NNGenome::genetic_distance(&empty, &empty, &config), 0.0);
    /// assert_eq!(NNGenome::genetic_distance(&empty, &connected, &config), 1.0);
    /// ```
    pub fn genetic_distance(first: &NNGenome, second: &NNGenome, config: &GeneticConfig) -> f32 {
        let (common_innovations, common_weight_pairs) =
            Self::common_innovations_and_weights(first, second);

        let common_weight_diff = Self::weight_diff_average(&common_weight_pairs);

        let disjoint_gene_count_first = first.count_disjoint_genes(&common_innovations);
        let disjoint_gene_count_second = second.count_disjoint_genes(&common_innovations);
        let disjoint_gene_count = disjoint_gene_count_first + disjoint_gene_count_second;

        let excess_gene_count =
            (first.genes.len() - common_innovations.len() - disjoint_gene_count_first)
                + (second.genes.len() - common_innovations.len() - disjoint_gene_count_second);

        config.disjoint_gene_factor * disjoint_gene_count as f32
            + config.excess_gene_factor * excess_gene_count as f32
            + config.common_weight_factor * common_weight_diff
    }

    fn common_innovations_and_weights(
        g1: &NNGenome,
        g2: &NNGenome,
    ) -> (HashSet<Innovation>, Vec<(f32, f32)>) {
        g1.genes
            .iter()
            .filter_map(|(id, gene)| {
                g2.genes
                    .get(id)
                    .map(|other| (*id, (gene.weight(), other.weight())))
            })
            .unzip()
    }

    fn weight_diff_average(weight_pairs: &[(f32, f32)]) -> f32 {
        if weight_pairs.is_empty() {
            return 0.0;
        }
        weight_pairs
            .iter()
            .map(|(w1, w2)| (w1 - w2).abs())
            .sum::<f32>()
            / weight_pairs.len() as f32
    }

    /// Counts genes absent in the other genome whose innovation
    /// number lies within the range of common innovations.
    fn count_disjoint_genes(&self, common_innovations: &HashSet<Innovation>) -> usize {
        let common_innovation_max = common_innovations.iter().max().copied().unwrap_or_default();
        self.genes
            .keys()
            .filter(|id| !common_innovations.contains(id) && **id < common_innovation_max)
            .count()
    }

    /// Returns whether the genome has the sensors and actuators
    /// the configuration calls for, and all of its genes connect
    /// existing nodes.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, NNGenome};
    /// use std::num::NonZeroUsize;
    ///
    /// let config = GeneticConfig::zero();
    /// let genome = NNGenome::new(&config);
    /// assert!(genome.conforms_to(&config));
    ///
    /// let wider = GeneticConfig {
    ///     input_count: NonZeroUsize::new(4).unwrap(),
    ///     ..GeneticConfig::zero()
    /// };
    /// assert!(!genome.conforms_to(&wider));
    /// ```
    pub fn conforms_to(&self, config: &GeneticConfig) -> bool {
        let input_count = config.input_count.get();
        self.input_count() == input_count
            && (0..input_count).all(|id| {
                self.nodes
                    .get(&id)
                    .map_or(false, |n| n.node_type() == NodeType::Sensor)
            })
            && self.conforms_to_actuators(config)
    }

    /// Like [`conforms_to`](NNGenome::conforms_to), but for genomes
    /// whose sensors evolve: any nonzero number of sensors is allowed.
    ///
    /// # Examples
    /// ```
    /// use morphevo_nn::genomics::{GeneticConfig, History, NNGenome};
    ///
    /// let config = GeneticConfig::zero();
    /// let mut history = History::new(&config);
    /// let mut genome = NNGenome::new(&config);
    /// genome.add_sensor(&mut history, &config);
    ///
    /// assert!(!genome.conforms_to(&config));
    /// assert!(genome.conforms_to_actuators(&config));
    /// ```
    pub fn conforms_to_actuators(&self, config: &GeneticConfig) -> bool {
        let input_count = config.input_count.get();
        let output_count = config.output_count.get();
        self.input_count() > 0
            && self.output_count() == output_count
            && (input_count..input_count + output_count).all(|id| {
                self.nodes
                    .get(&id)
                    .map_or(false, |n| n.node_type() == NodeType::Actuator)
            })
            && self.genes.values().all(|g| {
                self.nodes.contains_key(&g.input())
                    && self
                        .nodes
                        .get(&g.output())
                        .map_or(false, |n| n.node_type() != NodeType::Sensor)
            })
    }

    /// Returns an iterator over the genome's genes.
    pub fn genes(&self) -> impl Iterator<Item = &Gene> {
        self.genes.values()
    }

    /// Returns an iterator over the genome's nodes.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values()
    }

    /// Returns the number of sensor nodes.
    pub fn input_count(&self) -> usize {
        self.count_nodes(NodeType::Sensor)
    }

    /// Returns the number of actuator nodes.
    pub fn output_count(&self) -> usize {
        self.count_nodes(NodeType::Actuator)
    }

    fn count_nodes(&self, node_type: NodeType) -> usize {
        self.nodes
            .values()
            .filter(|n| n.node_type() == node_type)
            .count()
    }

    /// Sets the genome's fitness.
    ///
    /// # Panics
    /// This function panics if `fitness` is negative.
    pub fn set_fitness(&mut self, fitness: f32) {
        assert!(fitness >= 0.0, "fitness function returned a negative value");
        self.fitness = fitness;
    }

    pub fn fitness(&self) -> f32 {
        self.fitness
    }
}

impl Genome for NNGenome {
    type Config = GeneticConfig;
    type InnovationHistory = History;

    fn new(config: &GeneticConfig) -> NNGenome {
        Self::new(config)
    }

    fn genetic_distance(first: &NNGenome, second: &NNGenome, config: &GeneticConfig) -> f32 {
        Self::genetic_distance(first, second, config)
    }

    fn mate(
        parent1: &NNGenome,
        parent2: &NNGenome,
        history: &mut History,
        config: &GeneticConfig,
    ) -> NNGenome {
        Self::mate(parent1, parent2, history, config)
    }

    fn set_fitness(&mut self, fitness: f32) {
        Self::set_fitness(self, fitness)
    }

    fn fitness(&self) -> f32 {
        Self::fitness(self)
    }

    fn conforms_to(&self, config: &GeneticConfig) -> bool {
        Self::conforms_to(self, config)
    }
}

impl fmt::Display for NNGenome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut genes: Vec<&Gene> = self.genes.values().collect();
        let mut nodes: Vec<&Node> = self.nodes.values().collect();
        genes.sort_unstable_by_key(|g| g.innovation());
        nodes.sort_unstable_by_key(|n| n.innovation());
        f.debug_struct("NNGenome")
            .field("Genes", &genes)
            .field("Nodes", &nodes)
            .field("Fitness", &self.fitness)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::num::NonZeroUsize;

    fn config(input_count: usize, output_count: usize) -> GeneticConfig {
        GeneticConfig {
            input_count: NonZeroUsize::new(input_count).unwrap(),
            output_count: NonZeroUsize::new(output_count).unwrap(),
            initial_expression_chance: 1.0,
            weight_bound: 2.0,
            ..GeneticConfig::zero()
        }
    }

    /// Checks that node gene records match the genome's genes.
    fn assert_links_consistent(genome: &NNGenome) {
        for gene in genome.genes() {
            assert!(genome.nodes[&gene.input()]
                .output_genes()
                .any(|id| *id == gene.innovation()));
            assert!(genome.nodes[&gene.output()]
                .input_genes()
                .any(|id| *id == gene.innovation()));
            assert!(genome.node_pairings.contains(&gene.endpoints()));
        }
        for node in genome.nodes() {
            assert!(node
                .input_genes()
                .chain(node.output_genes())
                .all(|id| genome.genes.contains_key(id)));
        }
        assert_eq!(genome.node_pairings.len(), genome.genes.len());
    }

    #[test]
    fn new_fully_connected() {
        for input_count in 1..6 {
            for output_count in 1..6 {
                let mut config = config(input_count, output_count);
                config.output_activation_types =
                    vec![ActivationType::Gaussian, ActivationType::Identity];

                let genome = NNGenome::new(&config);
                assert_eq!(genome.genes.len(), input_count * output_count);
                assert_eq!(genome.input_count(), input_count);
                assert_eq!(genome.output_count(), output_count);
                assert!(genome
                    .nodes()
                    .filter(|n| n.node_type() == NodeType::Sensor)
                    .all(|n| n.activation_type() == ActivationType::Identity));
                for g in genome.genes() {
                    assert_eq!(
                        g.innovation(),
                        g.input() * output_count + (g.output() - input_count)
                    );
                }
                assert_links_consistent(&genome);
                assert!(genome.conforms_to(&config));
            }
        }
    }

    #[test]
    fn new_unconnected() {
        let genome = NNGenome::new(&GeneticConfig::zero());
        assert_eq!(genome.genes.len(), 0);
    }

    #[test]
    fn add_gene_rejects_invalid_genes() {
        let mut genome = NNGenome::new(&config(2, 1));
        assert_eq!(
            genome.add_gene(0, 1, 2, 1.0).unwrap_err(),
            GeneInsertionError::InnovationTaken {
                gene: 0,
                endpoints: (1, 2)
            }
        );
        assert_eq!(
            genome.add_gene(99, 0, 2, 1.0).unwrap_err(),
            GeneInsertionError::AlreadyLinked {
                gene: 99,
                endpoints: (0, 2)
            }
        );
        assert_eq!(
            genome.add_gene(99, 0, 500, 1.0).unwrap_err(),
            GeneInsertionError::MissingEndpoint {
                input: 0,
                output: 500
            }
        );
        assert_eq!(
            genome.add_gene(99, 2, 1, 1.0).unwrap_err(),
            GeneInsertionError::IntoSensor(1)
        );
        assert_eq!(
            genome.add_node(1, ActivationType::Sigmoid).unwrap_err(),
            NodeInsertionError(1)
        );
    }

    #[test]
    fn mutations_keep_links_consistent() {
        let config = GeneticConfig {
            max_gene_addition_mutation_attempts: 10,
            recursion_chance: 0.3,
            activation_types: vec![ActivationType::ReLU],
            ..config(3, 2)
        };
        let mut history = History::new(&config);
        let mut genome = NNGenome::new(&config);
        for step in 0..50 {
            match step % 4 {
                0 | 1 => {
                    let _ = genome.mutate_add_node(&mut history, &config);
                }
                2 => {
                    let _ = genome.mutate_add_gene(&mut history, &config);
                }
                _ => {
                    genome.mutate_delete_node();
                }
            }
            assert_links_consistent(&genome);
            assert!(genome.conforms_to(&config));
        }
    }

    #[test]
    fn node_mutations_share_history() {
        let config = config(1, 1);
        let mut history = History::new(&config);
        let mut first = NNGenome::new(&config);
        let mut second = first.clone();

        let (_, node, _) = first.mutate_add_node(&mut history, &config).unwrap();
        let first_node = node.innovation();
        let (_, node, _) = second.mutate_add_node(&mut history, &config).unwrap();
        assert_eq!(node.innovation(), first_node);

        // Any further split yields a fresh node.
        second.genes.get_mut(&0).unwrap().set_suppressed(false);
        let (_, node, _) = second.mutate_add_node(&mut history, &config).unwrap();
        assert_ne!(node.innovation(), first_node);
    }

    #[test]
    fn fully_connected_genome_rejects_gene_mutation() {
        let config = GeneticConfig {
            recursion_chance: 0.0,
            ..config(2, 1)
        };
        let mut genome = NNGenome::new(&config);
        genome.add_gene(10, 2, 2, 1.0).unwrap();
        let mut history = History::new(&config);
        assert_eq!(
            genome.mutate_add_gene(&mut history, &config).unwrap_err(),
            MutationError::FullyConnected
        );
    }

    #[test]
    fn sensors_are_added_after_existing_inputs() {
        let config = config(2, 2);
        let mut history = History::new(&config);
        let mut genome = NNGenome::new(&config);
        let added = genome.add_sensor(&mut history, &config).innovation();

        assert_eq!(genome.sensor_ids(), vec![0, 1, added]);
        assert!(added >= 2 + 2);
        assert_eq!(genome.genes().filter(|g| g.input() == added).count(), 2);
        assert_links_consistent(&genome);
        assert!(!genome.conforms_to(&config));
        assert!(genome.conforms_to_actuators(&config));

        // Hidden nodes created afterwards never reuse the sensor's number.
        let (_, node, _) = genome.mutate_add_node(&mut history, &config).unwrap();
        assert_ne!(node.innovation(), added);
    }

    #[test]
    fn removing_a_sensor_drops_its_genes() {
        let config = config(3, 2);
        let mut genome = NNGenome::new(&config);
        let (node, genes) = genome.remove_sensor(1).unwrap();

        assert_eq!(node.innovation(), 1);
        assert_eq!(genes.len(), 2);
        assert!(genes.iter().all(|g| g.input() == 1));
        assert_eq!(genome.sensor_ids(), vec![0, 2]);
        assert_eq!(genome.genes().count(), 4);
        assert_links_consistent(&genome);
        assert!(genome.conforms_to_actuators(&config));

        assert_eq!(genome.remove_sensor(2).unwrap_err(), MutationError::NoSuchSensor(2));
        genome.remove_sensor(0).unwrap();
        assert_eq!(genome.remove_sensor(0).unwrap_err(), MutationError::LastSensor);
        assert_eq!(genome.input_count(), 1);
    }

    #[test]
    fn equal_parents_do_not_exchange_sensors() {
        let config = config(2, 1);
        let mut history = History::new(&config);
        let p1 = NNGenome::new(&config);
        let mut p2 = p1.clone();
        let added = p2.add_sensor(&mut history, &config).innovation();

        let child = NNGenome::mate(&p1, &p2, &mut history, &config);
        assert_eq!(child.sensor_ids(), vec![0, 1]);
        assert!(child.nodes().all(|n| n.innovation() != added));
        assert!(child.genes().all(|g| g.input() != added));
        assert_links_consistent(&child);
    }

    #[test]
    fn deleting_genes_unlinks_nodes() {
        let mut genome = NNGenome::new(&config(2, 2));
        while genome.mutate_delete_gene().is_some() {
            assert_links_consistent(&genome);
        }
        assert!(genome.nodes().all(|n| n.input_genes().count() == 0));
        assert!(genome.mutate_delete_node().is_none());
    }

    #[test]
    fn child_starts_unevaluated_and_conforming() {
        let config = GeneticConfig {
            child_mutation_chance: 1.0,
            node_addition_mutation_chance: 1.0,
            gene_addition_mutation_chance: 1.0,
            max_gene_addition_mutation_attempts: 5,
            ..config(3, 2)
        };
        let mut history = History::new(&config);
        let mut p1 = NNGenome::new(&config);
        let mut p2 = NNGenome::new(&config);
        p1.set_fitness(4.0);
        p2.set_fitness(1.0);

        let child = NNGenome::mate(&p1, &p2, &mut history, &config);
        assert_eq!(child.fitness(), 0.0);
        assert!(child.conforms_to(&config));
        assert!(child.nodes().any(|n| n.node_type() == NodeType::Neuron));
        assert_links_consistent(&child);
    }

    #[test]
    fn distance_without_common_genes_is_finite() {
        let config = GeneticConfig {
            excess_gene_factor: 1.0,
            disjoint_gene_factor: 1.0,
            common_weight_factor: 0.4,
            ..config(2, 2)
        };
        let full = NNGenome::new(&config);
        let empty = NNGenome::new(&GeneticConfig {
            initial_expression_chance: 0.0,
            ..config.clone()
        });
        let distance = NNGenome::genetic_distance(&full, &empty, &config);
        assert_eq!(distance, 4.0);
    }

    #[test]
    fn serde_round_trip() {
        let genome = NNGenome::new(&config(3, 2));
        let serialized = ron::to_string(&genome).unwrap();
        let deserialized: NNGenome = ron::from_str(&serialized).unwrap();
        assert_eq!(genome, deserialized);
    }
}
