use super::{PopulationConfig, Species, SpeciesID};
use crate::Genome;

use ahash::RandomState;
use rand::prelude::{IteratorRandom, Rng, SliceRandom};

use std::collections::HashMap;

/// Auxiliary type for offspring generation.
/// Handles all the tasks of generating a population's
/// offspring according to the specified configs
/// and allotted offspring.
pub(super) struct OffspringFactory<'a, C, H, G> {
    species: &'a [Species<G>],
    history: &'a mut H,
    genetic_config: &'a C,
    population_config: &'a PopulationConfig,
}

impl<'a, C, H, G> OffspringFactory<'a, C, H, G>
where
    G: Genome<InnovationHistory = H, Config = C> + Clone,
{
    pub(super) fn new(
        species: &'a [Species<G>],
        history: &'a mut H,
        genetic_config: &'a C,
        population_config: &'a PopulationConfig,
    ) -> OffspringFactory<'a, C, H, G> {
        OffspringFactory {
            species,
            history,
            genetic_config,
            population_config,
        }
    }

    /// Generate the alloted offspring.
    pub(super) fn generate_offspring(
        &mut self,
        allotted_offspring: &[usize],
    ) -> HashMap<SpeciesID, Vec<G>, RandomState> {
        let mut offspring_of_species: HashMap<SpeciesID, Vec<G>, RandomState> = self
            .species
            .iter()
            .zip(allotted_offspring)
            .map(|(s, allotted)| (s.id(), Vec::with_capacity(*allotted)))
            .collect();

        for (species_index, allotted_offspring) in allotted_offspring.iter().enumerate() {
            let current_species = &self.species[species_index];
            let elite = current_species
                .count_elite(self.population_config)
                .min(*allotted_offspring);
            let offspring = allotted_offspring - elite;

            self.add_species_elite(&mut offspring_of_species, species_index, elite);
            self.add_mated_offspring(offspring, &mut offspring_of_species, species_index);
        }

        offspring_of_species
    }

    /// Add the top "elite" members of the species
    /// to the offspring.
    fn add_species_elite(
        &mut self,
        offspring_map: &mut HashMap<SpeciesID, Vec<G>, RandomState>,
        species_index: usize,
        elite: usize,
    ) {
        let species = &self.species[species_index];
        offspring_map
            .entry(species.id())
            .or_default()
            .extend_from_slice(&species.genomes[0..elite])
    }

    /// Choose parents from the species or from
    /// other species and mate them, adding the child
    /// to the species' offspring.
    fn add_mated_offspring(
        &mut self,
        offspring: usize,
        species_offspring: &mut HashMap<SpeciesID, Vec<G>, RandomState>,
        species_index: usize,
    ) {
        // Species are borrowed through the slice rather than
        // `self` so that `self.history` can be mutated below.
        let all_species = self.species;
        let species = &all_species[species_index];
        let survivors = species.count_survivors(self.population_config);
        let eligible_parents = &species.genomes[..survivors];
        let mut rng = rand::thread_rng();

        for _ in 0..offspring {
            let parent1 = eligible_parents
                .choose(&mut rng)
                .unwrap_or_else(|| panic!("no eligible parents in species {:?}", species.id()));
            let (child, child_species) =
                if rng.gen::<f32>() < self.population_config.sexual_reproduction_chance {
                    let (parent2_species, parent2) =
                        Self::choose_second_parent(species, all_species, self.population_config);
                    let child_species = if rng.gen::<bool>() {
                        species.id()
                    } else {
                        parent2_species
                    };
                    (
                        G::mate(parent1, parent2, self.history, self.genetic_config),
                        child_species,
                    )
                } else {
                    (
                        G::mate(parent1, parent1, self.history, self.genetic_config),
                        species.id(),
                    )
                };
            species_offspring
                .entry(child_species)
                .or_default()
                .push(child);
        }
    }

    /// Choose a parent from the currents species,
    /// or from another randomly selected.
    fn choose_second_parent(
        current_species: &'a Species<G>,
        all_species: &'a [Species<G>],
        population_config: &PopulationConfig,
    ) -> (SpeciesID, &'a G) {
        let mut rng = rand::thread_rng();

        let chosen = if all_species.len() > 1
            && rng.gen::<f32>() < population_config.interspecies_mating_chance
        {
            all_species
                .iter()
                .filter(|s| s.id() != current_species.id() && !s.genomes.is_empty())
                .choose(&mut rng)
                .unwrap_or(current_species)
        } else {
            current_species
        };
        (
            chosen.id(),
            chosen.genomes.choose(&mut rng).unwrap_or_else(|| {
                panic!("no eligible parents in species {:?}", chosen.id())
            }),
        )
    }
}
