use super::SpeciesID;

use std::error::Error;
use std::fmt;

/// An error type indicating that no offspring
/// could be allotted to the population's species.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OffspringAllotmentError {
    /// The population has no genomes.
    EmptyPopulation,
}

/// A fitness value that is negative or not finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidFitness(pub f32);

/// An error type indicating a population
/// breaks one of its structural invariants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopulationValidityError {
    /// The population has no genomes.
    EmptyPopulation,
    /// A species has no members.
    EmptySpecies(SpeciesID),
    /// A genome of the species does not conform
    /// to the population's genetic configuration.
    NonconformingGenome(SpeciesID),
}

impl fmt::Display for OffspringAllotmentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPopulation => write!(f, "attempted evolution on empty population"),
        }
    }
}

impl fmt::Display for InvalidFitness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid fitness {}", self.0)
    }
}

impl fmt::Display for PopulationValidityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPopulation => write!(f, "population contains no genomes"),
            Self::EmptySpecies(id) => write!(f, "species {:?} has no members", id),
            Self::NonconformingGenome(id) => write!(
                f,
                "species {:?} contains a genome incompatible with the genetic configuration",
                id
            ),
        }
    }
}

impl Error for OffspringAllotmentError {}
impl Error for PopulationValidityError {}
impl Error for InvalidFitness {}
