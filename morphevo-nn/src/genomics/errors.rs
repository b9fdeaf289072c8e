//! Failures of structural edits to controller genomes.
use crate::Innovation;

use std::error::Error;
use std::fmt;

/// A gene that cannot be inserted into a genome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneInsertionError {
    /// Another gene already carries the innovation number.
    InnovationTaken {
        gene: Innovation,
        endpoints: (Innovation, Innovation),
    },
    /// One or both endpoints are not nodes of the genome.
    MissingEndpoint {
        input: Innovation,
        output: Innovation,
    },
    /// Another gene already links the same endpoints.
    AlreadyLinked {
        gene: Innovation,
        endpoints: (Innovation, Innovation),
    },
    /// Signals cannot flow into a sensor.
    IntoSensor(Innovation),
}

/// A hidden node whose innovation number is already taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeInsertionError(pub Innovation);

/// A structural mutation that found nothing to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MutationError {
    /// Every node already feeds every node it may feed.
    FullyConnected,
    /// No unlinked pair of nodes turned up within the allowed attempts.
    NoUnlinkedPair,
    /// No expressed gene is left to split.
    NothingToSplit,
    /// A controller keeps at least one sensor.
    LastSensor,
    /// The controller has no sensor at this input index.
    NoSuchSensor(usize),
}

impl fmt::Display for GeneInsertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InnovationTaken {
                gene,
                endpoints: (input, output),
            } => write!(
                f,
                "gene {} ({} -> {}) reuses an innovation number already in the genome",
                gene, input, output
            ),
            Self::MissingEndpoint { input, output } => {
                write!(f, "gene {} -> {} has an endpoint outside the genome", input, output)
            }
            Self::AlreadyLinked {
                gene,
                endpoints: (input, output),
            } => write!(
                f,
                "gene {} would link {} -> {} a second time",
                gene, input, output
            ),
            Self::IntoSensor(id) => write!(f, "gene would feed into sensor {}", id),
        }
    }
}

impl fmt::Display for NodeInsertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "node {} is already in the genome", self.0)
    }
}

impl fmt::Display for MutationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::FullyConnected => write!(f, "controller is fully connected"),
            Self::NoUnlinkedPair => write!(f, "no unlinked node pair found"),
            Self::NothingToSplit => write!(f, "controller has no expressed gene to split"),
            Self::LastSensor => write!(f, "cannot remove the only sensor"),
            Self::NoSuchSensor(index) => write!(f, "controller has no sensor input {}", index),
        }
    }
}

impl Error for GeneInsertionError {}
impl Error for NodeInsertionError {}
impl Error for MutationError {}
