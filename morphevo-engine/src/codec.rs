/// A decoder from a genome into its phenotype.
///
/// Decoding must be pure: the same genome always
/// yields an equivalent phenotype, and the genome
/// is left untouched.
pub trait Codec<G> {
    type Output;

    /// Builds the phenotype encoded by `genome`.
    fn decode(&self, genome: &G) -> Self::Output;
}
