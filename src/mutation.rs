//! Synthetic genomic data for the NGS variant: a short list of
//! mutated genes per patient and a matrix of fake sequencing reads.
//!
//! None of this feeds into the clinical columns. It is drawn from
//! its own seeded stream, so enabling genomics does not change any
//! other column.

use rand::prelude::*;

pub const GENE_PANEL: [&str; 10] = [
    "BRCA1", "BRCA2", "TP53", "EGFR", "KRAS", "ALK", "PIK3CA", "PTEN", "RB1", "NRAS",
];

pub const MIN_MUTATIONS: usize = 1;
pub const MAX_MUTATIONS: usize = 4;

/// Number of reads in the read matrix
pub const READ_COUNT: usize = 100;
/// Number of base-call values per read
pub const BASES_PER_READ: usize = 4;
/// Base-call values lie in 0..READ_VALUE_LIMIT
pub const READ_VALUE_LIMIT: i32 = 100;

pub type SequencingRead = [i32; BASES_PER_READ];

/// The genomic payload of one patient
#[derive(Debug, Clone, PartialEq)]
pub struct MutationPanel {
    /// Distinct genes, in the order they were drawn
    pub mutations: Vec<&'static str>,
    pub reads: Vec<SequencingRead>,
}

impl MutationPanel {
    pub fn joined(&self) -> String {
        self.mutations.join(",")
    }
}

/// Draw between one and four distinct genes from the panel
pub fn make_mutations<R: Rng + ?Sized>(rng: &mut R) -> Vec<&'static str> {
    let count = rng.gen_range(MIN_MUTATIONS..=MAX_MUTATIONS);
    GENE_PANEL.choose_multiple(rng, count).copied().collect()
}

/// Uniform noise standing in for sequencing reads
pub fn make_reads<R: Rng + ?Sized>(rng: &mut R) -> Vec<SequencingRead> {
    (0..READ_COUNT)
        .map(|_| {
            let mut read = [0; BASES_PER_READ];
            for base in read.iter_mut() {
                *base = rng.gen_range(0..READ_VALUE_LIMIT);
            }
            read
        })
        .collect()
}

pub fn make_mutation_panel<R: Rng + ?Sized>(rng: &mut R) -> MutationPanel {
    let mutations = make_mutations(rng);
    let reads = make_reads(rng);
    MutationPanel { mutations, reads }
}

/// Look up a gene symbol in the panel
pub fn panel_gene(name: &str) -> Option<&'static str> {
    GENE_PANEL.iter().copied().find(|gene| *gene == name)
}

#[cfg(test)]
mod tests {

    use super::*;
    use crate::seeded_rng::make_rng;
    use std::collections::HashSet;

    #[test]
    fn mutations_are_distinct_panel_genes() {
        let mut rng = make_rng(6, "mutations");
        let mut sizes = HashSet::new();
        for _ in 0..2000 {
            let mutations = make_mutations(&mut rng);
            assert!((MIN_MUTATIONS..=MAX_MUTATIONS).contains(&mutations.len()));
            let unique: HashSet<_> = mutations.iter().collect();
            assert_eq!(unique.len(), mutations.len());
            assert!(mutations.iter().all(|g| GENE_PANEL.contains(g)));
            sizes.insert(mutations.len());
        }
        // Every count from one to four turns up
        assert_eq!(sizes.len(), MAX_MUTATIONS);
    }

    #[test]
    fn read_matrix_has_expected_shape_and_range() {
        let mut rng = make_rng(6, "reads");
        let reads = make_reads(&mut rng);
        assert_eq!(reads.len(), READ_COUNT);
        assert!(reads
            .iter()
            .flatten()
            .all(|v| (0..READ_VALUE_LIMIT).contains(v)));
    }

    #[test]
    fn panel_lookup() {
        assert_eq!(panel_gene("TP53"), Some("TP53"));
        assert_eq!(panel_gene("tp53"), None);
    }
}
