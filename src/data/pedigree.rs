//! # Pedigree Model
//!
//! Individuals, parent/child triples and per-site genotype knowledge.
//!
//! Individuals are registered in a fixed order and addressed either by
//! their external sample id or by their dense index; the phasing table
//! works exclusively with indices. Genotypes are unordered allele
//! multisets per variant column (`None` means unknown and constrains
//! nothing). A column may additionally carry phred-scaled genotype
//! likelihood costs, consulted when genotypes are distrusted.

use std::collections::HashMap;

use crate::error::{PhaseError, Result};

/// Unordered multiset of allele ids, the genotype of one individual at one
/// variant site. The allele list is kept sorted so equality is multiset
/// equality.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Genotype {
    alleles: Vec<u32>,
}

impl Genotype {
    /// Create a genotype from the given alleles (any order).
    pub fn new(mut alleles: Vec<u32>) -> Self {
        alleles.sort_unstable();
        Self { alleles }
    }

    /// Diploid shorthand
    pub fn diploid(a: u32, b: u32) -> Self {
        Self::new(vec![a, b])
    }

    /// Homozygous genotype of the given ploidy
    pub fn homozygous(allele: u32, ploidy: u32) -> Self {
        Self {
            alleles: vec![allele; ploidy as usize],
        }
    }

    /// The sorted allele multiset
    pub fn alleles(&self) -> &[u32] {
        &self.alleles
    }

    /// Number of alleles (the individual's ploidy at this site)
    pub fn ploidy(&self) -> usize {
        self.alleles.len()
    }
}

/// Phred-scaled genotype likelihood costs for one variant site.
///
/// Genotypes absent from the table are considered ruled out (infinite
/// cost), so a table listing a single genotype pins the site down while a
/// missing table (at the individual level) leaves the site unconstrained.
#[derive(Clone, Debug, Default)]
pub struct PhredGenotypeLikelihoods {
    costs: HashMap<Vec<u32>, u32>,
}

impl PhredGenotypeLikelihoods {
    /// Create an empty likelihood table
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the phred cost of a genotype
    pub fn insert(&mut self, genotype: Genotype, phred_cost: u32) {
        self.costs.insert(genotype.alleles, phred_cost);
    }

    /// Phred cost of the genotype given as a sorted allele multiset;
    /// `u32::MAX` if the genotype is not listed.
    pub fn cost_of(&self, sorted_alleles: &[u32]) -> u32 {
        self.costs.get(sorted_alleles).copied().unwrap_or(u32::MAX)
    }
}

/// One individual with its per-column genotype knowledge.
#[derive(Clone, Debug)]
struct Individual {
    id: u32,
    genotypes: Vec<Option<Genotype>>,
    likelihoods: Vec<Option<PhredGenotypeLikelihoods>>,
}

/// A mother/father/child relationship, by individual index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Triple {
    pub mother: usize,
    pub father: usize,
    pub child: usize,
}

/// An ordered set of individuals plus their parent/child triples.
#[derive(Clone, Debug, Default)]
pub struct Pedigree {
    individuals: Vec<Individual>,
    index_of: HashMap<u32, usize>,
    triples: Vec<Triple>,
}

impl Pedigree {
    /// Create an empty pedigree
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an individual with its per-column genotypes. Returns the
    /// individual's dense index.
    pub fn add_individual(&mut self, id: u32, genotypes: Vec<Option<Genotype>>) -> Result<usize> {
        if self.index_of.contains_key(&id) {
            return Err(PhaseError::invalid_input(format!(
                "individual {id} registered twice"
            )));
        }
        let index = self.individuals.len();
        let n_sites = genotypes.len();
        self.individuals.push(Individual {
            id,
            genotypes,
            likelihoods: vec![None; n_sites],
        });
        self.index_of.insert(id, index);
        Ok(index)
    }

    /// Attach genotype likelihoods for one individual at one column.
    pub fn set_genotype_likelihoods(
        &mut self,
        id: u32,
        column: usize,
        likelihoods: PhredGenotypeLikelihoods,
    ) -> Result<()> {
        let index = self
            .id_to_index(id)
            .ok_or_else(|| PhaseError::invalid_input(format!("unknown individual {id}")))?;
        let individual = &mut self.individuals[index];
        if column >= individual.likelihoods.len() {
            individual.likelihoods.resize(column + 1, None);
        }
        individual.likelihoods[column] = Some(likelihoods);
        Ok(())
    }

    /// Register a mother/father/child triple by sample ids.
    pub fn add_relationship(&mut self, mother_id: u32, father_id: u32, child_id: u32) -> Result<()> {
        let resolve = |id: u32, this: &Self| {
            this.id_to_index(id)
                .ok_or_else(|| PhaseError::invalid_input(format!("unknown individual {id}")))
        };
        let triple = Triple {
            mother: resolve(mother_id, self)?,
            father: resolve(father_id, self)?,
            child: resolve(child_id, self)?,
        };
        self.triples.push(triple);
        Ok(())
    }

    /// Number of individuals
    pub fn size(&self) -> usize {
        self.individuals.len()
    }

    /// Number of parent/child triples
    pub fn triple_count(&self) -> usize {
        self.triples.len()
    }

    /// The registered triples, in insertion order
    pub fn triples(&self) -> &[Triple] {
        &self.triples
    }

    /// Dense index of a sample id
    pub fn id_to_index(&self, id: u32) -> Option<usize> {
        self.index_of.get(&id).copied()
    }

    /// Sample id of a dense index
    pub fn index_to_id(&self, index: usize) -> u32 {
        self.individuals[index].id
    }

    /// Genotype of an individual at a column, if known
    pub fn genotype(&self, index: usize, column: usize) -> Option<&Genotype> {
        self.individuals[index]
            .genotypes
            .get(column)
            .and_then(|g| g.as_ref())
    }

    /// Genotype likelihoods of an individual at a column, if present
    pub fn genotype_likelihoods(
        &self,
        index: usize,
        column: usize,
    ) -> Option<&PhredGenotypeLikelihoods> {
        self.individuals[index]
            .likelihoods
            .get(column)
            .and_then(|l| l.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_lookup() {
        let mut ped = Pedigree::new();
        let m = ped
            .add_individual(10, vec![Some(Genotype::diploid(0, 1))])
            .unwrap();
        let f = ped
            .add_individual(20, vec![Some(Genotype::diploid(0, 0))])
            .unwrap();
        let c = ped.add_individual(30, vec![None]).unwrap();
        ped.add_relationship(10, 20, 30).unwrap();

        assert_eq!(ped.size(), 3);
        assert_eq!(ped.triple_count(), 1);
        assert_eq!(ped.id_to_index(20), Some(f));
        assert_eq!(ped.index_to_id(c), 30);
        assert_eq!(ped.triples()[0], Triple { mother: m, father: f, child: c });

        assert_eq!(ped.genotype(m, 0), Some(&Genotype::diploid(1, 0)));
        assert_eq!(ped.genotype(c, 0), None);
        assert_eq!(ped.genotype(c, 5), None);
    }

    #[test]
    fn test_duplicate_individual_rejected() {
        let mut ped = Pedigree::new();
        ped.add_individual(1, vec![]).unwrap();
        assert!(ped.add_individual(1, vec![]).is_err());
    }

    #[test]
    fn test_relationship_requires_known_ids() {
        let mut ped = Pedigree::new();
        ped.add_individual(1, vec![]).unwrap();
        assert!(ped.add_relationship(1, 2, 3).is_err());
    }

    #[test]
    fn test_genotype_multiset_equality() {
        assert_eq!(Genotype::diploid(1, 0), Genotype::diploid(0, 1));
        assert_ne!(Genotype::diploid(1, 1), Genotype::diploid(0, 1));
        assert_eq!(Genotype::homozygous(2, 3).alleles(), &[2, 2, 2]);
    }

    #[test]
    fn test_likelihood_lookup() {
        let mut gl = PhredGenotypeLikelihoods::new();
        gl.insert(Genotype::diploid(0, 1), 3);
        gl.insert(Genotype::diploid(1, 1), 40);
        assert_eq!(gl.cost_of(&[0, 1]), 3);
        assert_eq!(gl.cost_of(&[1, 1]), 40);
        assert_eq!(gl.cost_of(&[0, 0]), u32::MAX);
    }
}
