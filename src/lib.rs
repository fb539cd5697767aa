//! # Pedphase
//!
//! Pedigree-aware read-based phasing core.
//!
//! Given sequencing reads over the variant positions of a family of
//! related individuals, the crate computes the minimum-cost joint
//! assignment of reads to haplotypes and inheritance transmission values
//! per site, trading read-allele corrections (a weighted minimum error
//! correction objective) against recombination penalties between adjacent
//! sites. The solver runs in memory sublinear in the number of sites by
//! keeping only square-root-spaced checkpoints of its table and
//! recomputing the gaps during backtrace.
//!
//! ## Modules
//! - `data`: reads, pedigree, column streaming and matrix storage
//! - `error`: error types and result alias
//! - `model`: partition indexing, site costs and the dynamic program
//!
//! ## Example
//! ```
//! use pedphase::{Genotype, Pedigree, PedigreeDpTable, Read, ReadSet};
//!
//! let mut pedigree = Pedigree::new();
//! pedigree
//!     .add_individual(0, vec![Some(Genotype::diploid(0, 1))])
//!     .unwrap();
//!
//! let mut reads = ReadSet::new();
//! let mut read = Read::new("r1", Some(60), 0);
//! read.add_variant(100, 1, 30);
//! reads.add(read);
//!
//! let table = PedigreeDpTable::new(
//!     reads,
//!     vec![0],
//!     pedigree,
//!     2,
//!     false,
//!     vec![2],
//!     vec![100],
//!     None,
//! )
//! .unwrap();
//! assert_eq!(table.optimal_score(), 0);
//! ```

pub mod data;
pub mod error;
pub mod model;

// Re-export commonly used types
pub use data::{
    Entry, Genotype, Matrix, Pedigree, PhredGenotypeLikelihoods, Read, ReadColumnIterator, ReadSet,
    Triple, Variant,
};
pub use error::{PhaseError, Result};
pub use model::{
    ColumnCostComputer, ColumnIndexingIterator, ColumnIndexingScheme, PartitionStep,
    PedigreeColumnCostComputer, PedigreeDpTable, PedigreePartitions, INFINITE_COST,
};
