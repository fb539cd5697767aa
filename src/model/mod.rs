//! # Model Module
//!
//! The phasing machinery: partition bookkeeping, per-column cost
//! computation and the joint dynamic program.
//!
//! ## Sub-modules
//! - `partitions`: haplotype-slot to partition maps per transmission value
//! - `indexing`: partition index spaces and their Gray-code traversal
//! - `cost`: per-column site costs under a fixed transmission value
//! - `dp`: the checkpointed forward/backtrace table

pub mod cost;
pub mod dp;
pub mod indexing;
pub mod partitions;

pub use cost::{saturating_cost_add, ColumnCostComputer, PedigreeColumnCostComputer, INFINITE_COST};
pub use dp::PedigreeDpTable;
pub use indexing::{ColumnIndexingIterator, ColumnIndexingScheme, PartitionStep};
pub use partitions::PedigreePartitions;
