//! # Pedigree Phasing Table
//!
//! Joint optimization over read partitions and inheritance transmission
//! values: for every variant column the table scores all `ploidy^R` read
//! partitions under all `4^T` transmission values, chains adjacent columns
//! through the partitions of their shared reads, and charges
//! `popcount(v ^ v') * recomb_cost[c]` for transmission changes. The
//! result is the minimum-cost phasing, its per-read partitioning, the
//! per-column transmission values and one phased super-read per haplotype
//! per individual.
//!
//! ## Memory
//! Only every `floor(sqrt(C))`-th column keeps its projection and
//! backtrace matrices after the forward pass; the gaps are recomputed on
//! demand while backtracing, bounding retained memory by O(sqrt(C))
//! column triples at the price of at most one extra forward sweep.

use tracing::{debug, info_span, trace};

use crate::data::columns::ReadColumnIterator;
use crate::data::matrix::Matrix;
use crate::data::pedigree::Pedigree;
use crate::data::read::{Entry, Read, ReadSet};
use crate::error::{PhaseError, Result};
use crate::model::cost::{
    saturating_cost_add, ColumnCostComputer, PedigreeColumnCostComputer, INFINITE_COST,
};
use crate::model::indexing::{ColumnIndexingScheme, PartitionStep};
use crate::model::partitions::PedigreePartitions;

/// Quality attached to the non-chosen alleles of emitted super-read calls.
/// Fixed placeholder until calls carry likelihood-derived weights.
const SUPER_READ_ALT_QUALITY: u32 = 10;

/// The chosen partition and transmission value of one column.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct PathEntry {
    partition_index: usize,
    inheritance_value: usize,
}

/// Projection and backtrace matrices of one processed column.
#[derive(Clone, Debug)]
struct ColumnTables {
    /// Minimum cost per (forward projection, transmission)
    projection: Matrix<u32>,
    /// Arg-min full partition index per (forward projection, transmission)
    index_backtrace: Matrix<u32>,
    /// Arg-min predecessor transmission per (forward projection, transmission)
    transmission_backtrace: Matrix<u32>,
}

/// Minimum-cost joint read-partitioning / transmission-path solver.
#[derive(Debug)]
pub struct PedigreeDpTable {
    read_set: ReadSet,
    pedigree: Pedigree,
    recomb_cost: Vec<u32>,
    allele_counts: Vec<u32>,
    positions: Vec<u32>,
    ploidy: u32,
    distrust_genotypes: bool,
    transmission_configurations: usize,
    pedigree_partitions: Vec<PedigreePartitions>,
    /// Dense read id to individual index
    read_sources: Vec<usize>,
    indexers: Vec<ColumnIndexingScheme>,
    /// Per-column entries, in increasing read-id order
    columns: Vec<Vec<Entry>>,
    /// Owned per-column tables; `None` between checkpoints
    tables: Vec<Option<ColumnTables>>,
    index_path: Vec<PathEntry>,
    optimal_score: u32,
    optimal_score_index: usize,
    optimal_transmission_value: usize,
    previous_transmission_value: usize,
}

impl PedigreeDpTable {
    /// Solve the joint phasing problem for one chromosome.
    ///
    /// The read set is consumed; its reads are sorted by start position and
    /// given dense ids `0..N` before anything else happens, observable
    /// afterwards through [`read_set`](Self::read_set). All outputs indexed
    /// by read use those dense ids.
    ///
    /// `precomputed_partitioning` gives each read's partition (indexed by
    /// the read's position in the supplied read set) and skips the
    /// optimization: the score is then the summed site cost of that
    /// partitioning with the transmission value fixed to 0 and no
    /// recombination cost. That restriction is deliberate: a caller
    /// supplying only a partitioning has no transmission path to charge.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mut read_set: ReadSet,
        recomb_cost: Vec<u32>,
        pedigree: Pedigree,
        ploidy: u32,
        distrust_genotypes: bool,
        allele_counts: Vec<u32>,
        positions: Vec<u32>,
        precomputed_partitioning: Option<&[u32]>,
    ) -> Result<Self> {
        if ploidy == 0 {
            return Err(PhaseError::invalid_input("ploidy must be at least 1"));
        }
        let n = positions.len();
        if recomb_cost.len() != n {
            return Err(PhaseError::invalid_input(format!(
                "recombination costs cover {} columns, expected {}",
                recomb_cost.len(),
                n
            )));
        }
        if allele_counts.len() != n {
            return Err(PhaseError::invalid_input(format!(
                "allele counts cover {} columns, expected {}",
                allele_counts.len(),
                n
            )));
        }
        if !positions.windows(2).all(|w| w[0] < w[1]) {
            return Err(PhaseError::invalid_input(
                "positions must be strictly increasing",
            ));
        }
        if let Some(&count) = allele_counts.iter().find(|&&count| count < 2) {
            return Err(PhaseError::invalid_input(format!(
                "every column needs at least two alleles, got {count}"
            )));
        }
        if pedigree.triple_count() > 0 && ploidy != 2 {
            return Err(PhaseError::invalid_input(
                "parent/child triples require ploidy 2",
            ));
        }
        if let Some(partitioning) = precomputed_partitioning {
            if partitioning.len() != read_set.len() {
                return Err(PhaseError::invalid_input(format!(
                    "precomputed partitioning covers {} reads, expected {}",
                    partitioning.len(),
                    read_set.len()
                )));
            }
            if let Some(&part) = partitioning.iter().find(|&&part| part >= ploidy) {
                return Err(PhaseError::invalid_input(format!(
                    "precomputed partition {part} outside ploidy {ploidy}"
                )));
            }
        }

        let permutation = read_set.sort_by_start();
        read_set.reassign_ids();
        let dense_partitioning: Option<Vec<u32>> = precomputed_partitioning
            .map(|partitioning| permutation.iter().map(|&old| partitioning[old]).collect());

        let read_sources = read_set
            .iter()
            .map(|read| {
                pedigree.id_to_index(read.sample_id()).ok_or_else(|| {
                    PhaseError::invalid_input(format!(
                        "read sample {} is not in the pedigree",
                        read.sample_id()
                    ))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let transmission_configurations = 1usize << (2 * pedigree.triple_count());
        let pedigree_partitions = (0..transmission_configurations)
            .map(|value| PedigreePartitions::build(&pedigree, value, ploidy))
            .collect::<Result<Vec<_>>>()?;

        let mut columns: Vec<Vec<Entry>> = Vec::with_capacity(n);
        let mut indexers: Vec<ColumnIndexingScheme> = Vec::with_capacity(n);
        {
            let mut input = ReadColumnIterator::new(&read_set, &positions);
            while let Some(entries) = input.next_column() {
                let column = indexers.len();
                for entry in &entries {
                    if entry.allele >= allele_counts[column] {
                        return Err(PhaseError::invalid_input(format!(
                            "allele {} out of range at column {}",
                            entry.allele, column
                        )));
                    }
                }
                let read_ids: Vec<u32> = entries.iter().map(|e| e.read_id).collect();
                let scheme =
                    ColumnIndexingScheme::new(indexers.last().map(|s| s.read_ids()), read_ids, ploidy);
                if let Some(previous) = indexers.last_mut() {
                    previous.link_forward(scheme.read_ids());
                }
                indexers.push(scheme);
                columns.push(entries);
            }
        }

        let mut table = Self {
            read_set,
            pedigree,
            recomb_cost,
            allele_counts,
            positions,
            ploidy,
            distrust_genotypes,
            transmission_configurations,
            pedigree_partitions,
            read_sources,
            indexers,
            columns,
            tables: Vec::new(),
            index_path: Vec::new(),
            optimal_score: INFINITE_COST,
            optimal_score_index: 0,
            optimal_transmission_value: 0,
            previous_transmission_value: 0,
        };
        match dense_partitioning {
            None => table.compute_table()?,
            Some(partitioning) => table.set_index_path(&partitioning)?,
        }
        Ok(table)
    }

    /// Minimum total cost of the optimal joint phasing.
    pub fn optimal_score(&self) -> u32 {
        self.optimal_score
    }

    /// Ploidy the table was built for
    pub fn ploidy(&self) -> u32 {
        self.ploidy
    }

    /// The densified read set
    pub fn read_set(&self) -> &ReadSet {
        &self.read_set
    }

    /// Consume the table and return the densified read set
    pub fn into_read_set(self) -> ReadSet {
        self.read_set
    }

    /// Partition of every read under the optimal phasing, indexed by dense
    /// read id. Reads covering no column stay in partition 0.
    pub fn optimal_partitioning(&self) -> Vec<u32> {
        let mut partitioning = vec![0u32; self.read_set.len()];
        let ploidy = self.ploidy as usize;
        for (column, step) in self.index_path.iter().enumerate() {
            let mut index = step.partition_index;
            for &read_id in self.indexers[column].read_ids() {
                partitioning[read_id as usize] = (index % ploidy) as u32;
                index /= ploidy;
            }
        }
        partitioning
    }

    /// Positions of haplotype block splits.
    ///
    /// Extension point: block detection over empty-partition transitions is
    /// not implemented and the list is always empty.
    pub fn block_boundaries(&self) -> Vec<u32> {
        Vec::new()
    }

    /// Emit the phased haplotypes: one read set per individual, each with
    /// `ploidy` super-reads calling every column, plus the per-column
    /// transmission values. The chosen allele of every call has quality 0,
    /// all other alleles [`SUPER_READ_ALT_QUALITY`].
    pub fn super_reads(&self) -> (Vec<ReadSet>, Vec<u32>) {
        let n = self.positions.len();
        let ploidy = self.ploidy as usize;
        let individuals = self.pedigree.size();

        let mut per_individual: Vec<Vec<Read>> = (0..individuals)
            .map(|i| {
                (0..ploidy)
                    .map(|j| {
                        Read::new(
                            format!("superread_{}_{}", j, i),
                            None,
                            self.pedigree.index_to_id(i),
                        )
                    })
                    .collect()
            })
            .collect();
        let mut transmission_vector = Vec::with_capacity(n);

        for column in 0..n {
            let step = self.index_path[column];
            let partitions = &self.pedigree_partitions[step.inheritance_value];
            let mut computer = PedigreeColumnCostComputer::new(
                &self.columns[column],
                column,
                &self.read_sources,
                &self.pedigree,
                partitions,
                self.distrust_genotypes,
                self.allele_counts[column],
            );
            computer.set_partitioning(step.partition_index);
            let alleles = computer.get_alleles();

            let n_alleles = self.allele_counts[column] as usize;
            for (individual, reads) in per_individual.iter_mut().enumerate() {
                for (slot, read) in reads.iter_mut().enumerate() {
                    let allele = alleles[individual][slot];
                    let mut qualities = vec![SUPER_READ_ALT_QUALITY; n_alleles];
                    qualities[allele as usize] = 0;
                    read.add_phased_variant(self.positions[column], allele, qualities);
                }
            }
            transmission_vector.push(step.inheritance_value as u32);
        }

        let read_sets = per_individual
            .into_iter()
            .map(|reads| {
                let mut set = ReadSet::new();
                for read in reads {
                    set.add(read);
                }
                set
            })
            .collect();
        (read_sets, transmission_vector)
    }

    fn clear_table(&mut self) {
        let n = self.positions.len();
        self.tables = vec![None; n];
        self.index_path.clear();
        self.optimal_score = INFINITE_COST;
        self.optimal_score_index = 0;
        self.optimal_transmission_value = 0;
        self.previous_transmission_value = 0;
    }

    fn compute_table(&mut self) -> Result<()> {
        self.clear_table();
        let n = self.positions.len();
        if n == 0 {
            self.optimal_score = 0;
            return Ok(());
        }
        let k = (n as f64).sqrt() as usize;

        let span = info_span!(
            "pedigree_dp",
            columns = n,
            transmissions = self.transmission_configurations
        );
        let _enter = span.enter();

        for column in 0..n {
            self.compute_column(column)?;
            // keep every k-th column, drop the rest as soon as its
            // successor has consumed it
            if k > 1 && column > 0 && (column - 1) % k != 0 {
                if self.tables[column - 1].take().is_some() {
                    trace!(column = column - 1, "evicted projection and backtrace tables");
                }
            }
        }
        debug!(score = self.optimal_score, "forward pass complete");

        self.backtrace(k)
    }

    /// Fill the dense DP column for `column` and fold it into the forward
    /// projection (or, for the last column, the running optimum). Assumes
    /// the previous column's projection is present.
    fn compute_column(&mut self, column: usize) -> Result<()> {
        if self.tables[column].is_some() {
            return Ok(());
        }
        let n = self.positions.len();
        let indexer = &self.indexers[column];
        let entries = &self.columns[column];
        let transmissions = self.transmission_configurations;
        let recomb = self.recomb_cost[column];
        let is_last = column + 1 == n;

        let previous_projection = if column > 0 {
            let previous = self.tables[column - 1].as_ref();
            debug_assert!(previous.is_some(), "previous projection missing");
            previous.map(|t| &t.projection)
        } else {
            None
        };

        let mut dp_column = Matrix::new(indexer.column_size(), transmissions, 0u32);
        let mut forward = if is_last {
            None
        } else {
            let size = indexer.forward_projection_size();
            Some(ColumnTables {
                projection: Matrix::new(size, transmissions, INFINITE_COST),
                index_backtrace: Matrix::new(size, transmissions, INFINITE_COST),
                transmission_backtrace: Matrix::new(size, transmissions, INFINITE_COST),
            })
        };

        // one cost computer per transmission value, all driven in lock-step
        // by the same iterator steps
        let mut cost_computers: Vec<PedigreeColumnCostComputer> = (0..transmissions)
            .map(|value| {
                PedigreeColumnCostComputer::new(
                    entries,
                    column,
                    &self.read_sources,
                    &self.pedigree,
                    &self.pedigree_partitions[value],
                    self.distrust_genotypes,
                    self.allele_counts[column],
                )
            })
            .collect();

        let mut best = (
            self.optimal_score,
            self.optimal_score_index,
            self.optimal_transmission_value,
            self.previous_transmission_value,
        );
        let mut min_recomb_index = vec![0usize; transmissions];

        let mut iter = indexer.iter();
        while iter.has_next() {
            match iter.advance() {
                PartitionStep::Reset { index } => {
                    for computer in cost_computers.iter_mut() {
                        computer.set_partitioning(index);
                    }
                }
                PartitionStep::Move { read_pos, partition } => {
                    for computer in cost_computers.iter_mut() {
                        computer.update_partitioning(read_pos, partition);
                    }
                }
            }
            let backward_index = iter.backward_projection();
            let current_index = iter.index();

            let mut found_valid_transmission = false;
            for value in 0..transmissions {
                let current_cost = cost_computers[value].get_cost();
                if current_cost < INFINITE_COST {
                    found_valid_transmission = true;
                }
                let mut minimum = INFINITE_COST;
                let mut minimum_source = 0usize;
                for source in 0..transmissions {
                    let previous_cost =
                        previous_projection.map_or(0, |m| m.at(backward_index, source));
                    let mut candidate = saturating_cost_add(current_cost, previous_cost);
                    let flips = (value ^ source).count_ones();
                    let penalty =
                        (flips as u64 * recomb as u64).min(u64::from(INFINITE_COST)) as u32;
                    candidate = saturating_cost_add(candidate, penalty);
                    if candidate < minimum {
                        minimum = candidate;
                        minimum_source = source;
                    }
                }
                dp_column.set(current_index, value, minimum);
                min_recomb_index[value] = minimum_source;
            }
            if !found_valid_transmission {
                return Err(PhaseError::mendelian_conflict(column));
            }

            match forward.as_mut() {
                None => {
                    // last column: track the global optimum directly
                    for value in 0..transmissions {
                        let candidate = dp_column.at(current_index, value);
                        if candidate < best.0 {
                            best = (candidate, current_index, value, min_recomb_index[value]);
                        }
                    }
                }
                Some(tables) => {
                    let forward_index = iter.forward_projection();
                    for value in 0..transmissions {
                        let candidate = dp_column.at(current_index, value);
                        if candidate < tables.projection.at(forward_index, value) {
                            tables.projection.set(forward_index, value, candidate);
                            tables
                                .index_backtrace
                                .set(forward_index, value, current_index as u32);
                            tables.transmission_backtrace.set(
                                forward_index,
                                value,
                                min_recomb_index[value] as u32,
                            );
                        }
                    }
                }
            }
        }

        match forward {
            Some(tables) => self.tables[column] = Some(tables),
            None => {
                self.optimal_score = best.0;
                self.optimal_score_index = best.1;
                self.optimal_transmission_value = best.2;
                self.previous_transmission_value = best.3;
            }
        }
        Ok(())
    }

    /// Walk the backtrace matrices right to left, rebuilding evicted
    /// columns from the nearest retained checkpoint as needed.
    fn backtrace(&mut self, k: usize) -> Result<()> {
        let n = self.positions.len();
        self.index_path = vec![PathEntry::default(); n];
        let mut current = PathEntry {
            partition_index: self.optimal_score_index,
            inheritance_value: self.optimal_transmission_value,
        };
        let mut previous_inheritance = self.previous_transmission_value;
        self.index_path[n - 1] = current;

        for i in (1..n).rev() {
            if self.tables[i - 1].is_none() {
                let checkpoint = (i - 1) / k * k;
                debug_assert!(self.tables[checkpoint].is_some());
                for j in checkpoint + 1..i {
                    self.compute_column(j)?;
                }
                debug!(from = checkpoint + 1, to = i - 1, "rebuilt evicted columns");
            }
            let backtrace_index = self.indexers[i].project_backward(current.partition_index);
            let tables = self.tables[i - 1]
                .as_ref()
                .expect("backtrace tables present after rebuild");
            current.partition_index =
                tables.index_backtrace.at(backtrace_index, previous_inheritance) as usize;
            current.inheritance_value = previous_inheritance;
            previous_inheritance = tables
                .transmission_backtrace
                .at(backtrace_index, current.inheritance_value)
                as usize;
            self.index_path[i - 1] = current;

            // everything at or beyond a passed checkpoint is done
            if i % k == 0 {
                for j in i..(i + k).min(n.saturating_sub(1)) {
                    self.tables[j] = None;
                }
            }
        }
        Ok(())
    }

    /// Score a caller-supplied partitioning: transmission value 0
    /// throughout, site costs only.
    fn set_index_path(&mut self, partitioning: &[u32]) -> Result<()> {
        self.clear_table();
        self.optimal_score = 0;
        let n = self.positions.len();
        if n == 0 {
            return Ok(());
        }
        self.index_path = vec![PathEntry::default(); n];
        let ploidy = self.ploidy as usize;

        for column in 0..n {
            let mut index = 0usize;
            let mut weight = 1usize;
            for &read_id in self.indexers[column].read_ids() {
                index += partitioning[read_id as usize] as usize * weight;
                weight *= ploidy;
            }
            self.index_path[column] = PathEntry {
                partition_index: index,
                inheritance_value: 0,
            };

            let mut computer = PedigreeColumnCostComputer::new(
                &self.columns[column],
                column,
                &self.read_sources,
                &self.pedigree,
                &self.pedigree_partitions[0],
                self.distrust_genotypes,
                self.allele_counts[column],
            );
            computer.set_partitioning(index);
            let cost = computer.get_cost();
            if cost == INFINITE_COST {
                return Err(PhaseError::mendelian_conflict(column));
            }
            self.optimal_score = saturating_cost_add(self.optimal_score, cost);
        }
        Ok(())
    }
}
