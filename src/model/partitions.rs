//! # Pedigree Partitions
//!
//! For one transmission value, the mapping from an individual's haplotype
//! slots to global haplotype partitions. Founders own fresh partitions;
//! a child's slots alias the parental slots selected by the transmission
//! bits, so reads of related individuals land in shared partitions and
//! Mendelian consistency falls out of the shared-allele assignment.
//!
//! One table is built per transmission value `[0, 4^T)` before the
//! dynamic program starts; lookups afterwards are plain array reads.

use crate::data::pedigree::Pedigree;
use crate::error::{PhaseError, Result};

/// Haplotype-slot to partition mapping under one fixed transmission value.
#[derive(Clone, Debug)]
pub struct PedigreePartitions {
    ploidy: u32,
    partition_count: u32,
    /// `map[individual][slot]` = global partition id
    map: Vec<Vec<u32>>,
}

impl PedigreePartitions {
    /// Build the partition table for `transmission` in `[0, 4^T)`.
    ///
    /// Bits `2k` and `2k+1` of `transmission` select the maternal and
    /// paternal slot transmitted in triple `k`. Triples require diploid
    /// individuals; pedigrees whose triples cannot be resolved (a child
    /// that is its own ancestor) are rejected.
    pub fn build(pedigree: &Pedigree, transmission: usize, ploidy: u32) -> Result<Self> {
        if ploidy == 0 {
            return Err(PhaseError::invalid_input("ploidy must be at least 1"));
        }
        if pedigree.triple_count() > 0 && ploidy != 2 {
            return Err(PhaseError::invalid_input(
                "parent/child triples require ploidy 2",
            ));
        }

        let n = pedigree.size();
        let p = ploidy as usize;
        let mut map: Vec<Vec<Option<u32>>> = vec![vec![None; p]; n];

        let mut is_child = vec![false; n];
        for triple in pedigree.triples() {
            is_child[triple.child] = true;
        }

        // founders: one fresh partition per haplotype slot
        let mut partition_count = 0u32;
        for (i, slots) in map.iter_mut().enumerate() {
            if !is_child[i] {
                for slot in slots.iter_mut() {
                    *slot = Some(partition_count);
                    partition_count += 1;
                }
            }
        }

        // children alias the transmitted parental slots; resolve
        // transitively until no triple makes progress
        let mut unresolved = pedigree.triple_count();
        while unresolved > 0 {
            let mut progressed = false;
            for (k, triple) in pedigree.triples().iter().enumerate() {
                if map[triple.child][0].is_some() {
                    continue;
                }
                let maternal_slot = (transmission >> (2 * k)) & 1;
                let paternal_slot = (transmission >> (2 * k + 1)) & 1;
                if let (Some(m), Some(f)) = (
                    map[triple.mother][maternal_slot],
                    map[triple.father][paternal_slot],
                ) {
                    map[triple.child][0] = Some(m);
                    map[triple.child][1] = Some(f);
                    unresolved -= 1;
                    progressed = true;
                }
            }
            if unresolved > 0 && !progressed {
                return Err(PhaseError::invalid_input(
                    "pedigree triples cannot be resolved to founder haplotypes",
                ));
            }
        }

        let map = map
            .into_iter()
            .map(|slots| slots.into_iter().map(|s| s.unwrap_or(0)).collect())
            .collect();

        Ok(Self {
            ploidy,
            partition_count,
            map,
        })
    }

    /// Global partition of `individual`'s haplotype `slot`.
    #[inline]
    pub fn haplotype_to_partition(&self, individual: usize, slot: u32) -> u32 {
        self.map[individual][slot as usize]
    }

    /// Number of distinct partitions (founder haplotypes)
    pub fn count(&self) -> u32 {
        self.partition_count
    }

    /// Ploidy the table was built for
    pub fn ploidy(&self) -> u32 {
        self.ploidy
    }
}
