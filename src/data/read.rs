//! # Read Containers
//!
//! In-memory representation of sequencing reads restricted to variant
//! positions: each `Read` carries its `(position, allele, quality)` calls,
//! a `ReadSet` owns a collection of reads, and `Entry` is the per-column
//! view of one read's call handed to the cost computers.
//!
//! Read ids are assigned densely in `[0, N)` by [`ReadSet::reassign_ids`]
//! after sorting by start position; the phasing table relies on that order
//! so that the reads shared by adjacent columns appear in the same relative
//! order on both sides.

/// A single allele call of one read at one variant position.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Variant {
    /// Genomic position of the variant
    pub position: u32,
    /// Observed (or, for phased calls, committed) allele id
    pub allele: u32,
    /// Phred-scaled cost of assigning this read's call to a different allele
    pub quality: u32,
    /// Per-allele assignment costs attached to emitted phased calls;
    /// empty for raw observations
    pub allele_qualities: Vec<u32>,
}

/// One read's observation inside a single variant column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Entry {
    /// Dense id of the read this observation belongs to
    pub read_id: u32,
    /// Observed allele id, in `[0, n_alleles)` for the column
    pub allele: u32,
    /// Phred-scaled flip cost of the observation
    pub quality: u32,
}

/// A sequencing read reduced to its variant-position calls.
#[derive(Clone, Debug)]
pub struct Read {
    name: String,
    mapq: Option<u32>,
    sample_id: u32,
    id: Option<u32>,
    variants: Vec<Variant>,
}

impl Read {
    /// Create an empty read for the given sample.
    pub fn new(name: impl Into<String>, mapq: Option<u32>, sample_id: u32) -> Self {
        Self {
            name: name.into(),
            mapq,
            sample_id,
            id: None,
            variants: Vec::new(),
        }
    }

    /// Append an observation. Positions must be added in increasing order.
    pub fn add_variant(&mut self, position: u32, allele: u32, quality: u32) {
        debug_assert!(
            self.variants.last().map_or(true, |v| v.position < position),
            "variants must be added in increasing position order"
        );
        self.variants.push(Variant {
            position,
            allele,
            quality,
            allele_qualities: Vec::new(),
        });
    }

    /// Append a phased call carrying per-allele assignment costs.
    pub fn add_phased_variant(&mut self, position: u32, allele: u32, allele_qualities: Vec<u32>) {
        debug_assert!(
            self.variants.last().map_or(true, |v| v.position < position),
            "variants must be added in increasing position order"
        );
        let quality = allele_qualities.get(allele as usize).copied().unwrap_or(0);
        self.variants.push(Variant {
            position,
            allele,
            quality,
            allele_qualities,
        });
    }

    /// Read name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Mapping quality, if known
    pub fn mapq(&self) -> Option<u32> {
        self.mapq
    }

    /// Sample this read was drawn from
    pub fn sample_id(&self) -> u32 {
        self.sample_id
    }

    /// Dense read id, once assigned by the owning [`ReadSet`]
    pub fn id(&self) -> Option<u32> {
        self.id
    }

    /// Number of variant calls
    pub fn variant_count(&self) -> usize {
        self.variants.len()
    }

    /// Variant call by index
    pub fn variant(&self, i: usize) -> &Variant {
        &self.variants[i]
    }

    /// All variant calls, in increasing position order
    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Position of the first variant call, if any
    pub fn first_position(&self) -> Option<u32> {
        self.variants.first().map(|v| v.position)
    }

    /// Position of the last variant call, if any
    pub fn last_position(&self) -> Option<u32> {
        self.variants.last().map(|v| v.position)
    }
}

/// An owned collection of reads.
#[derive(Clone, Debug, Default)]
pub struct ReadSet {
    reads: Vec<Read>,
}

impl ReadSet {
    /// Create an empty read set
    pub fn new() -> Self {
        Self { reads: Vec::new() }
    }

    /// Add a read
    pub fn add(&mut self, read: Read) {
        self.reads.push(read);
    }

    /// Number of reads
    pub fn len(&self) -> usize {
        self.reads.len()
    }

    /// Whether the set contains no reads
    pub fn is_empty(&self) -> bool {
        self.reads.is_empty()
    }

    /// Read by index
    pub fn get(&self, i: usize) -> &Read {
        &self.reads[i]
    }

    /// Iterate over the reads in storage order
    pub fn iter(&self) -> impl Iterator<Item = &Read> {
        self.reads.iter()
    }

    /// Sort reads by start position (ties broken by name for determinism).
    ///
    /// Returns the permutation applied: element `i` is the previous index of
    /// the read now stored at position `i`.
    pub fn sort_by_start(&mut self) -> Vec<usize> {
        let mut order: Vec<usize> = (0..self.reads.len()).collect();
        order.sort_by(|&a, &b| {
            let ra = &self.reads[a];
            let rb = &self.reads[b];
            ra.first_position()
                .cmp(&rb.first_position())
                .then_with(|| ra.name.cmp(&rb.name))
        });
        let mut sorted = Vec::with_capacity(self.reads.len());
        for &i in &order {
            sorted.push(self.reads[i].clone());
        }
        self.reads = sorted;
        order
    }

    /// Assign dense ids `0..N` in current storage order.
    pub fn reassign_ids(&mut self) {
        for (i, read) in self.reads.iter_mut().enumerate() {
            read.id = Some(i as u32);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn read_at(name: &str, positions: &[u32]) -> Read {
        let mut r = Read::new(name, Some(60), 0);
        for &p in positions {
            r.add_variant(p, 0, 10);
        }
        r
    }

    #[test]
    fn test_read_accessors() {
        let mut r = Read::new("r1", Some(50), 7);
        r.add_variant(100, 1, 30);
        r.add_variant(200, 0, 20);

        assert_eq!(r.name(), "r1");
        assert_eq!(r.sample_id(), 7);
        assert_eq!(r.variant_count(), 2);
        assert_eq!(r.first_position(), Some(100));
        assert_eq!(r.last_position(), Some(200));
        assert_eq!(r.variant(1).allele, 0);
        assert_eq!(r.id(), None);
    }

    #[test]
    fn test_phased_variant_quality() {
        let mut r = Read::new("super", None, 0);
        r.add_phased_variant(100, 2, vec![10, 10, 0, 10]);
        assert_eq!(r.variant(0).quality, 0);
        assert_eq!(r.variant(0).allele_qualities, vec![10, 10, 0, 10]);
    }

    #[test]
    fn test_sort_and_reassign() {
        let mut rs = ReadSet::new();
        rs.add(read_at("b", &[300, 400]));
        rs.add(read_at("a", &[100, 200]));
        rs.add(read_at("c", &[100, 300]));

        let perm = rs.sort_by_start();
        // "a" and "c" tie on start 100 and order by name
        assert_eq!(perm, vec![1, 2, 0]);
        assert_eq!(rs.get(0).name(), "a");
        assert_eq!(rs.get(1).name(), "c");
        assert_eq!(rs.get(2).name(), "b");

        rs.reassign_ids();
        assert_eq!(rs.get(0).id(), Some(0));
        assert_eq!(rs.get(2).id(), Some(2));
    }
}
