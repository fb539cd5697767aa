//! # Column Streaming
//!
//! Streams a [`ReadSet`] by variant position: for every column (variant
//! site) the iterator yields the [`Entry`]s of the reads covering that
//! site, in increasing read-id order. Reads enter the active window when
//! the sweep reaches their first call and leave once their last call has
//! been consumed, so a full pass is linear in the total number of calls.

use crate::data::read::{Entry, ReadSet};

/// Position-ordered sweep over the columns of a read set.
///
/// Requires the read set to be sorted by start position; the dense read
/// ids assigned by [`ReadSet::reassign_ids`] then agree with the sweep
/// order and every yielded column lists its entries by increasing read id.
pub struct ReadColumnIterator<'a> {
    read_set: &'a ReadSet,
    positions: &'a [u32],
    /// Next column to yield
    column: usize,
    /// Per read, the index of the next unconsumed variant call
    cursors: Vec<usize>,
    /// First read that has not entered the active window yet
    next_read: usize,
    /// Reads inside the active window, in id order
    active: Vec<usize>,
}

impl<'a> ReadColumnIterator<'a> {
    /// Create an iterator positioned at the first column.
    pub fn new(read_set: &'a ReadSet, positions: &'a [u32]) -> Self {
        let mut iter = Self {
            read_set,
            positions,
            column: 0,
            cursors: vec![0; read_set.len()],
            next_read: 0,
            active: Vec::new(),
        };
        iter.jump_to_column(0);
        iter
    }

    /// Number of columns
    pub fn column_count(&self) -> usize {
        self.positions.len()
    }

    /// The column positions
    pub fn positions(&self) -> &[u32] {
        self.positions
    }

    /// Whether another column remains
    pub fn has_next(&self) -> bool {
        self.column < self.positions.len()
    }

    /// Reposition the sweep so the next yielded column is `column`.
    pub fn jump_to_column(&mut self, column: usize) {
        self.column = column;
        let n = self.read_set.len();
        if column >= self.positions.len() {
            self.cursors = self.read_set.iter().map(|r| r.variant_count()).collect();
            self.next_read = n;
            self.active.clear();
            return;
        }
        let pos = self.positions[column];
        self.cursors.clear();
        for read in self.read_set.iter() {
            let cursor = read.variants().partition_point(|v| v.position < pos);
            self.cursors.push(cursor);
        }
        // reads are sorted by first position (None first), so admission is a prefix
        self.next_read = (0..n)
            .position(|r| {
                self.read_set
                    .get(r)
                    .first_position()
                    .map_or(false, |p| p > pos)
            })
            .unwrap_or(n);
        let cursors = &self.cursors;
        let read_set = self.read_set;
        self.active = (0..self.next_read)
            .filter(|&r| cursors[r] < read_set.get(r).variant_count())
            .collect();
    }

    /// Yield the next column's entries, or `None` past the last column.
    pub fn next_column(&mut self) -> Option<Vec<Entry>> {
        if self.column >= self.positions.len() {
            return None;
        }
        let pos = self.positions[self.column];

        // admit reads whose first call has been reached
        while self.next_read < self.read_set.len() {
            let read = self.read_set.get(self.next_read);
            match read.first_position() {
                Some(p) if p > pos => break,
                Some(_) => {
                    self.active.push(self.next_read);
                    self.next_read += 1;
                }
                None => {
                    self.next_read += 1;
                }
            }
        }

        let mut entries = Vec::new();
        for &r in &self.active {
            let read = self.read_set.get(r);
            let mut cursor = self.cursors[r];
            while cursor < read.variant_count() && read.variant(cursor).position < pos {
                cursor += 1;
            }
            if cursor < read.variant_count() && read.variant(cursor).position == pos {
                let call = read.variant(cursor);
                entries.push(Entry {
                    read_id: read.id().unwrap_or(r as u32),
                    allele: call.allele,
                    quality: call.quality,
                });
                cursor += 1;
            }
            self.cursors[r] = cursor;
        }

        let cursors = &self.cursors;
        let read_set = self.read_set;
        self.active
            .retain(|&r| cursors[r] < read_set.get(r).variant_count());

        self.column += 1;
        Some(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::read::Read;

    fn build_read_set() -> (ReadSet, Vec<u32>) {
        let positions = vec![100, 200, 300];
        let mut rs = ReadSet::new();

        let mut r0 = Read::new("a", Some(60), 0);
        r0.add_variant(100, 0, 10);
        r0.add_variant(200, 1, 20);
        rs.add(r0);

        let mut r1 = Read::new("b", Some(60), 0);
        r1.add_variant(200, 0, 30);
        r1.add_variant(300, 1, 40);
        rs.add(r1);

        let mut r2 = Read::new("c", Some(60), 0);
        r2.add_variant(300, 0, 50);
        rs.add(r2);

        rs.sort_by_start();
        rs.reassign_ids();
        (rs, positions)
    }

    #[test]
    fn test_streaming_pass() {
        let (rs, positions) = build_read_set();
        let mut iter = ReadColumnIterator::new(&rs, &positions);
        assert_eq!(iter.column_count(), 3);

        let c0 = iter.next_column().unwrap();
        assert_eq!(c0.len(), 1);
        assert_eq!((c0[0].read_id, c0[0].allele), (0, 0));

        let c1 = iter.next_column().unwrap();
        assert_eq!(c1.len(), 2);
        assert_eq!((c1[0].read_id, c1[1].read_id), (0, 1));

        let c2 = iter.next_column().unwrap();
        assert_eq!(c2.len(), 2);
        assert_eq!((c2[0].read_id, c2[1].read_id), (1, 2));

        assert!(!iter.has_next());
        assert_eq!(iter.next_column(), None);
    }

    #[test]
    fn test_jump_matches_sequential() {
        let (rs, positions) = build_read_set();
        let mut sequential = ReadColumnIterator::new(&rs, &positions);
        sequential.next_column();
        let expected = sequential.next_column().unwrap();

        let mut jumped = ReadColumnIterator::new(&rs, &positions);
        jumped.jump_to_column(1);
        assert_eq!(jumped.next_column().unwrap(), expected);
    }

    #[test]
    fn test_jump_past_end() {
        let (rs, positions) = build_read_set();
        let mut iter = ReadColumnIterator::new(&rs, &positions);
        iter.jump_to_column(3);
        assert!(!iter.has_next());
        assert_eq!(iter.next_column(), None);
    }

    #[test]
    fn test_gap_in_read_coverage() {
        // a read covering columns 0 and 2 but not 1 is inactive in between
        let positions = vec![100, 200, 300];
        let mut rs = ReadSet::new();
        let mut r = Read::new("gapped", None, 0);
        r.add_variant(100, 1, 5);
        r.add_variant(300, 1, 5);
        rs.add(r);
        rs.reassign_ids();

        let mut iter = ReadColumnIterator::new(&rs, &positions);
        assert_eq!(iter.next_column().unwrap().len(), 1);
        assert_eq!(iter.next_column().unwrap().len(), 0);
        assert_eq!(iter.next_column().unwrap().len(), 1);
    }
}
