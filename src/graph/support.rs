//! Read-support annotations carried by graph edges.
//!
//! Each tag names one read and the role the edge plays in that read's walk
//! through the graph. Read ids are bounded by `u32`.

use smallvec::SmallVec;

/// Sequential identity of a threaded read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ReadId(pub u32);

impl nohash_hasher::IsEnabled for ReadId {}

/// Set of reads keyed without hashing (ids are already dense integers).
pub type ReadSet = std::collections::HashSet<ReadId, nohash_hasher::BuildNoHashHasher<ReadId>>;

/// Where an edge sits in a read's path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReadRole {
    /// First transition of the read's path.
    Start,
    /// Interior transition.
    Pass,
    /// Last transition of the read's path.
    End,
}

impl ReadRole {
    /// Role of the same transition seen from the opposite strand.
    #[inline]
    pub fn mirrored(self) -> Self {
        match self {
            Self::Start => Self::End,
            Self::Pass => Self::Pass,
            Self::End => Self::Start,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadTag {
    pub read: ReadId,
    pub role: ReadRole,
}

/// Deduplicated tag list of one edge, grouped by read in ascending id order.
///
/// Reads are threaded in id order, so new tags almost always land at the
/// tail and a duplicate check only looks at the tags of one read.
#[derive(Debug, Clone, Default)]
pub struct ReadSupport {
    tags: SmallVec<[ReadTag; 4]>,
}

impl ReadSupport {
    /// Add a tag; returns `false` if it was already present.
    pub fn add(&mut self, read: ReadId, role: ReadRole) -> bool {
        let first = self.tags.partition_point(|t| t.read < read);
        let run = self.tags[first..]
            .iter()
            .take_while(|t| t.read == read)
            .count();
        if self.tags[first..first + run].iter().any(|t| t.role == role) {
            return false;
        }
        self.tags.insert(first + run, ReadTag { read, role });
        true
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn tags(&self) -> &[ReadTag] {
        &self.tags
    }

    /// Reads tagged with `role`.
    pub fn reads_with(&self, role: ReadRole) -> impl Iterator<Item = ReadId> + '_ {
        self.tags
            .iter()
            .filter(move |t| t.role == role)
            .map(|t| t.read)
    }

    /// Active reads that carry on through this edge (`Pass` or `End`).
    pub fn continuing<'a>(&'a self, active: &'a ReadSet) -> impl Iterator<Item = ReadId> + 'a {
        self.tags
            .iter()
            .filter(|t| t.role != ReadRole::Start && active.contains(&t.read))
            .map(|t| t.read)
    }

    /// Number of distinct active reads carrying on through this edge.
    pub fn continuing_count(&self, active: &ReadSet) -> usize {
        let mut count = 0;
        let mut last = None;
        for read in self.continuing(active) {
            if last != Some(read) {
                count += 1;
                last = Some(read);
            }
        }
        count
    }

    /// Drop the `Pass` and `End` tags of the given reads. `Start` tags stay.
    pub fn retire(&mut self, reads: &ReadSet) -> usize {
        let before = self.tags.len();
        self.tags
            .retain(|t| t.role == ReadRole::Start || !reads.contains(&t.read));
        before - self.tags.len()
    }
}
