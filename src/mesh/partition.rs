//! Element-to-rank domain decomposition lookup.
//!
//! The partition is an externally supplied assignment; this core only ever
//! queries it. Exactly one rank owns each element, and a marker's owner is
//! the owner of its containing element.

#[derive(Debug, Clone)]
pub struct PartitionMap {
    owners: Vec<usize>,
    num_ranks: usize,
}

impl PartitionMap {
    /// Everything owned by rank 0 (serial runs).
    pub fn all_local(num_elements: usize) -> Self {
        Self {
            owners: vec![0; num_elements],
            num_ranks: 1,
        }
    }

    /// Contiguous block decomposition over `num_ranks` ranks.
    pub fn uniform(num_elements: usize, num_ranks: usize) -> Self {
        assert!(num_ranks > 0, "need at least one rank");
        let chunk = num_elements.div_ceil(num_ranks);
        let owners = (0..num_elements)
            .map(|e| (e / chunk.max(1)).min(num_ranks - 1))
            .collect();
        Self { owners, num_ranks }
    }

    /// Explicit per-element owner list.
    pub fn from_owners(owners: Vec<usize>, num_ranks: usize) -> Self {
        debug_assert!(owners.iter().all(|&r| r < num_ranks));
        Self { owners, num_ranks }
    }

    /// The rank owning `elem`.
    pub fn owner(&self, elem: usize) -> usize {
        self.owners[elem]
    }

    pub fn num_ranks(&self) -> usize {
        self.num_ranks
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}
