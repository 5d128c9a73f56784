//! Fixed-capacity record pools with slot reuse tracking.

/// Occupancy of a thread or process pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Slots the pool may hand out, after the configured limit
    pub capacity: usize,
    /// Records currently allocated
    pub live: usize,
    /// Most records ever allocated at once
    pub peak: usize,
}

impl PoolStats {
    const fn new(capacity: usize) -> Self {
        Self {
            capacity,
            live: 0,
            peak: 0,
        }
    }

    fn claimed(&mut self) {
        self.live += 1;
        self.peak = self.peak.max(self.live);
    }

    fn released(&mut self) {
        self.live = self.live.saturating_sub(1);
    }

    /// True when the next create must fail
    pub const fn is_exhausted(&self) -> bool {
        self.live >= self.capacity
    }

    /// Slots never touched so far; zero means the configured limit was hit.
    pub const fn headroom(&self) -> usize {
        self.capacity - self.peak
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for PoolStats {
    fn format(&self, fmt: defmt::Formatter) {
        defmt::write!(
            fmt,
            "{}/{} live, peak {}",
            self.live,
            self.capacity,
            self.peak
        );
    }
}

/// Arena of `N` records addressed by slot index.
///
/// Records stay in place when released; only the in-use flag changes, so a
/// released record can still be read until the slot is claimed again.
pub struct Pool<T, const N: usize> {
    records: [T; N],
    in_use: [bool; N],
    limit: usize,
    stats: PoolStats,
}

impl<T: Default, const N: usize> Pool<T, N> {
    /// Create a pool that hands out at most `limit` slots
    pub fn new(limit: usize) -> Self {
        let limit = limit.min(N);
        Self {
            records: core::array::from_fn(|_| T::default()),
            in_use: [false; N],
            limit,
            stats: PoolStats::new(limit),
        }
    }

    /// Claim the lowest free slot, resetting its record.
    ///
    /// `skip` names a slot that must not be handed out even if free.
    pub fn claim(&mut self, skip: Option<usize>) -> Option<usize> {
        let index = (0..self.limit).find(|&i| !self.in_use[i] && Some(i) != skip)?;
        self.in_use[index] = true;
        self.records[index] = T::default();
        self.stats.claimed();
        Some(index)
    }
}

impl<T, const N: usize> Pool<T, N> {
    /// Return a slot to the pool; false if it was not held
    pub fn release(&mut self, index: usize) -> bool {
        match self.in_use.get_mut(index) {
            Some(flag) if *flag => {
                *flag = false;
                self.stats.released();
                true
            }
            _ => false,
        }
    }

    /// True while the slot is held
    pub fn is_live(&self, index: usize) -> bool {
        self.in_use.get(index).copied().unwrap_or(false)
    }

    /// Record of a held slot
    pub fn get(&self, index: usize) -> Option<&T> {
        if self.is_live(index) {
            self.records.get(index)
        } else {
            None
        }
    }

    /// Mutable record of a held slot
    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        if self.is_live(index) {
            self.records.get_mut(index)
        } else {
            None
        }
    }

    /// Record of any slot, held or not
    pub(crate) fn slot(&self, index: usize) -> &T {
        &self.records[index]
    }

    /// Mutable record of any slot, held or not
    pub(crate) fn slot_mut(&mut self, index: usize) -> &mut T {
        &mut self.records[index]
    }

    /// Iterate over held slots in index order
    pub fn live(&self) -> impl Iterator<Item = (usize, &T)> + '_ {
        self.records
            .iter()
            .enumerate()
            .filter(move |(i, _)| self.in_use[*i])
    }

    /// Number of held slots
    pub fn live_count(&self) -> usize {
        self.stats.live
    }

    /// Number of usable slots
    pub fn capacity(&self) -> usize {
        self.limit
    }

    /// Usage statistics
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}
