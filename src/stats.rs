use alloc::vec;
use alloc::vec::Vec;

use crate::control::ControlCell;
use crate::group::Group;
use crate::hash_table::HashTable;
use crate::layout::SlotLayout;

/// Number of elements stored at each distance from their home bucket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeHistogram {
    /// `counts[d]` is the number of elements stored `d` cells past their home
    /// bucket. Trailing zero bins are trimmed.
    pub counts: Vec<usize>,
}

impl ProbeHistogram {
    /// Total number of elements counted.
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// The largest distance of any element, or `None` for an empty table.
    pub fn max_distance(&self) -> Option<usize> {
        self.counts.len().checked_sub(1)
    }

    /// Average distance from the home bucket. A successful lookup inspects
    /// this many cells past the first one on average.
    pub fn mean_distance(&self) -> f64 {
        let total = self.total();
        if total == 0 {
            return 0.0;
        }
        let weighted: usize = self.counts.iter().enumerate().map(|(d, &c)| d * c).sum();
        weighted as f64 / total as f64
    }

    /// Pretty-prints the histogram as a horizontal bar chart.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        let max = self.counts.iter().copied().max().unwrap_or(0);
        if max == 0 {
            println!("probe histogram: empty");
            return;
        }

        let max_bar = 60usize;
        let total_units = max_bar * 8;
        println!(
            "probe histogram ({} entries, mean distance {:.3}):",
            self.total(),
            self.mean_distance()
        );

        let make_bar = |count: usize| -> alloc::string::String {
            if count == 0 {
                return alloc::string::String::new();
            }
            let units = ((count as u128 * total_units as u128).div_ceil(max as u128)) as usize;
            let mut bar = "█".repeat(units / 8);
            let partial = match units % 8 {
                0 => None,
                1 => Some('▏'),
                2 => Some('▎'),
                3 => Some('▍'),
                4 => Some('▌'),
                5 => Some('▋'),
                6 => Some('▊'),
                _ => Some('▉'),
            };
            bar.extend(partial);
            bar
        };

        for (dist, &count) in self.counts.iter().enumerate() {
            println!("{dist:>3} | {} ({count})", make_bar(count));
        }
    }
}

/// Occupancy and memory statistics of a table.
#[derive(Debug, Clone)]
pub struct DebugStats {
    /// Number of elements currently in the table
    pub populated: usize,
    /// Number of home buckets
    pub capacity: usize,
    /// Population at which the table grows
    pub max_populated: usize,
    /// Probe bound: no element sits this many cells past its home
    pub max_lookups: usize,
    /// Control cells that can hold an element
    pub probe_positions: usize,
    /// Control cells currently holding an element
    pub used_cells: usize,
    /// Control cells currently empty
    pub empty_cells: usize,
    /// Load factor (populated / capacity)
    pub load_factor: f64,
    /// Bytes of the allocation taken by control cells
    pub control_bytes: usize,
    /// Bytes of the allocation taken by element slots
    pub slot_bytes: usize,
    /// Total memory in bytes used by the table
    pub total_bytes: usize,
    /// Bytes of element slots not holding an element
    pub wasted_bytes: usize,
}

impl DebugStats {
    /// Pretty-print the debug statistics.
    #[cfg(feature = "std")]
    pub fn print(&self) {
        println!("=== Hash Table Debug Statistics ===");
        println!(
            "Population: {}/{} ({:.2}% load factor, grows at {})",
            self.populated,
            self.capacity,
            self.load_factor * 100.0,
            self.max_populated
        );
        println!(
            "Cells: {} used, {} empty of {} (probe bound {})",
            self.used_cells, self.empty_cells, self.probe_positions, self.max_lookups
        );
        println!(
            "Total Allocated: {} bytes ({} control, {} slots)",
            self.total_bytes, self.control_bytes, self.slot_bytes
        );
        println!(
            "Memory: {} bytes wasted ({:.02}%)",
            self.wasted_bytes,
            if self.total_bytes == 0 {
                0.0
            } else {
                (self.wasted_bytes as f64 / self.total_bytes as f64) * 100.0
            }
        );
    }
}

impl<T, L: SlotLayout> HashTable<T, L> {
    /// Returns a histogram of element distances from their home buckets.
    pub fn probe_histogram(&self) -> ProbeHistogram {
        let mut counts = vec![0usize; self.max_lookups()];
        for cell in self.control_cells() {
            if cell.is_used() {
                counts[cell.dist() as usize] += 1;
            }
        }
        while counts.last() == Some(&0) {
            counts.pop();
        }
        ProbeHistogram { counts }
    }

    /// Returns occupancy and memory statistics.
    pub fn debug_stats(&self) -> DebugStats {
        let probe_positions = self.control_cells().len();
        let mut used_cells = 0;
        let mut empty_cells = 0;

        let mut pos = 0;
        while pos < probe_positions {
            // SAFETY: A full group of end-of cells follows the probe
            // positions, and those match neither query.
            let group = unsafe { Group::<L::Ctrl>::load(self.ctrl_ptr().add(pos)) };
            // Cells past the probe positions are end-of sentinels.
            used_cells += Group::<L::Ctrl>::WIDTH - group.match_unused().count();
            empty_cells += group.match_empty().count();
            pos += Group::<L::Ctrl>::WIDTH;
        }

        let control_bytes = if self.capacity() == 0 {
            0
        } else {
            (probe_positions + Group::<L::Ctrl>::WIDTH) * L::Ctrl::SIZE
        };
        let slot_bytes = self.slot_len() * size_of::<T>();

        DebugStats {
            populated: self.len(),
            capacity: self.capacity(),
            max_populated: (self.capacity() as f64 * self.max_load_factor() as f64) as usize,
            max_lookups: self.max_lookups(),
            probe_positions,
            used_cells,
            empty_cells,
            load_factor: self.load_factor() as f64,
            control_bytes,
            slot_bytes,
            total_bytes: self.allocation_size(),
            wasted_bytes: (self.slot_len() - self.len()) * size_of::<T>(),
        }
    }
}
