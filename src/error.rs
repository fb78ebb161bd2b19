use core::alloc::Layout;
use core::fmt;

/// The error returned by `try_reserve` and friends.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum TryReserveError {
    /// The requested capacity exceeds what the table can address.
    CapacityOverflow,

    /// The allocator returned an error.
    AllocError {
        /// The layout of the allocation request that failed.
        layout: Layout,
    },
}

impl fmt::Display for TryReserveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TryReserveError::CapacityOverflow => {
                f.write_str("capacity overflow while reserving hash table storage")
            }
            TryReserveError::AllocError { layout } => write!(
                f,
                "memory allocation of {} bytes (align {}) failed",
                layout.size(),
                layout.align()
            ),
        }
    }
}

impl core::error::Error for TryReserveError {}

/// Whether a failed allocation is reported or aborts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Fallibility {
    Fallible,
    Infallible,
}

impl Fallibility {
    #[cold]
    #[inline(never)]
    pub(crate) fn capacity_overflow(self) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::CapacityOverflow,
            Fallibility::Infallible => panic!("Hash table capacity overflow"),
        }
    }

    #[cold]
    #[inline(never)]
    pub(crate) fn alloc_err(self, layout: Layout) -> TryReserveError {
        match self {
            Fallibility::Fallible => TryReserveError::AllocError { layout },
            Fallibility::Infallible => alloc::alloc::handle_alloc_error(layout),
        }
    }
}

#[cfg(test)]
mod tests {
    use alloc::string::ToString;

    use super::*;

    #[test]
    fn fallible_reports() {
        assert_eq!(
            Fallibility::Fallible.capacity_overflow(),
            TryReserveError::CapacityOverflow
        );
        let layout = Layout::new::<u64>();
        assert_eq!(
            Fallibility::Fallible.alloc_err(layout),
            TryReserveError::AllocError { layout }
        );
        assert!(
            TryReserveError::CapacityOverflow
                .to_string()
                .contains("capacity overflow")
        );
    }

    #[test]
    #[should_panic(expected = "capacity overflow")]
    fn infallible_panics() {
        let _ = Fallibility::Infallible.capacity_overflow();
    }
}
