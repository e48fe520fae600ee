//! Heap measurement for benchmark workloads, backed by dhat.
//!
//! Only active with the `memory_profiling` feature; otherwise every measurement is empty. The
//! benchmark binary must install `dhat::Alloc` as its global allocator for the numbers to mean
//! anything. View the generated `dhat-heap.json` at
//! <https://nnethercote.github.io/dh_view/dh_view.html>.

/// Heap usage captured over one measured closure.
#[derive(Debug, Clone, Default)]
pub struct MemoryStats {
    pub bytes_allocated: u64,
    pub allocation_count: u64,
    pub peak_bytes: u64,
}

impl MemoryStats {
    /// Bytes allocated per operation, e.g. per registered listener.
    pub fn bytes_per_op(&self, ops: usize) -> f64 {
        if ops == 0 {
            0.0
        } else {
            self.bytes_allocated as f64 / ops as f64
        }
    }

    /// Allocations per operation. A sorted-list insert should cost exactly one.
    pub fn allocations_per_op(&self, ops: usize) -> f64 {
        if ops == 0 {
            0.0
        } else {
            self.allocation_count as f64 / ops as f64
        }
    }
}

impl std::fmt::Display for MemoryStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "allocated: {} bytes ({} allocs), peak: {} bytes",
            self.bytes_allocated, self.allocation_count, self.peak_bytes
        )
    }
}

#[cfg(feature = "memory_profiling")]
pub struct MemoryProfiler {
    _profiler: dhat::Profiler,
}

#[cfg(feature = "memory_profiling")]
impl MemoryProfiler {
    /// Start profiling. Only one profiler may be active at a time.
    pub fn start() -> Self {
        Self {
            _profiler: dhat::Profiler::new_heap(),
        }
    }

    /// Stop profiling, writing `dhat-heap.json`.
    pub fn finish(self) -> MemoryStats {
        let stats = dhat::HeapStats::get();
        MemoryStats {
            bytes_allocated: stats.total_bytes,
            allocation_count: stats.total_blocks,
            peak_bytes: stats.max_bytes as u64,
        }
    }
}

#[cfg(not(feature = "memory_profiling"))]
pub struct MemoryProfiler;

#[cfg(not(feature = "memory_profiling"))]
impl MemoryProfiler {
    pub fn start() -> Self {
        Self
    }

    pub fn finish(self) -> MemoryStats {
        MemoryStats::default()
    }
}

/// Run `f` and report the heap activity it caused.
pub fn measure_memory<F, R>(f: F) -> (R, MemoryStats)
where
    F: FnOnce() -> R,
{
    let profiler = MemoryProfiler::start();
    let result = f();
    let stats = profiler.finish();
    (result, stats)
}
