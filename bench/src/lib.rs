//! Benchmark utilities for hostlink.
//!
//! - **Entity benchmarks**: alloc/free churn below and above the reuse threshold
//! - **Event benchmarks**: sorted-list insertion, listener registration and dispatch, contended
//! - **Memory tracking**: Heap allocation profiling via dhat
//!
//! # Running Benchmarks
//!
//! ```bash
//! # Run all benchmarks
//! cargo bench -p hostlink_bench
//!
//! # Run specific benchmark group
//! cargo bench -p hostlink_bench -- churn
//!
//! # Run with memory profiling (slower)
//! cargo bench -p hostlink_bench --features memory_profiling
//! ```
//!
//! Results are written to `target/criterion/` with HTML reports for visualization.

pub mod memory;
pub mod workload;
