// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Lightweight performance metrics.
//!
//! Engine operations record duration and volume samples into a global
//! in-memory collector; embedding applications drain it at their own pace.
//!
//! ## Quick Start
//!
//! ```rust
//! use rowbase::metrics::{Metric, MetricUnit, MetricsCollector};
//!
//! let metric = Metric::new("compact_duration", 1250.0, MetricUnit::Microseconds)
//!     .with_tag("table", "users");
//! MetricsCollector::global().record(metric);
//!
//! let samples = MetricsCollector::global().snapshot();
//! assert!(!samples.is_empty());
//! # MetricsCollector::global().clear();
//! ```
//!
//! ## Thread Safety
//!
//! The collector guards its buffer with an `RwLock`; recording from multiple
//! threads is safe even though the engine itself is single-threaded.

mod collector;


// Re-export public API
pub use collector::MetricsCollector;

/// Unit a metric value is expressed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricUnit {
    /// Elapsed time in microseconds.
    Microseconds,

    /// Size in bytes.
    Bytes,

    /// Plain count.
    Count,
}

impl std::fmt::Display for MetricUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MetricUnit::Microseconds => write!(f, "μs"),
            MetricUnit::Bytes => write!(f, "B"),
            MetricUnit::Count => write!(f, "n"),
        }
    }
}

/// One recorded measurement.
#[derive(Debug, Clone, PartialEq)]
pub struct Metric {
    /// Metric name, e.g. `compact_duration`.
    pub name: String,

    /// Sample value in `unit`.
    pub value: f64,

    /// Unit of `value`.
    pub unit: MetricUnit,

    /// Free-form key/value tags, e.g. `("operation", "insert")`.
    pub tags: Vec<(String, String)>,
}

impl Metric {
    /// Create a metric sample.
    pub fn new(name: &str, value: f64, unit: MetricUnit) -> Self {
        Self {
            name: name.to_string(),
            value,
            unit,
            tags: Vec::new(),
        }
    }

    /// Attach a tag, returning the metric for chaining.
    pub fn with_tag(mut self, key: &str, value: &str) -> Self {
        self.tags.push((key.to_string(), value.to_string()));
        self
    }
}
