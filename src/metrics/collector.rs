// Copyright 2025 Vivian Voss. Licensed under the Apache License, Version 2.0.
// SPDX-License-Identifier: Apache-2.0

//! Global metrics collector.
//!
//! Process-wide singleton buffering metric samples in memory. Recording is
//! O(1); the embedding application drains the buffer with
//! [`MetricsCollector::snapshot`] and [`MetricsCollector::clear`].

use crate::metrics::Metric;
use once_cell::sync::Lazy;
use std::sync::RwLock;

static GLOBAL: Lazy<MetricsCollector> = Lazy::new(MetricsCollector::new);

/// In-memory metric buffer.
#[derive(Debug)]
pub struct MetricsCollector {
    buffer: RwLock<Vec<Metric>>,
}

impl MetricsCollector {
    fn new() -> Self {
        Self {
            buffer: RwLock::new(Vec::new()),
        }
    }

    /// Process-wide collector instance.
    pub fn global() -> &'static MetricsCollector {
        &GLOBAL
    }

    /// Record one sample.
    pub fn record(&self, metric: Metric) {
        let mut buffer = self.buffer.write().unwrap();
        buffer.push(metric);
    }

    /// Record several samples at once.
    pub fn record_batch(&self, metrics: Vec<Metric>) {
        let mut buffer = self.buffer.write().unwrap();
        buffer.extend(metrics);
    }

    /// Copy of every buffered sample.
    pub fn snapshot(&self) -> Vec<Metric> {
        self.buffer.read().unwrap().clone()
    }

    /// Number of buffered samples.
    pub fn buffer_size(&self) -> usize {
        self.buffer.read().unwrap().len()
    }

    /// Drop every buffered sample.
    pub fn clear(&self) {
        self.buffer.write().unwrap().clear();
    }
}
