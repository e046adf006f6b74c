//! Metrics log line format
//!
//! ```json
//! {"timestamp": "2024-01-07T00:00:00Z",
//!  "metrics": [{"instance_id": "i-1", "stats": {"CPUUtilization": 12.5, "NetworkIn": null}}]}
//! ```
//!
//! A missing data point is stored as `null`, never omitted, so every record
//! has the same shape.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Everything collected in one tick
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    /// End of the collection window (always UTC)
    pub timestamp: DateTime<Utc>,

    /// One entry per configured instance, in configuration order
    pub metrics: Vec<InstanceMetrics>,
}

/// Stats of one instance within a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InstanceMetrics {
    pub instance_id: String,

    /// stat name → 5-minute average, `None` when no data point was available
    pub stats: BTreeMap<String, Option<f64>>,
}

impl MetricRecord {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            metrics: Vec::new(),
        }
    }

    /// First instance entry; the weekly digest only looks at this one.
    pub fn first_instance(&self) -> Option<&InstanceMetrics> {
        self.metrics.first()
    }

    pub fn instance(&self, instance_id: &str) -> Option<&InstanceMetrics> {
        self.metrics
            .iter()
            .find(|entry| entry.instance_id == instance_id)
    }
}

impl InstanceMetrics {
    pub fn new(instance_id: impl Into<String>) -> Self {
        Self {
            instance_id: instance_id.into(),
            stats: BTreeMap::new(),
        }
    }

    /// Recorded value of `stat`; absent and unknown stats both yield `None`.
    pub fn value(&self, stat: &str) -> Option<f64> {
        self.stats.get(stat).copied().flatten()
    }
}
