//! Workload-cost estimation for routed requests
//!
//! The routing layer schedules against a numeric workload estimate per
//! request. A route declares how the estimate is derived from the payload.

use serde::{Deserialize, Serialize};

/// Workload-cost function attached to a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadCost {
    /// Every request counts the same fixed amount
    Constant(f64),

    /// Cost read from a numeric payload field, falling back to a default
    /// when the field is absent or not a number
    PayloadField {
        /// Payload field to read
        field: String,
        /// Cost used when the field cannot be read
        default: f64,
    },
}

impl WorkloadCost {
    /// Estimate the workload cost of a request payload
    pub fn estimate(&self, payload: &serde_json::Value) -> f64 {
        match self {
            WorkloadCost::Constant(cost) => *cost,
            WorkloadCost::PayloadField { field, default } => payload
                .get(field)
                .and_then(|v| v.as_f64())
                .unwrap_or(*default),
        }
    }
}

impl Default for WorkloadCost {
    fn default() -> Self {
        WorkloadCost::Constant(1.0)
    }
}
