//! On-demand rate lookup for savings estimates
//!
//! A missing rate degrades the estimate to unknown; it never fails a
//! recommendation.

use std::collections::HashMap;

/// Billing convention for monthly projections
pub const HOURS_PER_MONTH: f64 = 730.0;

/// Instance size ladder within a family, smallest first
const SIZE_LADDER: &[&str] = &[
    "nano", "micro", "small", "medium", "large", "xlarge", "2xlarge", "4xlarge", "8xlarge",
    "12xlarge", "16xlarge", "24xlarge",
];

/// Static on-demand price table
pub struct RateBook {
    instance_hourly: HashMap<String, f64>,
    volume_gb_month: f64,
    snapshot_gb_month: f64,
    address_idle_monthly: f64,
}

impl RateBook {
    /// us-east-1 list prices for the common general-purpose families
    pub fn builtin() -> Self {
        let instance_hourly = [
            ("t3.nano", 0.0052),
            ("t3.micro", 0.0104),
            ("t3.small", 0.0208),
            ("t3.medium", 0.0416),
            ("t3.large", 0.0832),
            ("t3.xlarge", 0.1664),
            ("t3.2xlarge", 0.3328),
            ("m5.large", 0.096),
            ("m5.xlarge", 0.192),
            ("m5.2xlarge", 0.384),
            ("m5.4xlarge", 0.768),
            ("c5.large", 0.085),
            ("c5.xlarge", 0.17),
            ("c5.2xlarge", 0.34),
        ]
        .iter()
        .map(|(t, r)| (t.to_string(), *r))
        .collect();

        Self {
            instance_hourly,
            volume_gb_month: 0.08,
            snapshot_gb_month: 0.05,
            address_idle_monthly: 3.65,
        }
    }

    pub fn hourly_rate(&self, instance_type: &str) -> Option<f64> {
        self.instance_hourly.get(instance_type).copied()
    }

    /// Monthly on-demand cost for an instance type
    pub fn instance_monthly(&self, instance_type: &str) -> Option<f64> {
        self.hourly_rate(instance_type).map(|r| r * HOURS_PER_MONTH)
    }

    pub fn volume_monthly(&self, size_gb: u32) -> f64 {
        f64::from(size_gb) * self.volume_gb_month
    }

    pub fn snapshot_monthly(&self, size_gb: u32) -> f64 {
        f64::from(size_gb) * self.snapshot_gb_month
    }

    pub fn address_monthly(&self) -> f64 {
        self.address_idle_monthly
    }

    /// Next smaller size in the same family, e.g. m5.xlarge -> m5.large.
    /// Returns None at the bottom of the ladder or for unparseable types.
    pub fn next_smaller(instance_type: &str) -> Option<String> {
        let (family, size) = instance_type.split_once('.')?;
        let index = SIZE_LADDER.iter().position(|s| *s == size)?;
        if index == 0 {
            return None;
        }
        Some(format!("{}.{}", family, SIZE_LADDER[index - 1]))
    }
}

impl Default for RateBook {
    fn default() -> Self {
        Self::builtin()
    }
}
