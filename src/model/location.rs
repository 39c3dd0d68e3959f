//! Geographic points with a human-readable address.

use serde::{Deserialize, Serialize};

/// A pickup or delivery point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub lat: f64,
    pub lng: f64,
    pub address: String,
}

impl Location {
    /// Checks coordinate ranges and that the address is not blank.
    ///
    /// Returns a description of the first problem found.
    pub fn validate(&self) -> Result<(), String> {
        if !self.lat.is_finite() || !(-90.0..=90.0).contains(&self.lat) {
            return Err(format!("latitude {} is outside [-90, 90]", self.lat));
        }
        if !self.lng.is_finite() || !(-180.0..=180.0).contains(&self.lng) {
            return Err(format!("longitude {} is outside [-180, 180]", self.lng));
        }
        if self.address.trim().is_empty() {
            return Err("address is empty".to_string());
        }
        Ok(())
    }
}
