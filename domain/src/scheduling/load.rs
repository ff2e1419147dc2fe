//! Live load snapshot of a single resource

use crate::scheduling::resource::ResourceId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Smoothing factor for the rolling average wait time
const WAIT_SMOOTHING: f64 = 0.2;

/// Load of one resource
///
/// `current_load` is the sum of units held by outstanding reservations,
/// whatever their time window. `utilization` is always
/// `current_load / capacity`, recomputed on every mutation, so it can exceed
/// 1.0 when non-overlapping bookings stack up. A resource with zero capacity
/// reports full utilization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLoad {
    pub resource_id: ResourceId,
    pub current_load: f64,
    pub capacity: u32,
    pub utilization: f64,
    pub queue_length: usize,
    pub avg_wait_minutes: f64,
    pub updated_at: DateTime<Utc>,
}

impl ResourceLoad {
    pub fn new(resource_id: ResourceId, capacity: u32) -> Self {
        let mut load = Self {
            resource_id,
            current_load: 0.0,
            capacity,
            utilization: 0.0,
            queue_length: 0,
            avg_wait_minutes: 0.0,
            updated_at: Utc::now(),
        };
        load.recompute();
        load
    }

    /// Add reserved units
    pub fn add(&mut self, units: f64) {
        self.current_load += units;
        self.queue_length += 1;
        self.recompute();
    }

    /// Remove released units; load never drops below zero
    pub fn remove(&mut self, units: f64) {
        self.current_load = (self.current_load - units).max(0.0);
        self.queue_length = self.queue_length.saturating_sub(1);
        self.recompute();
    }

    pub fn set_capacity(&mut self, capacity: u32) {
        self.capacity = capacity;
        self.recompute();
    }

    /// Fold an observed wait into the rolling average
    pub fn record_wait(&mut self, minutes: f64) {
        if !minutes.is_finite() || minutes < 0.0 {
            return;
        }
        self.avg_wait_minutes = if self.avg_wait_minutes == 0.0 {
            minutes
        } else {
            WAIT_SMOOTHING * minutes + (1.0 - WAIT_SMOOTHING) * self.avg_wait_minutes
        };
        self.updated_at = Utc::now();
    }

    fn recompute(&mut self) {
        if self.current_load < 0.0 || !self.current_load.is_finite() {
            self.current_load = 0.0;
        }
        self.utilization = if self.capacity == 0 {
            1.0
        } else {
            self.current_load / f64::from(self.capacity)
        };
        self.updated_at = Utc::now();
    }
}
