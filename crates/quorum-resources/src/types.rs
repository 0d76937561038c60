//! Resource data model.
//!
//! A [`Resource`] is a named quantity offered by the cluster resource
//! manager: either a scalar (`cpus`, `mem`, `disk`) or a set of inclusive
//! integer ranges (`ports`). Reservation metadata ties a resource to a
//! role and principal; disk resources may additionally describe a
//! persistent volume.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Name of the CPU scalar resource.
pub const CPUS: &str = "cpus";
/// Name of the memory scalar resource (MB).
pub const MEM: &str = "mem";
/// Name of the disk scalar resource (MB).
pub const DISK: &str = "disk";
/// Name of the port range resource.
pub const PORTS: &str = "ports";

/// An inclusive `[begin, end]` interval of integer values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ValueRange {
    pub begin: u64,
    pub end: u64,
}

impl ValueRange {
    pub fn new(begin: u64, end: u64) -> Self {
        Self { begin, end }
    }

    /// Number of discrete values covered by this range.
    pub fn len(&self) -> u64 {
        if self.end < self.begin {
            0
        } else {
            (self.end - self.begin).saturating_add(1)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// The quantity carried by a resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ResourceValue {
    Scalar(f64),
    Ranges(Vec<ValueRange>),
}

/// Reservation metadata. Presence alone marks a resource as reserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReservationInfo {
    /// Identity on whose behalf the reservation was made.
    pub principal: Option<String>,
}

/// Access mode of a mounted volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VolumeMode {
    ReadWrite,
    ReadOnly,
}

/// Persistent volume description attached to a reserved disk resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiskInfo {
    /// Stable identifier that survives task relaunch.
    pub persistence_id: String,
    /// Mount point inside the task's container.
    pub container_path: String,
    pub mode: VolumeMode,
}

/// A named resource, optionally reserved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Resource {
    pub name: String,
    pub value: ResourceValue,
    pub role: Option<String>,
    pub reservation: Option<ReservationInfo>,
    pub disk: Option<DiskInfo>,
}

impl Resource {
    /// An unreserved scalar resource.
    pub fn scalar(name: &str, value: f64) -> Self {
        Self {
            name: name.to_string(),
            value: ResourceValue::Scalar(value),
            role: None,
            reservation: None,
            disk: None,
        }
    }

    /// An unreserved range resource.
    pub fn ranges(name: &str, ranges: Vec<ValueRange>) -> Self {
        Self {
            name: name.to_string(),
            value: ResourceValue::Ranges(ranges),
            role: None,
            reservation: None,
            disk: None,
        }
    }

    /// Scalar value, or `None` for range resources.
    pub fn scalar_value(&self) -> Option<f64> {
        match self.value {
            ResourceValue::Scalar(v) => Some(v),
            ResourceValue::Ranges(_) => None,
        }
    }

    /// Range list, or an empty slice for scalar resources.
    pub fn range_values(&self) -> &[ValueRange] {
        match &self.value {
            ResourceValue::Ranges(r) => r,
            ResourceValue::Scalar(_) => &[],
        }
    }

    /// True when the resource carries no quantity (zero scalar or no ranges).
    pub fn is_empty(&self) -> bool {
        match &self.value {
            ResourceValue::Scalar(v) => *v == 0.0,
            ResourceValue::Ranges(r) => r.iter().all(ValueRange::is_empty),
        }
    }

    pub fn role(&self) -> &str {
        self.role.as_deref().unwrap_or_default()
    }

    pub fn principal(&self) -> &str {
        self.reservation
            .as_ref()
            .and_then(|r| r.principal.as_deref())
            .unwrap_or_default()
    }
}

/// Display helper that summarizes the scalar resources of a list.
///
/// Reserved entries are prefixed `R(`, unreserved entries `U(`; range
/// resources are skipped: `[U(cpus:2), R(disk:100), ]`.
pub struct ScalarSummary<'a>(pub &'a [Resource]);

impl fmt::Display for ScalarSummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for resource in self.0 {
            if let Some(value) = resource.scalar_value() {
                let marker = if resource.reservation.is_some() { "R" } else { "U" };
                write!(f, "{marker}({}:{value}), ", resource.name)?;
            }
        }
        f.write_str("]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_length_is_inclusive() {
        assert_eq!(ValueRange::new(31000, 31000).len(), 1);
        assert_eq!(ValueRange::new(31000, 31009).len(), 10);
        assert!(ValueRange::new(5, 4).is_empty());
    }

    #[test]
    fn full_range_length_saturates() {
        assert_eq!(ValueRange::new(0, u64::MAX).len(), u64::MAX);
        assert!(!ValueRange::new(0, u64::MAX).is_empty());
    }

    #[test]
    fn scalar_summary_marks_reservations() {
        let mut reserved = Resource::scalar(DISK, 100.0);
        reserved.reservation = Some(ReservationInfo::default());
        let resources = vec![
            Resource::scalar(CPUS, 2.0),
            Resource::ranges(PORTS, vec![ValueRange::new(1, 2)]),
            reserved,
        ];

        assert_eq!(
            ScalarSummary(&resources).to_string(),
            "[U(cpus:2), R(disk:100), ]"
        );
    }

    #[test]
    fn empty_placeholders() {
        assert!(Resource::ranges(PORTS, vec![]).is_empty());
        assert!(!Resource::ranges(PORTS, vec![ValueRange::new(1, 1)]).is_empty());
        assert!(Resource::scalar(CPUS, 0.0).is_empty());
    }
}
