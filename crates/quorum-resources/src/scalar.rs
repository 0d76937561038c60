//! Scalar resource fit checks and in-place debits.
//!
//! Same-named entries are never summed: a fit is satisfied by a single
//! entry holding enough, and a debit lands on the first entry only.
//! Offers that split one resource across reserved and unreserved entries
//! are therefore matched entry by entry.

use tracing::info;

use crate::types::{CPUS, DISK, MEM, Resource, ResourceValue};

/// Which scalar dimension of a request could not be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarShortfall {
    Cpus,
    Mem,
    Disk,
}

/// True if some scalar resource named `name` holds at least `amount`.
pub fn will_fit(resources: &[Resource], name: &str, amount: f64) -> bool {
    resources
        .iter()
        .filter(|r| r.name == name)
        .filter_map(Resource::scalar_value)
        .any(|value| value >= amount)
}

/// Subtract `amount` from the first scalar resource named `name`.
///
/// Later entries with the same name are left alone. No-op when nothing
/// matches.
pub fn debit(resources: &mut [Resource], name: &str, amount: f64) {
    for resource in resources.iter_mut().filter(|r| r.name == name) {
        if let ResourceValue::Scalar(value) = &mut resource.value {
            *value -= amount;
            return;
        }
    }
}

/// First failing dimension, checked in cpus, mem, disk order.
pub fn first_shortfall(
    resources: &[Resource],
    cpus: f64,
    mem: f64,
    disk: f64,
) -> Option<ScalarShortfall> {
    if !will_fit(resources, CPUS, cpus) {
        info!("CPU didn't fit");
        return Some(ScalarShortfall::Cpus);
    }
    if !will_fit(resources, MEM, mem) {
        info!("mem didn't fit");
        return Some(ScalarShortfall::Mem);
    }
    if !will_fit(resources, DISK, disk) {
        info!("disk didn't fit");
        return Some(ScalarShortfall::Disk);
    }
    None
}

/// Conjunction of the cpus, mem and disk checks, short-circuiting.
pub fn will_fit_all(resources: &[Resource], cpus: f64, mem: f64, disk: f64) -> bool {
    first_shortfall(resources, cpus, mem, disk).is_none()
}

/// Debit cpus, mem and disk in that order.
pub fn debit_all(resources: &mut [Resource], cpus: f64, mem: f64, disk: f64) {
    debit(resources, CPUS, cpus);
    debit(resources, MEM, mem);
    debit(resources, DISK, disk);
}
