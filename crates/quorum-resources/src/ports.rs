//! Port range codec and randomized port allocation.
//!
//! Offers describe ports as inclusive ranges. Allocation works on the
//! expanded, sorted port list and re-encodes both halves as minimal
//! range sets before handing them back.

use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::rngs::StdRng;
use rand::{Rng, RngCore, SeedableRng};
use tracing::{debug, info};

use crate::error::{ResourceError, ResourceResult};
use crate::types::{PORTS, Resource, ValueRange};

/// Merge a set of ports into minimal, ascending, disjoint ranges.
///
/// A port extends the current range when it is at most one past its end,
/// so duplicates and adjacent values collapse into a single interval.
pub fn to_ranges(ports: &[u64]) -> Vec<ValueRange> {
    let mut sorted = ports.to_vec();
    sorted.sort_unstable();

    let mut ranges: Vec<ValueRange> = Vec::new();
    for port in sorted {
        match ranges.last_mut() {
            Some(last) if port <= last.end.saturating_add(1) => last.end = port.max(last.end),
            _ => ranges.push(ValueRange::new(port, port)),
        }
    }
    ranges
}

/// Expand ranges into individual ports, in input order.
pub fn to_ports(ranges: &[ValueRange]) -> Vec<u64> {
    ranges.iter().flat_map(|r| r.begin..=r.end).collect()
}

/// Lazily iterate every port of every `ports` resource, in order.
///
/// The iterator is `Clone`, so a consumer can restart from the beginning
/// by keeping a copy around.
pub fn iter_ports(resources: &[Resource]) -> impl Iterator<Item = u64> + Clone + '_ {
    resources
        .iter()
        .filter(|r| r.name == PORTS)
        .flat_map(|r| r.range_values().iter().flat_map(|range| range.begin..=range.end))
}

/// True if any `ports` resource holds at least `count` ports.
pub fn port_resource_will_fit(resources: &[Resource], count: usize) -> bool {
    let fits = resources
        .iter()
        .filter(|r| r.name == PORTS)
        .any(|r| {
            let available = r
                .range_values()
                .iter()
                .map(ValueRange::len)
                .fold(0u64, u64::saturating_add);
            available >= count as u64
        });
    if !fits {
        info!(requested = count, "ports didn't fit");
    }
    fits
}

/// Result of splitting a ports resource.
#[derive(Debug, Clone, PartialEq)]
pub struct PortSplit {
    /// Ports that stay with the offer.
    pub leftover: Resource,
    /// Ports handed to the requester.
    pub granted: Resource,
}

impl PortSplit {
    /// Placeholders returned when the resource list has no `ports` entry.
    fn empty() -> Self {
        Self {
            leftover: Resource::ranges(PORTS, Vec::new()),
            granted: Resource::ranges(PORTS, Vec::new()),
        }
    }
}

/// Hands out contiguous, randomly positioned slices of an offer's ports.
///
/// The random source is injected so tests can pin it; the default is a
/// `StdRng` seeded once from the wall clock. It sits behind a mutex so a
/// single allocator can serve concurrent offer callbacks.
pub struct PortAllocator<R = StdRng> {
    rng: Mutex<R>,
}

impl PortAllocator<StdRng> {
    /// Allocator seeded from the current time.
    pub fn from_clock() -> Self {
        let seed = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos() as u64;
        Self::new(StdRng::seed_from_u64(seed))
    }
}

impl Default for PortAllocator<StdRng> {
    fn default() -> Self {
        Self::from_clock()
    }
}

impl<R: RngCore> PortAllocator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng: Mutex::new(rng),
        }
    }

    /// Split the first `ports` resource into leftover and granted halves.
    ///
    /// The granted half is exactly `count` consecutive entries of the
    /// sorted port list, starting at a random offset in
    /// `[0, available - count)`. The input is not modified. Without a
    /// `ports` resource both halves are empty placeholders.
    pub fn split(&self, resources: &[Resource], count: usize) -> ResourceResult<PortSplit> {
        let Some(source) = resources.iter().find(|r| r.name == PORTS) else {
            return Ok(PortSplit::empty());
        };

        let mut ports = to_ports(source.range_values());
        ports.sort_unstable();
        ports.dedup();

        if ports.len() < count {
            return Err(ResourceError::InsufficientPorts {
                requested: count,
                available: ports.len(),
            });
        }

        let offset = if ports.len() > count {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            rng.random_range(0..ports.len() - count)
        } else {
            0
        };

        let granted = &ports[offset..offset + count];
        let leftover: Vec<u64> = ports[..offset]
            .iter()
            .chain(&ports[offset + count..])
            .copied()
            .collect();

        debug!(
            requested = count,
            available = ports.len(),
            offset,
            "ports allocated"
        );

        Ok(PortSplit {
            leftover: Resource::ranges(PORTS, to_ranges(&leftover)),
            granted: Resource::ranges(PORTS, to_ranges(granted)),
        })
    }

    /// Allocate `count` ports and write the leftover back in place.
    ///
    /// Every `ports` slot of `resources` is overwritten with the leftover
    /// resource. Returns the granted resource.
    pub fn apply_ranges_resource(
        &self,
        resources: &mut [Resource],
        count: usize,
    ) -> ResourceResult<Resource> {
        let PortSplit { leftover, granted } = self.split(resources, count)?;
        for slot in resources.iter_mut().filter(|r| r.name == PORTS) {
            *slot = leftover.clone();
        }
        Ok(granted)
    }
}
