//! Offer evaluation — does an offer satisfy a node's request?
//!
//! All fit checks run before anything is debited, and debits are applied
//! to a copy of the offer, so a rejected offer is never modified.

use rand::RngCore;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::ports::{PortAllocator, port_resource_will_fit};
use crate::reservation::{
    clone_reserved_volume, is_reserved, is_reserved_volume, new_reserved_scalar,
};
use crate::scalar::{ScalarShortfall, debit_all, first_shortfall};
use crate::types::{CPUS, DISK, MEM, Resource, ScalarSummary};

/// Resources a node needs to launch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeRequest {
    pub cpus: f64,
    /// Memory in MB.
    pub mem: f64,
    /// Disk in MB.
    pub disk: f64,
    /// Number of ports.
    pub ports: usize,
}

/// Why an offer was turned down.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Cpus,
    Mem,
    Disk,
    Ports,
}

impl From<ScalarShortfall> for Rejection {
    fn from(shortfall: ScalarShortfall) -> Self {
        match shortfall {
            ScalarShortfall::Cpus => Self::Cpus,
            ScalarShortfall::Mem => Self::Mem,
            ScalarShortfall::Disk => Self::Disk,
        }
    }
}

/// What a successful match carves out of an offer.
#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    /// The offer after debiting the request.
    pub remaining: Vec<Resource>,
    /// Resources to launch the node with.
    pub ask: Vec<Resource>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum OfferMatch {
    Fits(Allocation),
    Rejected(Rejection),
}

impl OfferMatch {
    pub fn is_fit(&self) -> bool {
        matches!(self, Self::Fits(_))
    }
}

/// Matches node requests against offers.
pub struct OfferEvaluator<R = StdRng> {
    ports: PortAllocator<R>,
}

impl Default for OfferEvaluator<StdRng> {
    fn default() -> Self {
        Self::new(PortAllocator::from_clock())
    }
}

impl<R: RngCore> OfferEvaluator<R> {
    pub fn new(ports: PortAllocator<R>) -> Self {
        Self { ports }
    }

    /// Match `request` against the whole offer.
    ///
    /// The ask holds `cpus`, `mem` and `disk` scalars of exactly the
    /// requested amounts, followed by the granted ports.
    ///
    /// Fit passes when any same-named entry holds enough, but the debit
    /// lands on the first entry. With duplicate names a `remaining` scalar
    /// can therefore go negative.
    pub fn evaluate(&self, offer: &[Resource], request: &NodeRequest) -> OfferMatch {
        log_request(offer, request);

        if let Some(shortfall) = first_shortfall(offer, request.cpus, request.mem, request.disk) {
            return OfferMatch::Rejected(shortfall.into());
        }
        if request.ports > 0 && !port_resource_will_fit(offer, request.ports) {
            return OfferMatch::Rejected(Rejection::Ports);
        }

        let mut remaining = offer.to_vec();
        let granted = match self.ports.apply_ranges_resource(&mut remaining, request.ports) {
            Ok(granted) => granted,
            Err(e) => {
                info!(error = %e, "ports didn't fit");
                return OfferMatch::Rejected(Rejection::Ports);
            }
        };
        debit_all(&mut remaining, request.cpus, request.mem, request.disk);

        let mut ask = vec![
            Resource::scalar(CPUS, request.cpus),
            Resource::scalar(MEM, request.mem),
            Resource::scalar(DISK, request.disk),
        ];
        if request.ports > 0 {
            ask.push(granted);
        }

        OfferMatch::Fits(Allocation { remaining, ask })
    }

    /// Match `request` against the reserved part of the offer.
    ///
    /// Scalars must fit within reserved entries and are re-declared with
    /// the role and principal of the entry they come from. A reserved
    /// volume, if present, is re-declared in place of a disk scalar. Ports
    /// come from the unreserved part of the offer.
    ///
    /// Re-declared scalars take the role and principal of the first
    /// reserved entry with that name, which need not be the entry that
    /// satisfied the fit check.
    pub fn evaluate_reserved(&self, offer: &[Resource], request: &NodeRequest) -> OfferMatch {
        log_request(offer, request);

        let (mut reserved, mut unreserved): (Vec<Resource>, Vec<Resource>) =
            offer.iter().cloned().partition(is_reserved);

        if let Some(shortfall) =
            first_shortfall(&reserved, request.cpus, request.mem, request.disk)
        {
            return OfferMatch::Rejected(shortfall.into());
        }
        if request.ports > 0 && !port_resource_will_fit(&unreserved, request.ports) {
            return OfferMatch::Rejected(Rejection::Ports);
        }

        let granted = match self.ports.apply_ranges_resource(&mut unreserved, request.ports) {
            Ok(granted) => granted,
            Err(e) => {
                info!(error = %e, "ports didn't fit");
                return OfferMatch::Rejected(Rejection::Ports);
            }
        };

        let mut ask: Vec<Resource> = [(CPUS, request.cpus), (MEM, request.mem)]
            .into_iter()
            .filter_map(|(name, amount)| redeclare(&reserved, name, amount))
            .collect();
        match reserved.iter().find(|r| is_reserved_volume(r)) {
            Some(volume) => ask.push(clone_reserved_volume(volume)),
            None => ask.extend(redeclare(&reserved, DISK, request.disk)),
        }
        if request.ports > 0 {
            ask.push(granted);
        }

        debit_all(&mut reserved, request.cpus, request.mem, request.disk);
        reserved.append(&mut unreserved);

        OfferMatch::Fits(Allocation {
            remaining: reserved,
            ask,
        })
    }
}

/// Reserved scalar of `amount` carrying the first matching entry's
/// role and principal.
fn redeclare(reserved: &[Resource], name: &str, amount: f64) -> Option<Resource> {
    reserved
        .iter()
        .find(|r| r.name == name)
        .map(|source| new_reserved_scalar(name, amount, source.principal(), source.role()))
}

fn log_request(offer: &[Resource], request: &NodeRequest) {
    info!(
        cpus = request.cpus,
        mem = request.mem,
        disk = request.disk,
        ports = request.ports,
        "requested"
    );
    info!(offer = %ScalarSummary(offer), "checking to see if these resources fit");
}
