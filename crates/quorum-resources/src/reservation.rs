//! Reservation classification and re-declaration.
//!
//! Reserved resources are re-declared rather than reused when a node is
//! relaunched: the clone functions build fresh resources carrying the
//! same role, principal, and (for volumes) persistence ID and mount path.

use crate::types::{DISK, DiskInfo, ReservationInfo, Resource, ResourceValue, VolumeMode};

/// A reserved `disk` resource that describes a persistent volume.
pub fn is_reserved_volume(resource: &Resource) -> bool {
    resource.reservation.is_some() && resource.disk.is_some() && resource.name == DISK
}

/// A resource reserved for a non-empty role.
pub fn is_reserved(resource: &Resource) -> bool {
    resource.reservation.is_some() && !resource.role().is_empty()
}

pub fn is_unreserved(resource: &Resource) -> bool {
    resource.reservation.is_none()
}

/// Build a scalar resource reserved for `role` on behalf of `principal`.
pub fn new_reserved_scalar(name: &str, value: f64, principal: &str, role: &str) -> Resource {
    Resource {
        name: name.to_string(),
        value: ResourceValue::Scalar(value),
        role: Some(role.to_string()),
        reservation: Some(ReservationInfo {
            principal: Some(principal.to_string()),
        }),
        disk: None,
    }
}

/// Build a reserved, read-write persistent volume.
pub fn new_reserved_volume(
    value: f64,
    container_path: &str,
    persistence_id: &str,
    principal: &str,
    role: &str,
) -> Resource {
    let mut resource = new_reserved_scalar(DISK, value, principal, role);
    resource.disk = Some(DiskInfo {
        persistence_id: persistence_id.to_string(),
        container_path: container_path.to_string(),
        mode: VolumeMode::ReadWrite,
    });
    resource
}

/// Re-declare a reserved volume.
///
/// The scalar value, role, principal, persistence ID and container path
/// carry over. A resource without disk info yields a volume with empty
/// identifiers.
pub fn clone_reserved_volume(resource: &Resource) -> Resource {
    let (container_path, persistence_id) = resource
        .disk
        .as_ref()
        .map(|d| (d.container_path.as_str(), d.persistence_id.as_str()))
        .unwrap_or_default();
    new_reserved_volume(
        resource.scalar_value().unwrap_or_default(),
        container_path,
        persistence_id,
        resource.principal(),
        resource.role(),
    )
}

/// Re-declare a reserved scalar without volume information.
pub fn clone_reserved_scalar(resource: &Resource) -> Resource {
    new_reserved_scalar(
        &resource.name,
        resource.scalar_value().unwrap_or_default(),
        resource.principal(),
        resource.role(),
    )
}

pub fn filter_reserved_volumes(resources: &[Resource]) -> Vec<&Resource> {
    resources.iter().filter(|r| is_reserved_volume(r)).collect()
}

pub fn filter_reserved(resources: &[Resource]) -> Vec<&Resource> {
    resources.iter().filter(|r| is_reserved(r)).collect()
}

pub fn filter_unreserved(resources: &[Resource]) -> Vec<&Resource> {
    resources.iter().filter(|r| is_unreserved(r)).collect()
}

/// Fresh copies of every reserved volume in `resources`.
pub fn copy_reserved_volumes(resources: &[Resource]) -> Vec<Resource> {
    resources
        .iter()
        .filter(|r| is_reserved_volume(r))
        .map(clone_reserved_volume)
        .collect()
}

/// Fresh scalar copies of every reserved resource in `resources`.
pub fn copy_reserved_resources(resources: &[Resource]) -> Vec<Resource> {
    resources
        .iter()
        .filter(|r| is_reserved(r))
        .map(clone_reserved_scalar)
        .collect()
}

/// Clear reservation, disk and role metadata in place.
pub fn strip_reservations(resources: &mut [Resource]) {
    for resource in resources {
        resource.reservation = None;
        resource.disk = None;
        resource.role = None;
    }
}
