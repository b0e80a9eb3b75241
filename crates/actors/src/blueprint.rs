//! Body-type selection policy for traffic and OOD actors.

use contracts::BodyBlueprint;

/// Fixed ego body type
pub const EGO_BLUEPRINT: &str = "vehicle.dodge.charger_2020";

/// Irregular or oversized body-type suffixes excluded from traffic
const TRAFFIC_DENYLIST: [&str; 7] = [
    "microlino",
    "carlacola",
    "cybertruck",
    "t2",
    "sprinter",
    "firetruck",
    "ambulance",
];

fn is_denylisted(id: &str) -> bool {
    TRAFFIC_DENYLIST.iter().any(|suffix| id.ends_with(suffix))
}

/// Traffic candidates: exactly four wheels, denylist suffixes excluded
pub fn traffic_candidates(library: &[BodyBlueprint]) -> Vec<&BodyBlueprint> {
    library
        .iter()
        .filter(|bp| bp.number_of_wheels == 4)
        .filter(|bp| !is_denylisted(&bp.id))
        .collect()
}

/// OOD candidates derived from the vehicle library: the non-4-wheel
/// complement of the traffic set.
///
/// Configured OOD class lists bypass this filter entirely; this is only the
/// fallback when OOD bodies must come from the vehicle library itself.
pub fn ood_candidates(library: &[BodyBlueprint]) -> Vec<&BodyBlueprint> {
    library
        .iter()
        .filter(|bp| bp.number_of_wheels != 4)
        .collect()
}
