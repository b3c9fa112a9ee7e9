//! Flux-rate resolution: the override hierarchy and world overrides.
//!
//! A base rate is resolved per actor per cadence, most specific wins:
//!
//! 1. Externally-configured world override (plane/region/sub-region key,
//!    wildcardable at each level) -- takes precedence whenever a key matches
//! 2. Exact-location override
//! 3. Sub-region override
//! 4. Region override
//! 5. Location-type default (day/night variant)
//! 6. Global default
//!
//! All rates are [`Decimal`] lucidity units per cadence.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use murkveil_types::{DayPhase, LocationId, LocationKind};

use crate::world::LocationProfile;

/// Wildcard marker accepted at any level of a world-override key.
pub const WILDCARD: &str = "*";

/// Day/night rate pair for a location type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayNightRate {
    /// Rate during daylight hours.
    pub day: Decimal,
    /// Rate during night hours.
    pub night: Decimal,
}

impl DayNightRate {
    /// Pick the variant for a phase.
    pub const fn for_phase(self, phase: DayPhase) -> Decimal {
        match phase {
            DayPhase::Day => self.day,
            DayPhase::Night => self.night,
        }
    }
}

/// Which rung of the hierarchy produced a resolved rate.
///
/// Recorded in adjustment metadata so drift is explainable after the fact.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateRung {
    /// An external world override matched.
    WorldOverride,
    /// An exact-location override matched.
    Location,
    /// A sub-region override matched.
    SubRegion,
    /// A region override matched.
    Region,
    /// The location-type day/night default applied.
    KindDefault,
    /// Nothing matched; the global default applied.
    GlobalDefault,
}

impl RateRung {
    /// Stable string form for metadata.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WorldOverride => "world_override",
            Self::Location => "location",
            Self::SubRegion => "sub_region",
            Self::Region => "region",
            Self::KindDefault => "kind_default",
            Self::GlobalDefault => "global_default",
        }
    }
}

// ---------------------------------------------------------------------------
// Hierarchy table
// ---------------------------------------------------------------------------

/// The static flux-rate tables for the hierarchy rungs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FluxRates {
    /// Exact-location overrides.
    pub location_overrides: BTreeMap<LocationId, Decimal>,
    /// Sub-region overrides, keyed by sub-region name.
    pub sub_region_overrides: BTreeMap<String, Decimal>,
    /// Region overrides, keyed by region name.
    pub region_overrides: BTreeMap<String, Decimal>,
    /// Location-type day/night defaults.
    pub kind_defaults: BTreeMap<LocationKind, DayNightRate>,
    /// Fallback when nothing else matches.
    pub global_default: Decimal,
}

impl Default for FluxRates {
    /// The stock rate table, lucidity units per cadence.
    ///
    /// | Kind       | Day   | Night |
    /// |------------|-------|-------|
    /// | Sanctuary  | +0.50 | +0.25 |
    /// | Settlement | +0.10 |  0.00 |
    /// | Wilds      | -0.05 | -0.15 |
    /// | Ruin       | -0.20 | -0.35 |
    /// | Depths     | -0.50 | -0.60 |
    fn default() -> Self {
        Self {
            location_overrides: BTreeMap::new(),
            sub_region_overrides: BTreeMap::new(),
            region_overrides: BTreeMap::new(),
            kind_defaults: BTreeMap::from([
                (
                    LocationKind::Sanctuary,
                    DayNightRate {
                        day: Decimal::new(50, 2),
                        night: Decimal::new(25, 2),
                    },
                ),
                (
                    LocationKind::Settlement,
                    DayNightRate {
                        day: Decimal::new(10, 2),
                        night: Decimal::ZERO,
                    },
                ),
                (
                    LocationKind::Wilds,
                    DayNightRate {
                        day: Decimal::new(-5, 2),
                        night: Decimal::new(-15, 2),
                    },
                ),
                (
                    LocationKind::Ruin,
                    DayNightRate {
                        day: Decimal::new(-20, 2),
                        night: Decimal::new(-35, 2),
                    },
                ),
                (
                    LocationKind::Depths,
                    DayNightRate {
                        day: Decimal::new(-50, 2),
                        night: Decimal::new(-60, 2),
                    },
                ),
            ]),
            global_default: Decimal::ZERO,
        }
    }
}

// ---------------------------------------------------------------------------
// World overrides
// ---------------------------------------------------------------------------

/// Externally-configured flux overrides keyed by plane/region/sub-region.
///
/// Absence of configuration is not an error, just "no override". Lookup
/// tries progressively wider keys: exact, then sub-region wildcard, then
/// region wildcard, then the full wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldOverrideMap {
    entries: BTreeMap<(String, String, String), Decimal>,
}

impl WorldOverrideMap {
    /// Create an empty override map.
    pub const fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Whether the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert an override. Pass [`WILDCARD`] at any level to match all
    /// values of that level.
    pub fn insert(&mut self, plane: &str, region: &str, sub_region: &str, rate: Decimal) {
        self.entries.insert(
            (plane.to_owned(), region.to_owned(), sub_region.to_owned()),
            rate,
        );
    }

    /// Resolve the most specific matching override, if any.
    pub fn resolve(
        &self,
        plane: &str,
        region: &str,
        sub_region: Option<&str>,
    ) -> Option<Decimal> {
        let sub = sub_region.unwrap_or(WILDCARD);
        let candidates = [
            (plane, region, sub),
            (plane, region, WILDCARD),
            (plane, WILDCARD, WILDCARD),
            (WILDCARD, WILDCARD, WILDCARD),
        ];
        candidates.iter().find_map(|(p, r, s)| {
            self.entries
                .get(&((*p).to_owned(), (*r).to_owned(), (*s).to_owned()))
                .copied()
        })
    }
}

// ---------------------------------------------------------------------------
// Resolution
// ---------------------------------------------------------------------------

/// Resolve the base flux rate for a location profile.
pub fn resolve_rate(
    rates: &FluxRates,
    overrides: &WorldOverrideMap,
    profile: &LocationProfile,
    phase: DayPhase,
) -> (Decimal, RateRung) {
    if let Some(rate) =
        overrides.resolve(&profile.plane, &profile.region, profile.sub_region.as_deref())
    {
        return (rate, RateRung::WorldOverride);
    }
    if let Some(rate) = rates.location_overrides.get(&profile.location_id) {
        return (*rate, RateRung::Location);
    }
    if let Some(rate) = profile
        .sub_region
        .as_deref()
        .and_then(|sub| rates.sub_region_overrides.get(sub))
    {
        return (*rate, RateRung::SubRegion);
    }
    if let Some(rate) = rates.region_overrides.get(&profile.region) {
        return (*rate, RateRung::Region);
    }
    if let Some(day_night) = rates.kind_defaults.get(&profile.kind) {
        return (day_night.for_phase(phase), RateRung::KindDefault);
    }
    (rates.global_default, RateRung::GlobalDefault)
}
