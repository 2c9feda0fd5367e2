//! Explicit engine state: the clock, the envelopes, the orb registers, the
//! surface-detail accumulators and one register set per blob id.
//!
//! Blob registers are created the first time a blob is touched and are never
//! removed while the engine lives. Each register belongs to exactly one id.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::clock::{ClockTuning, FrameClock};
use crate::detail::{DetailState, DetailTuning};
use crate::envelope::{AmplitudeTracker, EnvelopeSet};
use crate::motion::{OrbMotion, OrbTuning};
use crate::palette::ColorState;
use crate::placement::PlacementState;
use crate::shape::{EdgeFilter, ShapeState};

/// Stable blob identity within a session.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlobId(pub u16);

impl std::fmt::Display for BlobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "blob#{}", self.0)
    }
}

/// Smoothing registers of one blob. Each slot is filled on first use.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BlobRegisters {
    pub edge: Option<EdgeFilter>,
    pub shape: Option<ShapeState>,
    pub color: Option<ColorState>,
    pub placement: Option<PlacementState>,
}

impl BlobRegisters {
    /// The edge filter, created with `alpha` if missing.
    pub fn edge_mut(&mut self, alpha: f32) -> &mut EdgeFilter {
        self.edge.get_or_insert_with(|| EdgeFilter::new(alpha))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineState {
    pub clock: FrameClock,
    pub tracker: AmplitudeTracker,
    pub orb: OrbMotion,
    pub detail: DetailState,
    blobs: BTreeMap<BlobId, BlobRegisters>,
}

impl EngineState {
    pub fn new(clock: ClockTuning, envelopes: &EnvelopeSet, orb: OrbTuning, detail: &DetailTuning) -> Self {
        Self {
            clock: FrameClock::new(clock),
            tracker: AmplitudeTracker::new(envelopes),
            orb: OrbMotion::new(orb),
            detail: DetailState::new(detail),
            blobs: BTreeMap::new(),
        }
    }

    /// Registers of `id`, created empty on first access.
    pub fn registers_mut(&mut self, id: BlobId) -> &mut BlobRegisters {
        self.blobs.entry(id).or_default()
    }

    pub fn registers(&self, id: BlobId) -> Option<&BlobRegisters> {
        self.blobs.get(&id)
    }

    /// Ids that have registers, ascending.
    pub fn blob_ids(&self) -> impl Iterator<Item = BlobId> + '_ {
        self.blobs.keys().copied()
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.len()
    }
}
