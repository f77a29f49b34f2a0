//! A survey participant and their drawn areas.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::area::AreaTally;
use crate::error::{Error, Result};
use crate::model::{Drawing, Persona};
use crate::surface::SurfaceProvider;

/// One participant: their drawing and the areas derived from it.
///
/// `areas`, `total_drawing_area` and the drawing caches are only meaningful
/// while `computed` is set.
#[derive(Debug, Clone)]
pub struct Participant {
    pub id: String,
    pub persona: Persona,
    drawing: Drawing,
    areas: AreaTally,
    computed: bool,
}

/// Raw participant record as found in survey files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantData {
    pub id: String,
    pub drawing: Drawing,
}

impl Participant {
    pub fn new(id: impl Into<String>, drawing: Drawing) -> Self {
        let persona = drawing.persona();
        Self {
            id: id.into(),
            persona,
            drawing,
            areas: AreaTally::new(),
            computed: false,
        }
    }

    pub fn drawing(&self) -> &Drawing {
        &self.drawing
    }

    /// Mutable access to the drawing. Derived data is invalidated.
    pub fn drawing_mut(&mut self) -> &mut Drawing {
        self.invalidate();
        &mut self.drawing
    }

    pub fn is_computed(&self) -> bool {
        self.computed
    }

    /// Map every drawn side and tally its pixels per sensation.
    ///
    /// Previous results are discarded first, so calling this twice yields the
    /// same areas. On error the participant is left uncomputed.
    pub fn compute_stroke_areas<P: SurfaceProvider>(&mut self, provider: &mut P) -> Result<()> {
        self.invalidate();
        let mut tally = AreaTally::new();
        let id = &self.id;
        let outcome = self.drawing.iter_mut().try_for_each(|(side, drawing)| {
            drawing.compute_derived(provider, &mut tally)?;
            debug!(participant = %id, %side, "side computed");
            Ok::<(), Error>(())
        });
        if let Err(e) = outcome {
            self.invalidate();
            return Err(e);
        }
        self.areas = tally;
        self.computed = true;
        Ok(())
    }

    /// Drop all derived data.
    pub fn invalidate(&mut self) {
        self.computed = false;
        self.areas.clear();
        for (_, drawing) in self.drawing.iter_mut() {
            drawing.invalidate();
        }
    }

    pub fn areas(&self) -> Result<&AreaTally> {
        if self.computed {
            Ok(&self.areas)
        } else {
            Err(Error::NotComputed(self.id.clone()))
        }
    }

    pub fn total_drawing_area(&self) -> Result<u64> {
        self.areas().map(AreaTally::total)
    }
}

impl From<ParticipantData> for Participant {
    fn from(data: ParticipantData) -> Self {
        Participant::new(data.id, data.drawing)
    }
}
