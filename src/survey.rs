//! Survey: every participant, indexed by persona and by drawn side.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::model::{AnatomicalSide, Persona, PersonaDrawing};
use crate::participant::{Participant, ParticipantData};

#[derive(Deserialize)]
#[serde(untagged)]
enum SurveyFile {
    List(Vec<ParticipantData>),
    Wrapped { participants: Vec<ParticipantData> },
}

/// Participant records of a survey file, in file order.
pub fn parse_records(s: &str) -> Result<Vec<ParticipantData>> {
    Ok(match serde_json::from_str::<SurveyFile>(s)? {
        SurveyFile::List(list) => list,
        SurveyFile::Wrapped { participants } => participants,
    })
}

/// Participants keyed by id.
///
/// The persona and side indexes hold ids, never copies of participants.
#[derive(Debug, Clone, Default)]
pub struct Survey {
    participants: BTreeMap<String, Participant>,
    personas: BTreeMap<Persona, Vec<String>>,
    drawings_per_side: BTreeMap<AnatomicalSide, Vec<String>>,
}

impl Survey {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a survey from JSON: either a list of `{id, drawing}` records or an
    /// object with such a list under `participants`.
    pub fn from_json(s: &str) -> Result<Self> {
        let mut survey = Survey::new();
        for record in parse_records(s)? {
            survey.add_participant(record.into());
        }
        info!(participants = survey.len(), "survey loaded");
        Ok(survey)
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        Self::from_json(&std::fs::read_to_string(path)?)
    }

    /// Add (or replace) a participant and index it.
    pub fn add_participant(&mut self, participant: Participant) {
        let id = participant.id.clone();
        if self.participants.contains_key(&id) {
            self.unindex(&id);
        }
        self.personas
            .entry(participant.persona)
            .or_default()
            .push(id.clone());
        for side in participant.drawing().sides() {
            self.drawings_per_side.entry(side).or_default().push(id.clone());
        }
        self.participants.insert(id, participant);
    }

    fn unindex(&mut self, id: &str) {
        for ids in self.personas.values_mut().chain(self.drawings_per_side.values_mut()) {
            ids.retain(|p| p != id);
        }
    }

    pub fn participant(&self, id: &str) -> Option<&Participant> {
        self.participants.get(id)
    }

    pub fn participant_mut(&mut self, id: &str) -> Option<&mut Participant> {
        self.participants.get_mut(id)
    }

    /// All participants, ordered by id.
    pub fn participants(&self) -> impl Iterator<Item = &Participant> {
        self.participants.values()
    }

    pub fn participants_mut(&mut self) -> impl Iterator<Item = &mut Participant> {
        self.participants.values_mut()
    }

    pub fn participants_for(&self, persona: Persona) -> impl Iterator<Item = &Participant> {
        self.personas
            .get(&persona)
            .into_iter()
            .flatten()
            .filter_map(|id| self.participants.get(id))
    }

    /// Every drawing of one side, in participant insertion order.
    pub fn drawings_for_side(&self, side: AnatomicalSide) -> Vec<&PersonaDrawing> {
        self.drawings_per_side
            .get(&side)
            .into_iter()
            .flatten()
            .filter_map(|id| self.participants.get(id)?.drawing().get(side))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.participants.len()
    }

    pub fn is_empty(&self) -> bool {
        self.participants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Drawing;

    const SURVEY_JSON: &str = r#"[
        {"id": "a", "drawing": {"FemaleFront": {"imgWidth": 10, "imgHeight": 10, "strokes": []}}},
        {"id": "b", "drawing": {
            "MaleFront": {"imgWidth": 12, "imgHeight": 12, "strokes": []},
            "MaleBack": {"imgWidth": 12, "imgHeight": 12, "strokes": []}
        }},
        {"id": "c", "drawing": {"MaleFront": {"imgWidth": 8, "imgHeight": 8, "strokes": []}}}
    ]"#;

    #[test]
    fn test_from_json_indexes() {
        let survey = Survey::from_json(SURVEY_JSON).unwrap();
        assert_eq!(survey.len(), 3);

        let males: Vec<&str> = survey.participants_for(Persona::Male).map(|p| p.id.as_str()).collect();
        assert_eq!(males, vec!["b", "c"]);
        assert_eq!(survey.participants_for(Persona::Female).count(), 1);

        let fronts = survey.drawings_for_side(AnatomicalSide::MaleFront);
        assert_eq!(fronts.len(), 2);
        assert_eq!(fronts[1].img_width, 8);
        assert!(survey.drawings_for_side(AnatomicalSide::FemaleBack).is_empty());
    }

    #[test]
    fn test_wrapped_form() {
        let wrapped = format!(r#"{{"participants": {}}}"#, SURVEY_JSON);
        assert_eq!(Survey::from_json(&wrapped).unwrap().len(), 3);
    }

    #[test]
    fn test_replacing_a_participant_reindexes() {
        let mut survey = Survey::from_json(SURVEY_JSON).unwrap();
        let female = Drawing::new().with_side(AnatomicalSide::FemaleBack, PersonaDrawing::new(4, 4));
        survey.add_participant(Participant::new("b", female));

        assert_eq!(survey.len(), 3);
        assert_eq!(survey.participants_for(Persona::Male).count(), 1);
        assert_eq!(survey.drawings_for_side(AnatomicalSide::MaleBack).len(), 0);
        assert_eq!(survey.drawings_for_side(AnatomicalSide::FemaleBack).len(), 1);
    }

    #[test]
    fn test_malformed_survey() {
        assert!(Survey::from_json(r#"[{"id": 3}]"#).is_err());
    }
}
