//! Batch jobs over a whole survey: the pixel-map archive and the area table.
//!
//! [`ExportJob`] maps every drawn side of every participant and streams one
//! CSV entry per side into a single zip archive written to a caller-supplied
//! sink. A finished archive ends with a `manifest.json` entry listing every
//! other entry; an archive without one was aborted part-way.
//!
//! Progress is counted in steps: two per participant (map, write), one for
//! finalizing the archive and one for delivering it.

use std::io::{Read, Seek, Write};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::area::AreaTally;
use crate::config::{Compression, ExportConfig};
use crate::error::Result;
use crate::model::AnatomicalSide;
use crate::participant::{Participant, ParticipantData};
use crate::progress::{Phase, ProgressSink, ProgressTracker};
use crate::sensation_map::drawn_points;
use crate::surface::SurfaceProvider;
use crate::survey::Survey;
use crate::tabular::write_points;

pub const STEPS_PER_PARTICIPANT: usize = 2;
pub const MANIFEST_NAME: &str = "manifest.json";

/// Archive entry name for one participant side.
pub fn entry_name(participant_id: &str, side: AnatomicalSide) -> String {
    format!("{}-{}.csv", participant_id, side)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportState {
    Idle,
    Mapping {
        participant: String,
        side: AnatomicalSide,
    },
    Archiving,
    Delivered,
    Failed,
}

impl ExportState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExportState::Delivered | ExportState::Failed)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveEntry {
    pub name: String,
    pub participant: String,
    pub side: AnatomicalSide,
    pub points: usize,
}

/// What a finished export wrote. Also the content of `manifest.json`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportSummary {
    pub participants: usize,
    pub entries: Vec<ArchiveEntry>,
}

impl ExportSummary {
    pub fn total_points(&self) -> usize {
        self.entries.iter().map(|e| e.points).sum()
    }
}

#[derive(Debug)]
pub struct ExportJob {
    config: ExportConfig,
    state: ExportState,
}

impl ExportJob {
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            state: ExportState::Idle,
        }
    }

    pub fn state(&self) -> &ExportState {
        &self.state
    }

    /// Write the pixel-map archive of `survey` to `out`.
    ///
    /// A single linear pass: the first error aborts the job, leaves it
    /// `Failed` and is returned as is. Each run starts from `Idle`.
    pub fn run<W, P>(
        &mut self,
        survey: &Survey,
        provider: &mut P,
        out: W,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExportSummary>
    where
        W: Write + Seek,
        P: SurfaceProvider,
    {
        self.run_zip(survey, provider, ZipWriter::new(out), sink)
    }

    /// Like [`run`](Self::run) for sinks that cannot seek, such as pipes.
    /// Entry sizes then follow each entry's data instead of preceding it.
    pub fn run_stream<W, P>(
        &mut self,
        survey: &Survey,
        provider: &mut P,
        out: W,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExportSummary>
    where
        W: Write,
        P: SurfaceProvider,
    {
        self.run_zip(survey, provider, ZipWriter::new_stream(out), sink)
    }

    fn run_zip<Z, P>(
        &mut self,
        survey: &Survey,
        provider: &mut P,
        zip: ZipWriter<Z>,
        sink: &mut dyn ProgressSink,
    ) -> Result<ExportSummary>
    where
        Z: Write + Seek,
        P: SurfaceProvider,
    {
        self.state = ExportState::Idle;
        let total = STEPS_PER_PARTICIPANT * survey.len() + 2;
        let mut tracker = ProgressTracker::new(Phase::PixelMapsZip, total);
        info!(participants = survey.len(), steps = total, "export started");

        match self.write_archive(survey, provider, zip, sink, &mut tracker) {
            Ok(summary) => {
                self.state = ExportState::Delivered;
                tracker.step(sink, "Archive delivered");
                info!(
                    entries = summary.entries.len(),
                    points = summary.total_points(),
                    "export finished"
                );
                Ok(summary)
            }
            Err(e) => {
                warn!(error = %e, state = ?self.state, "export aborted");
                self.state = ExportState::Failed;
                Err(e)
            }
        }
    }

    fn write_archive<Z, P>(
        &mut self,
        survey: &Survey,
        provider: &mut P,
        mut zip: ZipWriter<Z>,
        sink: &mut dyn ProgressSink,
        tracker: &mut ProgressTracker,
    ) -> Result<ExportSummary>
    where
        Z: Write + Seek,
        P: SurfaceProvider,
    {
        let method = match self.config.compression {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        };
        let options = SimpleFileOptions::default().compression_method(method);
        let mut summary = ExportSummary {
            participants: survey.len(),
            entries: Vec::new(),
        };

        for participant in survey.participants() {
            let mut mapped = Vec::with_capacity(participant.drawing().len());
            for (side, drawing) in participant.drawing().iter() {
                self.state = ExportState::Mapping {
                    participant: participant.id.clone(),
                    side,
                };
                mapped.push((side, drawn_points(drawing, provider)?));
            }
            tracker.step(sink, format!("Computed pixel map of participant {}", participant.id));

            for (side, points) in mapped {
                let name = entry_name(&participant.id, side);
                zip.start_file(name.as_str(), options)?;
                write_points(&mut zip, &points)?;
                debug!(entry = %name, points = points.len(), "entry written");
                summary.entries.push(ArchiveEntry {
                    name,
                    participant: participant.id.clone(),
                    side,
                    points: points.len(),
                });
            }
            tracker.step(sink, format!("Wrote pixel maps of participant {}", participant.id));
        }

        self.state = ExportState::Archiving;
        if self.config.write_manifest {
            zip.start_file(MANIFEST_NAME, options)?;
            serde_json::to_writer_pretty(&mut zip, &summary)?;
        }
        let mut out = zip.finish()?;
        out.flush()?;
        tracker.step(sink, "Archive finalized");
        Ok(summary)
    }
}

/// Read the manifest of an archive written by [`ExportJob`].
///
/// `Ok(None)` means the archive is readable but was never completed.
pub fn read_manifest<R: Read + Seek>(reader: R) -> Result<Option<ExportSummary>> {
    let mut archive = ZipArchive::new(reader)?;
    let manifest = match archive.by_name(MANIFEST_NAME) {
        Ok(file) => Ok(Some(serde_json::from_reader(file)?)),
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    };
    manifest
}

/// Areas of one participant as reported by [`AreaJob`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantAreas {
    pub id: String,
    pub areas: AreaTally,
    pub total_drawing_area: u64,
}

/// Computes drawn areas for a list of participant records.
#[derive(Debug, Clone)]
pub struct AreaJob {
    participants: Vec<ParticipantData>,
}

impl AreaJob {
    pub fn new(participants: Vec<ParticipantData>) -> Self {
        Self { participants }
    }

    /// All participants are computed before anything is returned; the first
    /// error discards the partial result.
    pub fn run<P: SurfaceProvider>(
        self,
        provider: &mut P,
        sink: &mut dyn ProgressSink,
    ) -> Result<Vec<ParticipantAreas>> {
        let mut tracker = ProgressTracker::new(Phase::Areas, self.participants.len());
        let mut results = Vec::with_capacity(self.participants.len());

        for data in self.participants {
            let mut participant = Participant::from(data);
            tracker.report(
                sink,
                format!("Computing stroke areas of participant {}", participant.id),
            );
            participant.compute_stroke_areas(provider)?;
            let areas = participant.areas()?.clone();
            results.push(ParticipantAreas {
                total_drawing_area: areas.total(),
                areas,
                id: participant.id,
            });
            tracker.advance();
        }
        info!(participants = results.len(), "areas computed");
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SurfaceConfig;
    use crate::error::Error;
    use crate::model::{Drawing, PersonaDrawing, Point, Sensation, Stroke};
    use crate::progress::{NullSink, ProgressEvent};
    use crate::surface::RgbaSurfaceProvider;
    use crate::tabular::parse_points;
    use std::io::Cursor;

    fn drawing(y: f64, s: Sensation) -> PersonaDrawing {
        PersonaDrawing::new(40, 40).with_strokes(vec![Stroke::new(
            vec![Point::new(5.0, y), Point::new(35.0, y)],
            3.0,
            s,
        )])
    }

    fn survey() -> Survey {
        let mut survey = Survey::new();
        survey.add_participant(Participant::new(
            "p1",
            Drawing::new()
                .with_side(AnatomicalSide::FemaleFront, drawing(10.0, Sensation::new(1, 2)))
                .with_side(AnatomicalSide::FemaleBack, drawing(20.0, Sensation::new(-1, 1))),
        ));
        survey.add_participant(Participant::new(
            "p2",
            Drawing::new().with_side(AnatomicalSide::MaleFront, drawing(30.0, Sensation::new(0, 3))),
        ));
        survey
    }

    fn read_entry(buf: &[u8], name: &str) -> String {
        let mut archive = ZipArchive::new(Cursor::new(buf)).unwrap();
        let mut text = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut text).unwrap();
        text
    }

    #[test]
    fn test_entry_name() {
        assert_eq!(entry_name("abc", AnatomicalSide::MaleBack), "abc-MaleBack.csv");
    }

    #[test]
    fn test_export_writes_one_entry_per_side() {
        let survey = survey();
        let mut provider = RgbaSurfaceProvider::default();
        let mut buf = Cursor::new(Vec::new());
        let mut events: Vec<ProgressEvent> = Vec::new();
        let mut job = ExportJob::new(ExportConfig::default());

        let summary = job
            .run(&survey, &mut provider, &mut buf, &mut |e: ProgressEvent| events.push(e))
            .unwrap();

        assert_eq!(job.state(), &ExportState::Delivered);
        assert_eq!(summary.entries.len(), 3);

        // 2 participants x 2 steps + archive + delivery.
        assert_eq!(events.len(), 6);
        assert!(events.iter().all(|e| e.total == 6));
        assert_eq!(events.last().unwrap().current, 6);
        assert_eq!(events.last().unwrap().fraction(), 1.0);

        let bytes = buf.into_inner();
        let csv = read_entry(&bytes, "p1-FemaleBack.csv");
        let points = parse_points(&csv).unwrap();
        assert_eq!(points.len(), summary.entries[1].points);
        assert!(points.iter().all(|p| p.valence == -1 && p.intensity == 1));

        let manifest = read_manifest(Cursor::new(&bytes)).unwrap().unwrap();
        assert_eq!(manifest, summary);
    }

    #[test]
    fn test_export_matches_mapper() {
        let survey = survey();
        let mut provider = RgbaSurfaceProvider::default();
        let mut buf = Cursor::new(Vec::new());
        ExportJob::new(ExportConfig {
            compression: Compression::Stored,
            write_manifest: false,
        })
        .run(&survey, &mut provider, &mut buf, &mut NullSink)
        .unwrap();

        let bytes = buf.into_inner();
        let d = survey.participant("p2").unwrap().drawing().get(AnatomicalSide::MaleFront).unwrap();
        let expected = drawn_points(d, &mut provider).unwrap();
        let parsed = parse_points(&read_entry(&bytes, "p2-MaleFront.csv")).unwrap();
        assert_eq!(parsed, expected);
        assert_eq!(read_manifest(Cursor::new(&bytes)).unwrap(), None);
    }

    #[test]
    fn test_failed_export_has_no_manifest() {
        let survey = survey();
        let mut provider = RgbaSurfaceProvider::new(SurfaceConfig {
            max_width: 16,
            max_height: 16,
            ..SurfaceConfig::default()
        });
        let mut buf = Cursor::new(Vec::new());
        let mut events = 0;
        let mut job = ExportJob::new(ExportConfig::default());

        let err = job
            .run(&survey, &mut provider, &mut buf, &mut |_: ProgressEvent| events += 1)
            .unwrap_err();
        assert!(matches!(err, Error::Surface { .. }));
        assert_eq!(job.state(), &ExportState::Failed);
        assert!(job.state().is_terminal());
        assert_eq!(events, 0);
        assert!(!matches!(read_manifest(Cursor::new(buf.into_inner())), Ok(Some(_))));
    }

    #[test]
    fn test_streamed_export_to_unseekable_sink() {
        let survey = survey();
        let mut bytes: Vec<u8> = Vec::new();
        let mut job = ExportJob::new(ExportConfig::default());

        let summary = job
            .run_stream(&survey, &mut RgbaSurfaceProvider::default(), &mut bytes, &mut NullSink)
            .unwrap();

        assert_eq!(job.state(), &ExportState::Delivered);
        let points = parse_points(&read_entry(&bytes, "p1-FemaleFront.csv")).unwrap();
        assert_eq!(points.len(), summary.entries[0].points);
        assert_eq!(read_manifest(Cursor::new(&bytes)).unwrap(), Some(summary));
    }

    #[test]
    fn test_empty_survey_still_delivers() {
        let mut buf = Cursor::new(Vec::new());
        let summary = ExportJob::new(ExportConfig::default())
            .run(&Survey::new(), &mut RgbaSurfaceProvider::default(), &mut buf, &mut NullSink)
            .unwrap();
        assert!(summary.entries.is_empty());
        assert!(read_manifest(Cursor::new(buf.into_inner())).unwrap().is_some());
    }

    #[test]
    fn test_area_job() {
        let data = vec![
            ParticipantData {
                id: "a".into(),
                drawing: Drawing::new().with_side(AnatomicalSide::MaleFront, drawing(10.0, Sensation::new(2, 2))),
            },
            ParticipantData {
                id: "b".into(),
                drawing: Drawing::new(),
            },
        ];
        let mut messages = Vec::new();
        let results = AreaJob::new(data)
            .run(&mut RgbaSurfaceProvider::default(), &mut |e: ProgressEvent| {
                messages.push((e.current, e.message))
            })
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].id, "a");
        assert!(results[0].total_drawing_area > 0);
        assert_eq!(results[0].areas.get(Sensation::new(2, 2)), results[0].total_drawing_area);
        assert_eq!(results[1].total_drawing_area, 0);
        assert_eq!(
            messages,
            vec![
                (0, "Computing stroke areas of participant a".to_string()),
                (1, "Computing stroke areas of participant b".to_string()),
            ]
        );
    }
}
