//! Survey data model: points, sensations, strokes and drawings.
//!
//! The serde field names follow the JSON emitted by the survey front end
//! (`imgWidth`, `brushSize`, `FemaleFront`, ...), so exported survey files
//! deserialize directly into these types.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::basics::PointD;
use crate::error::Error;
use crate::sensation_map::SensationPixelMap;

/// A plane coordinate as recorded by the drawing canvas.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

impl From<Point> for PointD {
    fn from(p: Point) -> Self {
        PointD::new(p.x, p.y)
    }
}

/// What a participant felt: a signed valence and an unsigned intensity.
///
/// Both are whole numbers on the survey's rating scales. Stroke JSON may
/// carry them as `2` or `2.0`; a fractional value such as `1.5` is rejected
/// when the survey is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub struct Sensation {
    pub valence: i32,
    pub intensity: u32,
}

impl Sensation {
    pub fn new(valence: i32, intensity: u32) -> Self {
        Self { valence, intensity }
    }
}

impl fmt::Display for Sensation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.valence, self.intensity)
    }
}

/// One labeled point. Drawn pixels carry integral coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensationPoint {
    pub x: f64,
    pub y: f64,
    pub valence: i32,
    pub intensity: u32,
}

impl SensationPoint {
    pub fn new(x: f64, y: f64, sensation: Sensation) -> Self {
        Self {
            x,
            y,
            valence: sensation.valence,
            intensity: sensation.intensity,
        }
    }

    pub fn sensation(&self) -> Sensation {
        Sensation::new(self.valence, self.intensity)
    }
}

/// A freehand stroke: ordered points drawn with one brush and one sensation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub points: Vec<Point>,
    #[serde(default)]
    pub brush_color: String,
    pub brush_size: f64,
    #[serde(deserialize_with = "whole_number")]
    pub valence: i32,
    #[serde(deserialize_with = "whole_number")]
    pub intensity: u32,
}

/// A rating that must be integral, whether written as an integer or a float.
fn whole_number<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: TryFrom<i64>,
{
    let v = f64::deserialize(deserializer)?;
    if v.fract() != 0.0 || !v.is_finite() {
        return Err(D::Error::custom(format!("rating {} is not a whole number", v)));
    }
    T::try_from(v as i64).map_err(|_| D::Error::custom(format!("rating {} is out of range", v)))
}

impl Stroke {
    pub fn new(points: Vec<Point>, brush_size: f64, sensation: Sensation) -> Self {
        Self {
            points,
            brush_color: String::from("#000000"),
            brush_size,
            valence: sensation.valence,
            intensity: sensation.intensity,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.brush_color = color.into();
        self
    }

    pub fn sensation(&self) -> Sensation {
        Sensation::new(self.valence, self.intensity)
    }

    /// The same stroke at display scale: points and brush size are multiplied.
    pub fn scaled(&self, scale_factor: f64) -> Stroke {
        Stroke {
            points: crate::stroke_path::scale_points(&self.points, scale_factor),
            brush_size: self.brush_size * scale_factor,
            ..self.clone()
        }
    }
}

/// Figure template a participant drew on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Persona {
    Female,
    Male,
}

impl fmt::Display for Persona {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Persona::Female => "Female",
            Persona::Male => "Male",
        })
    }
}

/// One drawable view of a persona.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AnatomicalSide {
    FemaleFront,
    FemaleBack,
    MaleFront,
    MaleBack,
}

impl AnatomicalSide {
    pub const ALL: [AnatomicalSide; 4] = [
        AnatomicalSide::FemaleFront,
        AnatomicalSide::FemaleBack,
        AnatomicalSide::MaleFront,
        AnatomicalSide::MaleBack,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AnatomicalSide::FemaleFront => "FemaleFront",
            AnatomicalSide::FemaleBack => "FemaleBack",
            AnatomicalSide::MaleFront => "MaleFront",
            AnatomicalSide::MaleBack => "MaleBack",
        }
    }

    pub fn persona(&self) -> Persona {
        match self {
            AnatomicalSide::FemaleFront | AnatomicalSide::FemaleBack => Persona::Female,
            AnatomicalSide::MaleFront | AnatomicalSide::MaleBack => Persona::Male,
        }
    }
}

impl fmt::Display for AnatomicalSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnatomicalSide {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        AnatomicalSide::ALL
            .into_iter()
            .find(|side| side.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::UnknownSide(s.to_string()))
    }
}

/// One anatomical view drawn by one participant.
///
/// The sensation map and drawn-point list are derived caches: absent until
/// computed, dropped whenever the strokes change.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonaDrawing {
    pub img_width: u32,
    pub img_height: u32,
    #[serde(default = "default_scale_factor")]
    pub scale_factor: f64,
    strokes: Vec<Stroke>,
    #[serde(skip)]
    sensation_pixel_map: Option<SensationPixelMap>,
    #[serde(skip)]
    drawn_points: Option<Vec<SensationPoint>>,
}

fn default_scale_factor() -> f64 {
    1.0
}

impl PersonaDrawing {
    pub fn new(img_width: u32, img_height: u32) -> Self {
        Self {
            img_width,
            img_height,
            scale_factor: 1.0,
            strokes: Vec::new(),
            sensation_pixel_map: None,
            drawn_points: None,
        }
    }

    pub fn with_strokes(mut self, strokes: Vec<Stroke>) -> Self {
        self.set_strokes(strokes);
        self
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn push_stroke(&mut self, stroke: Stroke) {
        self.strokes.push(stroke);
        self.invalidate();
    }

    pub fn set_strokes(&mut self, strokes: Vec<Stroke>) {
        self.strokes = strokes;
        self.invalidate();
    }

    /// Drop both derived caches.
    pub fn invalidate(&mut self) {
        self.sensation_pixel_map = None;
        self.drawn_points = None;
    }

    pub fn is_computed(&self) -> bool {
        self.sensation_pixel_map.is_some() && self.drawn_points.is_some()
    }

    pub fn sensation_pixel_map(&self) -> Option<&SensationPixelMap> {
        self.sensation_pixel_map.as_ref()
    }

    pub fn drawn_points(&self) -> Option<&[SensationPoint]> {
        self.drawn_points.as_deref()
    }

    pub(crate) fn store_derived(&mut self, map: SensationPixelMap, points: Vec<SensationPoint>) {
        self.sensation_pixel_map = Some(map);
        self.drawn_points = Some(points);
    }
}

/// The sides a participant drew, each with its drawing.
///
/// `null` sides in survey JSON are treated as not drawn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "BTreeMap<AnatomicalSide, Option<PersonaDrawing>>")]
pub struct Drawing(BTreeMap<AnatomicalSide, PersonaDrawing>);

impl From<BTreeMap<AnatomicalSide, Option<PersonaDrawing>>> for Drawing {
    fn from(sides: BTreeMap<AnatomicalSide, Option<PersonaDrawing>>) -> Self {
        Drawing(
            sides
                .into_iter()
                .filter_map(|(side, d)| d.map(|d| (side, d)))
                .collect(),
        )
    }
}

impl Drawing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_side(mut self, side: AnatomicalSide, drawing: PersonaDrawing) -> Self {
        self.insert(side, drawing);
        self
    }

    pub fn insert(&mut self, side: AnatomicalSide, drawing: PersonaDrawing) {
        self.0.insert(side, drawing);
    }

    pub fn get(&self, side: AnatomicalSide) -> Option<&PersonaDrawing> {
        self.0.get(&side)
    }

    pub fn get_mut(&mut self, side: AnatomicalSide) -> Option<&mut PersonaDrawing> {
        self.0.get_mut(&side)
    }

    pub fn sides(&self) -> impl Iterator<Item = AnatomicalSide> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (AnatomicalSide, &PersonaDrawing)> {
        self.0.iter().map(|(s, d)| (*s, d))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (AnatomicalSide, &mut PersonaDrawing)> {
        self.0.iter_mut().map(|(s, d)| (*s, d))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// A drawing on any female side belongs to the female persona; everything
    /// else (including an empty drawing) to the male one.
    pub fn persona(&self) -> Persona {
        if self.sides().any(|s| s.persona() == Persona::Female) {
            Persona::Female
        } else {
            Persona::Male
        }
    }
}
