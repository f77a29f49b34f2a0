//! Comma-separated drawn points: one header row, then one row per point.
//!
//! ```text
//! x,y,valence,intensity
//! 12,40,-2,3
//! ```

use std::fmt;
use std::io::Write;

use crate::error::{Error, Result};
use crate::model::SensationPoint;

pub const HEADER: &str = "x,y,valence,intensity";

/// Header and rows of `points`, formatted lazily.
struct Rows<'a>(&'a [SensationPoint]);

impl fmt::Display for Rows<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", HEADER)?;
        for p in self.0 {
            writeln!(f, "{},{},{},{}", p.x, p.y, p.valence, p.intensity)?;
        }
        Ok(())
    }
}

pub fn write_points<W: Write + ?Sized>(out: &mut W, points: &[SensationPoint]) -> Result<()> {
    write!(out, "{}", Rows(points))?;
    Ok(())
}

pub fn points_to_string(points: &[SensationPoint]) -> String {
    Rows(points).to_string()
}

fn field<T: std::str::FromStr>(value: Option<&str>, name: &str, line: usize) -> Result<T> {
    let raw = value.ok_or_else(|| Error::Tabular {
        line,
        message: format!("missing column {}", name),
    })?;
    raw.trim().parse().map_err(|_| Error::Tabular {
        line,
        message: format!("invalid {} {:?}", name, raw),
    })
}

/// Parse text produced by [`write_points`]. Blank lines are ignored; line
/// numbers in errors are 1-based.
pub fn parse_points(text: &str) -> Result<Vec<SensationPoint>> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    match lines.next() {
        Some((_, header)) if header.trim() == HEADER => {}
        Some((i, header)) => {
            return Err(Error::Tabular {
                line: i + 1,
                message: format!("unexpected header {:?}", header),
            })
        }
        None => {
            return Err(Error::Tabular {
                line: 1,
                message: "missing header".into(),
            })
        }
    }

    let mut points = Vec::new();
    for (i, row) in lines {
        let line = i + 1;
        let mut cols = row.split(',');
        let x: f64 = field(cols.next(), "x", line)?;
        let y: f64 = field(cols.next(), "y", line)?;
        let valence: i32 = field(cols.next(), "valence", line)?;
        let intensity: u32 = field(cols.next(), "intensity", line)?;
        if cols.next().is_some() {
            return Err(Error::Tabular {
                line,
                message: "too many columns".into(),
            });
        }
        points.push(SensationPoint {
            x,
            y,
            valence,
            intensity,
        });
    }
    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Sensation;

    #[test]
    fn test_write_format() {
        let points = [
            SensationPoint::new(3.0, 4.0, Sensation::new(-2, 1)),
            SensationPoint::new(10.0, 0.0, Sensation::new(0, 5)),
        ];
        assert_eq!(
            points_to_string(&points),
            "x,y,valence,intensity\n3,4,-2,1\n10,0,0,5\n"
        );
    }

    #[test]
    fn test_writer_and_string_agree() {
        let points = [SensationPoint::new(5.0, 6.0, Sensation::new(1, 2))];
        let mut buf = Vec::new();
        write_points(&mut buf, &points).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), points_to_string(&points));
    }

    #[test]
    fn test_parse_written_points() {
        let points = vec![
            SensationPoint::new(1.0, 2.0, Sensation::new(3, 4)),
            SensationPoint::new(7.0, 0.0, Sensation::new(-1, 0)),
        ];
        assert_eq!(parse_points(&points_to_string(&points)).unwrap(), points);
    }

    #[test]
    fn test_header_only() {
        assert!(parse_points("x,y,valence,intensity\n").unwrap().is_empty());
    }

    #[test]
    fn test_parse_errors_report_line() {
        let bad = "x,y,valence,intensity\n1,2,3,4\n\n5,six,7,8\n";
        match parse_points(bad) {
            Err(Error::Tabular { line, .. }) => assert_eq!(line, 4),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(parse_points("a,b\n"), Err(Error::Tabular { line: 1, .. })));
        assert!(matches!(parse_points(""), Err(Error::Tabular { .. })));
        assert!(matches!(
            parse_points("x,y,valence,intensity\n1,2,-3,4\n"),
            Ok(ref p) if p[0].valence == -3
        ));
        assert!(parse_points("x,y,valence,intensity\n1,2,3,-4\n").is_err());
        assert!(parse_points("x,y,valence,intensity\n1,2,3,4,5\n").is_err());
    }
}
