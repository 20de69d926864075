use super::traits::{Frame, StructureFile};
use crate::core::models::atom::Atom;
use crate::core::models::cell::Cell;
use crate::core::models::structure::{AtomicStructure, StructureError};
use nalgebra::{Matrix3, Point3, Vector3};
use std::io::{self, BufRead, Write};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XyzError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("Parse error on line {line}: {kind}")]
    Parse { line: usize, kind: XyzParseErrorKind },
    #[error("Invalid structure: {0}")]
    Structure(#[from] StructureError),
    #[error("Inconsistent data: {0}")]
    Inconsistency(String),
    #[error("File contains no frames")]
    Empty,
}

#[derive(Debug, Error)]
pub enum XyzParseErrorKind {
    #[error("Invalid atom count '{0}'")]
    InvalidAtomCount(String),
    #[error("File ended after {found} of {expected} atom lines")]
    UnexpectedEof { expected: usize, found: usize },
    #[error("Missing comment line")]
    MissingCommentLine,
    #[error("Comment line has no Lattice entry")]
    MissingLattice,
    #[error("Lattice needs 9 numbers (value: '{0}')")]
    InvalidLattice(String),
    #[error("Unsupported Properties entry '{0}'")]
    InvalidProperties(String),
    #[error("Invalid pbc entry '{0}'")]
    InvalidPbc(String),
    #[error("Invalid value for '{key}' (value: '{value}')")]
    InvalidHeaderValue { key: String, value: String },
    #[error("Unterminated quote in comment line")]
    UnterminatedQuote,
    #[error("Expected {expected} columns, found {found}")]
    TooFewColumns { expected: usize, found: usize },
    #[error("Invalid float in column {column} (value: '{value}')")]
    InvalidFloat { column: usize, value: String },
}

/// Extended XYZ: the plain XYZ atom list with a key=value comment line carrying
/// the cell, periodic flags, per-atom column layout and optional energy.
pub struct XyzFile;

/// Where each per-atom quantity lives among the columns of an atom line.
#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    species: usize,
    positions: usize,
    forces: Option<usize>,
    width: usize,
}

impl Default for ColumnLayout {
    fn default() -> Self {
        Self {
            species: 0,
            positions: 1,
            forces: None,
            width: 4,
        }
    }
}

#[derive(Debug, Default)]
struct Header {
    lattice: Option<Matrix3<f64>>,
    pbc: Option<[bool; 3]>,
    energy: Option<f64>,
    layout: ColumnLayout,
}

/// Splits a comment line into key/value pairs; values may be double-quoted.
fn split_key_values(line: &str) -> Result<Vec<(String, String)>, XyzParseErrorKind> {
    let mut pairs = Vec::new();
    let mut chars = line.chars().peekable();
    loop {
        while chars.peek().is_some_and(|c| c.is_whitespace()) {
            chars.next();
        }
        if chars.peek().is_none() {
            break;
        }
        let mut key = String::new();
        while let Some(&c) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                break;
            }
            key.push(c);
            chars.next();
        }
        let mut value = String::new();
        if chars.peek() == Some(&'=') {
            chars.next();
            if chars.peek() == Some(&'"') {
                chars.next();
                let mut closed = false;
                for c in chars.by_ref() {
                    if c == '"' {
                        closed = true;
                        break;
                    }
                    value.push(c);
                }
                if !closed {
                    return Err(XyzParseErrorKind::UnterminatedQuote);
                }
            } else {
                while let Some(&c) = chars.peek() {
                    if c.is_whitespace() {
                        break;
                    }
                    value.push(c);
                    chars.next();
                }
            }
        }
        pairs.push((key, value));
    }
    Ok(pairs)
}

fn parse_properties(value: &str) -> Result<ColumnLayout, XyzParseErrorKind> {
    let invalid = || XyzParseErrorKind::InvalidProperties(value.to_string());
    let fields: Vec<&str> = value.split(':').collect();
    if fields.len() % 3 != 0 {
        return Err(invalid());
    }

    let mut species = None;
    let mut positions = None;
    let mut forces = None;
    let mut column = 0;
    for chunk in fields.chunks(3) {
        let count: usize = chunk[2].parse().map_err(|_| invalid())?;
        match (chunk[0].to_ascii_lowercase().as_str(), chunk[1], count) {
            ("species", "S", 1) => species = Some(column),
            ("pos", "R", 3) => positions = Some(column),
            ("forces" | "force", "R", 3) => forces = Some(column),
            _ => {}
        }
        column += count;
    }
    Ok(ColumnLayout {
        species: species.ok_or_else(invalid)?,
        positions: positions.ok_or_else(invalid)?,
        forces,
        width: column,
    })
}

fn parse_pbc(value: &str) -> Result<[bool; 3], XyzParseErrorKind> {
    let flags: Vec<bool> = value
        .split_whitespace()
        .map(|t| match t {
            "T" | "t" | "True" | "true" | "1" => Ok(true),
            "F" | "f" | "False" | "false" | "0" => Ok(false),
            _ => Err(XyzParseErrorKind::InvalidPbc(value.to_string())),
        })
        .collect::<Result<_, _>>()?;
    flags
        .try_into()
        .map_err(|_| XyzParseErrorKind::InvalidPbc(value.to_string()))
}

fn parse_header(line: &str) -> Result<Header, XyzParseErrorKind> {
    let mut header = Header::default();
    for (key, value) in split_key_values(line)? {
        match key.to_ascii_lowercase().as_str() {
            "lattice" => {
                let numbers: Vec<f64> = value
                    .split_whitespace()
                    .map(|t| t.parse::<f64>())
                    .collect::<Result<_, _>>()
                    .map_err(|_| XyzParseErrorKind::InvalidLattice(value.clone()))?;
                if numbers.len() != 9 {
                    return Err(XyzParseErrorKind::InvalidLattice(value));
                }
                header.lattice = Some(Matrix3::from_row_slice(&numbers));
            }
            "properties" => header.layout = parse_properties(&value)?,
            "pbc" => header.pbc = Some(parse_pbc(&value)?),
            "energy" => {
                header.energy = Some(value.parse().map_err(|_| {
                    XyzParseErrorKind::InvalidHeaderValue {
                        key: key.clone(),
                        value: value.clone(),
                    }
                })?)
            }
            _ => {}
        }
    }
    Ok(header)
}

fn parse_float(columns: &[&str], column: usize) -> Result<f64, XyzParseErrorKind> {
    columns[column]
        .parse()
        .map_err(|_| XyzParseErrorKind::InvalidFloat {
            column: column + 1,
            value: columns[column].to_string(),
        })
}

fn parse_vector(columns: &[&str], start: usize) -> Result<Vector3<f64>, XyzParseErrorKind> {
    Ok(Vector3::new(
        parse_float(columns, start)?,
        parse_float(columns, start + 1)?,
        parse_float(columns, start + 2)?,
    ))
}

/// Reads one frame, or `None` if the input is exhausted before a frame starts.
fn read_frame(
    lines: &mut impl Iterator<Item = io::Result<String>>,
    line_num: &mut usize,
) -> Result<Option<Frame>, XyzError> {
    let parse_err = |line: usize, kind| XyzError::Parse { line, kind };

    let count_line = loop {
        match lines.next() {
            None => return Ok(None),
            Some(line) => {
                *line_num += 1;
                let line = line?;
                if !line.trim().is_empty() {
                    break line;
                }
            }
        }
    };
    let n_atoms: usize = count_line
        .trim()
        .parse()
        .map_err(|_| parse_err(*line_num, XyzParseErrorKind::InvalidAtomCount(count_line.trim().to_string())))?;

    let comment = lines
        .next()
        .ok_or_else(|| parse_err(*line_num + 1, XyzParseErrorKind::MissingCommentLine))??;
    *line_num += 1;
    let header = parse_header(&comment).map_err(|kind| parse_err(*line_num, kind))?;
    let lattice = header
        .lattice
        .ok_or_else(|| parse_err(*line_num, XyzParseErrorKind::MissingLattice))?;
    let cell = Cell::new(lattice, header.pbc.unwrap_or([true; 3]))?;
    let layout = header.layout;

    let mut atoms = Vec::with_capacity(n_atoms);
    let mut forces = layout.forces.map(|_| Vec::with_capacity(n_atoms));
    for found in 0..n_atoms {
        let line = lines
            .next()
            .ok_or_else(|| {
                parse_err(
                    *line_num + 1,
                    XyzParseErrorKind::UnexpectedEof {
                        expected: n_atoms,
                        found,
                    },
                )
            })??;
        *line_num += 1;
        let columns: Vec<&str> = line.split_whitespace().collect();
        if columns.len() < layout.width {
            return Err(parse_err(
                *line_num,
                XyzParseErrorKind::TooFewColumns {
                    expected: layout.width,
                    found: columns.len(),
                },
            ));
        }
        let position = parse_vector(&columns, layout.positions).map_err(|k| parse_err(*line_num, k))?;
        atoms.push(Atom::new(columns[layout.species], Point3::from(position)));
        if let (Some(start), Some(forces)) = (layout.forces, forces.as_mut()) {
            forces.push(parse_vector(&columns, start).map_err(|k| parse_err(*line_num, k))?);
        }
    }

    Ok(Some(Frame {
        structure: AtomicStructure::new(atoms, cell),
        energy: header.energy,
        forces,
    }))
}

fn flag(b: bool) -> char {
    if b { 'T' } else { 'F' }
}

impl StructureFile for XyzFile {
    type Error = XyzError;

    fn read_from(reader: &mut impl BufRead) -> Result<Frame, Self::Error> {
        let mut line_num = 0;
        read_frame(&mut reader.lines(), &mut line_num)?.ok_or(XyzError::Empty)
    }

    fn read_all(reader: &mut impl BufRead) -> Result<Vec<Frame>, Self::Error> {
        let mut lines = reader.lines();
        let mut line_num = 0;
        let mut frames = Vec::new();
        while let Some(frame) = read_frame(&mut lines, &mut line_num)? {
            frames.push(frame);
        }
        Ok(frames)
    }

    fn write_to(frame: &Frame, writer: &mut impl Write) -> Result<(), Self::Error> {
        let structure = &frame.structure;
        if let Some(forces) = &frame.forces {
            if forces.len() != structure.len() {
                return Err(XyzError::Inconsistency(format!(
                    "{} forces for {} atoms",
                    forces.len(),
                    structure.len()
                )));
            }
        }

        let m = structure.cell().matrix();
        let lattice: Vec<String> = (0..3)
            .flat_map(|r| (0..3).map(move |c| (r, c)))
            .map(|(r, c)| m[(r, c)].to_string())
            .collect();
        let pbc = structure.cell().pbc();
        let properties = if frame.forces.is_some() {
            "species:S:1:pos:R:3:forces:R:3"
        } else {
            "species:S:1:pos:R:3"
        };

        writeln!(writer, "{}", structure.len())?;
        write!(writer, "Lattice=\"{}\" Properties={}", lattice.join(" "), properties)?;
        if let Some(energy) = frame.energy {
            write!(writer, " energy={}", energy)?;
        }
        writeln!(writer, " pbc=\"{} {} {}\"", flag(pbc[0]), flag(pbc[1]), flag(pbc[2]))?;

        for (i, atom) in structure.atoms().iter().enumerate() {
            let p = &atom.position;
            write!(writer, "{:<2} {} {} {}", atom.symbol, p.x, p.y, p.z)?;
            if let Some(forces) = &frame.forces {
                let f = &forces[i];
                write!(writer, " {} {} {}", f.x, f.y, f.z)?;
            }
            writeln!(writer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn sample() -> AtomicStructure {
        let cell = Cell::from_vectors(
            Vector3::new(5.544, 0.0, 0.0),
            Vector3::new(2.772, 4.801247, 0.0),
            Vector3::new(0.0, 0.0, 26.79),
            [true, true, false],
        )
        .unwrap();
        AtomicStructure::new(
            vec![
                Atom::new("Pt", Point3::new(0.1 + 0.2, 1.0 / 3.0, 10.0)),
                Atom::new("C", Point3::new(2.772, 1.600415, 14.1234567890123)),
            ],
            cell,
        )
    }

    fn write_string(frame: &Frame) -> String {
        let mut buf = Vec::new();
        XyzFile::write_to(frame, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn written_frame_reads_back_bit_for_bit() {
        let frame = Frame::new(sample())
            .with_energy(-123.456789012345)
            .with_forces(vec![Vector3::new(0.0, -0.01, 0.5), Vector3::new(1e-17, 0.0, -2.0)]);
        let text = write_string(&frame);
        let back = XyzFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(back, frame);
    }

    #[test]
    fn header_line_carries_lattice_pbc_and_energy() {
        let text = write_string(&Frame::new(sample()).with_energy(-1.5));
        let header = text.lines().nth(1).unwrap();
        assert!(header.starts_with("Lattice=\"5.544 0 0 2.772 4.801247 0 0 0 26.79\""));
        assert!(header.contains("Properties=species:S:1:pos:R:3 "));
        assert!(header.contains("energy=-1.5"));
        assert!(header.ends_with("pbc=\"T T F\""));
    }

    #[test]
    fn reads_multiple_frames_in_order() {
        let a = Frame::new(sample()).with_energy(-1.0);
        let b = Frame::new(sample().translated(&Vector3::new(0.0, 0.0, 0.5))).with_energy(-2.0);
        let text = format!("{}{}", write_string(&a), write_string(&b));
        let frames = XyzFile::read_all(&mut Cursor::new(text)).unwrap();
        assert_eq!(frames, vec![a, b]);
    }

    #[test]
    fn extra_columns_and_unknown_keys_are_tolerated() {
        let text = "\
1
Lattice=\"10 0 0 0 10 0 0 0 10\" Properties=species:S:1:pos:R:3:tags:I:1 config_type=slab pbc=\"F F F\"
O 1.0 2.0 3.0 7
";
        let frame = XyzFile::read_from(&mut Cursor::new(text)).unwrap();
        assert_eq!(frame.structure.atoms()[0].position, Point3::new(1.0, 2.0, 3.0));
        assert_eq!(frame.structure.cell().pbc(), [false; 3]);
        assert!(frame.energy.is_none());
    }

    #[test]
    fn missing_lattice_is_rejected() {
        let text = "1\nProperties=species:S:1:pos:R:3\nO 0 0 0\n";
        assert!(matches!(
            XyzFile::read_from(&mut Cursor::new(text)),
            Err(XyzError::Parse {
                line: 2,
                kind: XyzParseErrorKind::MissingLattice
            })
        ));
    }

    #[test]
    fn truncated_atom_block_reports_progress() {
        let text = "3\nLattice=\"1 0 0 0 1 0 0 0 1\"\nH 0 0 0\n";
        match XyzFile::read_from(&mut Cursor::new(text)) {
            Err(XyzError::Parse {
                kind: XyzParseErrorKind::UnexpectedEof { expected, found },
                ..
            }) => {
                assert_eq!(expected, 3);
                assert_eq!(found, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn bad_float_reports_line_and_column() {
        let text = "1\nLattice=\"1 0 0 0 1 0 0 0 1\"\nH 0 zero 0\n";
        assert!(matches!(
            XyzFile::read_from(&mut Cursor::new(text)),
            Err(XyzError::Parse {
                line: 3,
                kind: XyzParseErrorKind::InvalidFloat { column: 3, .. }
            })
        ));
    }

    #[test]
    fn empty_input_has_no_frames() {
        assert!(matches!(XyzFile::read_from(&mut Cursor::new("")), Err(XyzError::Empty)));
        assert!(XyzFile::read_all(&mut Cursor::new("\n\n")).unwrap().is_empty());
    }
}
