//! Text formats for models, signals and recorded solutions.
//!
//! All files are comma-separated rows of numbers. Blank lines are skipped,
//! line numbers in errors refer to the physical line in the file.
//!
//! A model file holds five rows:
//!
//! ```text
//! L, H, Q
//! alpha
//! W[0,0], ..., W[0,L-1], W[1,0], ..., W[H-1,L-1]
//! C[0,0], ..., C[0,Q-1], C[1,0], ..., C[H-1,Q-1]
//! offset
//! ```
//!
//! A signal file holds two rows of equal length: input, then output.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use math_audio_metaheuristics::RecordedSolution;
use ndarray::Array1;

use crate::error::{LvnError, Result};
use crate::network::{LvnParameters, LvnStructure};

/// An input signal and the matching output of a system.
#[derive(Debug, Clone, PartialEq)]
pub struct Signals {
    /// Excitation.
    pub input: Array1<f64>,
    /// Response.
    pub output: Array1<f64>,
}

impl Signals {
    /// Pairs `input` with `output`.
    ///
    /// # Errors
    ///
    /// `LengthMismatch` if the lengths differ.
    pub fn new(input: Array1<f64>, output: Array1<f64>) -> Result<Self> {
        if input.len() != output.len() {
            return Err(LvnError::LengthMismatch {
                expected: input.len(),
                got: output.len(),
            });
        }
        Ok(Self { input, output })
    }

    /// Number of samples.
    pub fn len(&self) -> usize {
        self.input.len()
    }

    /// Whether there are no samples.
    pub fn is_empty(&self) -> bool {
        self.input.is_empty()
    }
}

/// Non-blank rows as `(line number, values)`.
fn read_rows<R: BufRead>(reader: R) -> Result<Vec<(usize, Vec<f64>)>> {
    let mut rows = Vec::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let values = line
            .split(',')
            .map(|field| {
                let field = field.trim();
                field
                    .parse::<f64>()
                    .map_err(|e| LvnError::parse(i + 1, format!("`{field}`: {e}")))
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push((i + 1, values));
    }
    Ok(rows)
}

fn write_row<W: Write>(writer: &mut W, values: impl IntoIterator<Item = f64>) -> Result<()> {
    let mut first = true;
    for v in values {
        if !first {
            write!(writer, ",")?;
        }
        // Display prints the shortest string that reads back to the same f64
        write!(writer, "{v}")?;
        first = false;
    }
    writeln!(writer)?;
    Ok(())
}

fn dimension(line: usize, value: f64) -> Result<usize> {
    if value >= 1.0 && value.fract() == 0.0 && value.is_finite() {
        Ok(value as usize)
    } else {
        Err(LvnError::parse(
            line,
            format!("dimension must be a positive integer, got {value}"),
        ))
    }
}

fn expect_count(line: usize, what: &str, values: &[f64], expected: usize) -> Result<()> {
    if values.len() != expected {
        return Err(LvnError::parse(
            line,
            format!("{what}: expected {expected} values, got {}", values.len()),
        ));
    }
    Ok(())
}

/// Reads a model. The file does not store the sampling interval, so it is
/// given by the caller.
pub fn read_model<R: BufRead>(
    reader: R,
    sampling_interval: f64,
) -> Result<(LvnStructure, LvnParameters)> {
    let rows = read_rows(reader)?;
    if rows.len() != 5 {
        let line = rows.last().map_or(0, |(line, _)| *line);
        return Err(LvnError::parse(
            line,
            format!("model needs 5 rows, found {}", rows.len()),
        ));
    }
    let (line, dims) = &rows[0];
    expect_count(*line, "structure", dims, 3)?;
    let structure = LvnStructure::new(
        dimension(*line, dims[0])?,
        dimension(*line, dims[1])?,
        dimension(*line, dims[2])?,
        sampling_interval,
    )?;
    let (h, l, q) = (
        structure.hidden_units,
        structure.filter_order,
        structure.polynomial_order,
    );

    let (line, alpha) = &rows[1];
    expect_count(*line, "alpha", alpha, 1)?;
    let (line, weights) = &rows[2];
    expect_count(*line, "weights", weights, h * l)?;
    let (line, coefficients) = &rows[3];
    expect_count(*line, "coefficients", coefficients, h * q)?;
    let (line, offset) = &rows[4];
    expect_count(*line, "offset", offset, 1)?;

    let params =
        LvnParameters::from_slices(&structure, alpha[0], weights, coefficients, offset[0])?;
    params.validate(&structure)?;
    Ok((structure, params))
}

/// Writes a model in the five-row format.
pub fn write_model<W: Write>(
    mut writer: W,
    structure: &LvnStructure,
    params: &LvnParameters,
) -> Result<()> {
    params.validate(structure)?;
    write_row(
        &mut writer,
        [
            structure.filter_order as f64,
            structure.hidden_units as f64,
            structure.polynomial_order as f64,
        ],
    )?;
    write_row(&mut writer, [params.alpha])?;
    write_row(&mut writer, params.weights.iter().copied())?;
    write_row(&mut writer, params.coefficients.iter().copied())?;
    write_row(&mut writer, [params.offset])?;
    writer.flush()?;
    Ok(())
}

/// Reads a model file.
pub fn load_model(
    path: impl AsRef<Path>,
    sampling_interval: f64,
) -> Result<(LvnStructure, LvnParameters)> {
    read_model(BufReader::new(File::open(path)?), sampling_interval)
}

/// Writes a model file, replacing any existing one.
pub fn save_model(
    path: impl AsRef<Path>,
    structure: &LvnStructure,
    params: &LvnParameters,
) -> Result<()> {
    write_model(BufWriter::new(File::create(path)?), structure, params)
}

/// Reads an input/output pair.
pub fn read_signals<R: BufRead>(reader: R) -> Result<Signals> {
    let mut rows = read_rows(reader)?;
    if rows.len() != 2 {
        let line = rows.last().map_or(0, |(line, _)| *line);
        return Err(LvnError::parse(
            line,
            format!("signal file needs 2 rows, found {}", rows.len()),
        ));
    }
    let (_, output) = rows.remove(1);
    let (_, input) = rows.remove(0);
    Signals::new(Array1::from(input), Array1::from(output))
}

/// Writes an input/output pair as two rows.
pub fn write_signals<W: Write>(mut writer: W, signals: &Signals) -> Result<()> {
    write_row(&mut writer, signals.input.iter().copied())?;
    write_row(&mut writer, signals.output.iter().copied())?;
    writer.flush()?;
    Ok(())
}

/// Reads a signal file.
pub fn load_signals(path: impl AsRef<Path>) -> Result<Signals> {
    read_signals(BufReader::new(File::open(path)?))
}

/// Writes a signal file, replacing any existing one.
pub fn save_signals(path: impl AsRef<Path>, signals: &Signals) -> Result<()> {
    write_signals(BufWriter::new(File::create(path)?), signals)
}

/// Writes one row per recorded solution: evaluations, iteration, cost, then
/// the candidate vector. The first line is a header.
pub fn write_recorded<W: Write>(mut writer: W, recorded: &[RecordedSolution]) -> Result<()> {
    let dimensions = recorded.first().map_or(0, |r| r.solution.variables.len());
    write!(writer, "evaluations,iteration,cost")?;
    for i in 0..dimensions {
        write!(writer, ",x{i}")?;
    }
    writeln!(writer)?;
    for r in recorded {
        write!(writer, "{},{},{}", r.evaluations, r.iteration, r.solution.cost)?;
        for v in &r.solution.variables {
            write!(writer, ",{v}")?;
        }
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Writes recorded solutions to a file, replacing any existing one.
pub fn save_recorded(path: impl AsRef<Path>, recorded: &[RecordedSolution]) -> Result<()> {
    write_recorded(BufWriter::new(File::create(path)?), recorded)
}
