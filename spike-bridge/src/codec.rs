//! Line-oriented text artifacts exchanged with the simulator.
//!
//! Spike artifact (time axis):
//! ```text
//! # Array shape: (T, B, F)
//! <B lines of F space-separated 0/1>   \
//! # New slice                          / repeated T times
//! ```
//! With [`SliceAxis::Sample`] the header reads `(B, T, F)` and each block holds
//! one sample's T timesteps instead.
//!
//! Targets artifact: one integer label per line. Result artifact: comma-separated
//! numeric rows, no header.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use spike_core::{Label, ResultMatrix, SpikeTensor};
use tracing::debug;

use crate::config::SliceAxis;
use crate::error::{BridgeError, BridgeResult};

const HEADER_PREFIX: &str = "# Array shape:";
const SLICE_DELIMITER: &str = "# New slice";

fn row_line(out: &mut impl Write, row: &[u8]) -> io::Result<()> {
    let mut first = true;
    for &v in row {
        if !first {
            out.write_all(b" ")?;
        }
        write!(out, "{}", v)?;
        first = false;
    }
    out.write_all(b"\n")
}

pub fn write_spikes<W: Write>(out: &mut W, tensor: &SpikeTensor, axis: SliceAxis) -> io::Result<()> {
    let (steps, samples, features) = tensor.shape();
    match axis {
        SliceAxis::Time => {
            writeln!(out, "{} ({}, {}, {})", HEADER_PREFIX, steps, samples, features)?;
            for t in 0..steps {
                for b in 0..samples {
                    row_line(out, tensor.row(t, b))?;
                }
                writeln!(out, "{}", SLICE_DELIMITER)?;
            }
        }
        SliceAxis::Sample => {
            writeln!(out, "{} ({}, {}, {})", HEADER_PREFIX, samples, steps, features)?;
            for b in 0..samples {
                for t in 0..steps {
                    row_line(out, tensor.row(t, b))?;
                }
                writeln!(out, "{}", SLICE_DELIMITER)?;
            }
        }
    }
    Ok(())
}

pub fn write_labels<W: Write>(out: &mut W, labels: &[Label]) -> io::Result<()> {
    for label in labels {
        writeln!(out, "{}", label)?;
    }
    Ok(())
}

fn save_with<F>(path: &Path, write: F) -> BridgeResult<()>
where
    F: FnOnce(&mut BufWriter<File>) -> io::Result<()>,
{
    let file = File::create(path).map_err(|e| BridgeError::io(path, e))?;
    let mut out = BufWriter::new(file);
    write(&mut out)
        .and_then(|_| out.flush())
        .map_err(|e| BridgeError::io(path, e))
}

/// Write the spike artifact to `path`, replacing any previous content.
pub fn save_spikes(path: &Path, tensor: &SpikeTensor, axis: SliceAxis) -> BridgeResult<()> {
    save_with(path, |out| write_spikes(out, tensor, axis))?;
    debug!(path = %path.display(), shape = ?tensor.shape(), ?axis, "wrote spike artifact");
    Ok(())
}

pub fn save_labels(path: &Path, labels: &[Label]) -> BridgeResult<()> {
    save_with(path, |out| write_labels(out, labels))?;
    debug!(path = %path.display(), count = labels.len(), "wrote targets artifact");
    Ok(())
}

fn read_text(path: &Path) -> BridgeResult<String> {
    fs::read_to_string(path).map_err(|e| BridgeError::io(path, e))
}

/// Non-blank lines with their 1-based line numbers.
fn content_lines(text: &str) -> impl Iterator<Item = (usize, &str)> {
    text.lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim()))
        .filter(|(_, l)| !l.is_empty())
}

/// Parse a comma-separated result artifact. `path` is only used for error context.
pub fn parse_result_matrix(text: &str, path: &Path) -> BridgeResult<ResultMatrix> {
    let mut rows: Vec<Vec<f64>> = Vec::new();
    for (line_no, line) in content_lines(text) {
        let mut row = Vec::with_capacity(rows.first().map_or(0, |r| r.len()));
        for token in line.split(',').map(str::trim) {
            let value: f64 = token.parse().map_err(|_| {
                BridgeError::format(path, line_no, format!("{:?} is not a number", token))
            })?;
            if !value.is_finite() {
                return Err(BridgeError::format(path, line_no, format!("{:?} is not finite", token)));
            }
            row.push(value);
        }
        if let Some(first) = rows.first() {
            if row.len() != first.len() {
                return Err(BridgeError::format(
                    path,
                    line_no,
                    format!("expected {} columns, got {}", first.len(), row.len()),
                ));
            }
        }
        rows.push(row);
    }
    if rows.is_empty() {
        return Err(BridgeError::format(path, 0, "result artifact is empty"));
    }
    Ok(ResultMatrix::from_rows(rows)?)
}

pub fn load_result_matrix(path: &Path) -> BridgeResult<ResultMatrix> {
    let matrix = parse_result_matrix(&read_text(path)?, path)?;
    debug!(path = %path.display(), rows = matrix.rows(), cols = matrix.cols(), "read result artifact");
    Ok(matrix)
}

pub fn parse_labels(text: &str, path: &Path) -> BridgeResult<Vec<Label>> {
    content_lines(text)
        .map(|(line_no, line)| {
            line.parse::<Label>().map_err(|_| {
                BridgeError::format(path, line_no, format!("{:?} is not a class label", line))
            })
        })
        .collect()
}

pub fn load_labels(path: &Path) -> BridgeResult<Vec<Label>> {
    parse_labels(&read_text(path)?, path)
}

fn parse_header(line: &str) -> Option<(usize, usize, usize)> {
    let dims = line
        .strip_prefix(HEADER_PREFIX)?
        .trim()
        .strip_prefix('(')?
        .strip_suffix(')')?;
    let dims: Vec<usize> = dims
        .split(',')
        .map(|d| d.trim().parse().ok())
        .collect::<Option<_>>()?;
    match dims.as_slice() {
        &[a, b, c] => Some((a, b, c)),
        _ => None,
    }
}

/// Read a spike artifact back into a time-major tensor.
pub fn parse_spikes(text: &str, path: &Path, axis: SliceAxis) -> BridgeResult<SpikeTensor> {
    let mut lines = content_lines(text);

    let (header_no, header) = lines
        .next()
        .ok_or_else(|| BridgeError::format(path, 0, "spike artifact is empty"))?;
    let (blocks, rows, features) = parse_header(header).ok_or_else(|| {
        BridgeError::format(path, header_no, format!("expected `{} (d0, d1, d2)`", HEADER_PREFIX))
    })?;
    let (steps, samples) = match axis {
        SliceAxis::Time => (blocks, rows),
        SliceAxis::Sample => (rows, blocks),
    };

    // every cell takes at least one byte of text
    let total = blocks
        .checked_mul(rows)
        .and_then(|n| n.checked_mul(features))
        .filter(|&n| n <= text.len())
        .ok_or_else(|| {
            BridgeError::format(
                path,
                header_no,
                format!("shape ({}, {}, {}) is larger than the artifact", blocks, rows, features),
            )
        })?;

    let mut cells = vec![0u8; total];
    let mut last_line = header_no;
    for block in 0..blocks {
        for r in 0..rows {
            let (line_no, line) = lines.next().ok_or_else(|| {
                BridgeError::format(path, last_line, format!("block {} ends after {} of {} rows", block, r, rows))
            })?;
            last_line = line_no;

            let (t, b) = match axis {
                SliceAxis::Time => (block, r),
                SliceAxis::Sample => (r, block),
            };
            let start = (t * samples + b) * features;
            let mut count = 0;
            for token in line.split_whitespace() {
                let cell = match token {
                    "0" => 0,
                    "1" => 1,
                    _ => {
                        return Err(BridgeError::format(
                            path,
                            line_no,
                            format!("spike value {:?} is not 0 or 1", token),
                        ))
                    }
                };
                if count < features {
                    cells[start + count] = cell;
                }
                count += 1;
            }
            if count != features {
                return Err(BridgeError::format(
                    path,
                    line_no,
                    format!("expected {} values, got {}", features, count),
                ));
            }
        }
        match lines.next() {
            Some((line_no, SLICE_DELIMITER)) => last_line = line_no,
            Some((line_no, other)) => {
                return Err(BridgeError::format(
                    path,
                    line_no,
                    format!("expected `{}`, got {:?}", SLICE_DELIMITER, other),
                ))
            }
            None => return Err(BridgeError::format(path, last_line, "missing final slice delimiter")),
        }
    }
    if let Some((line_no, _)) = lines.next() {
        return Err(BridgeError::format(path, line_no, "unexpected content after the last slice"));
    }

    Ok(SpikeTensor::from_cells(steps, samples, features, cells)?)
}

pub fn load_spikes(path: &Path, axis: SliceAxis) -> BridgeResult<SpikeTensor> {
    parse_spikes(&read_text(path)?, path, axis)
}
