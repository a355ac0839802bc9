// CSV ingestion and output.
//
// Weight files carry one vector per row, F comma-separated floats; the
// reader tolerates stray spaces and tabs around the separators. Row and
// column counts are declared up front and enforced so a truncated file
// fails loudly instead of shifting every row after it.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use crate::error::{Error, Result};
use crate::topk::UserStats;

fn open(path: &Path) -> Result<BufReader<File>> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
}

/// Dense row-major weight matrix from CSV.
pub fn read_weights_csv(path: &Path, num_rows: usize, num_cols: usize) -> Result<Vec<f64>> {
    let reader = open(path)?;
    let mut weights = Vec::with_capacity(num_rows * num_cols);
    let mut lines = reader.lines();
    for row in 0..num_rows {
        let line = match lines.next() {
            Some(line) => line.map_err(|source| Error::Io {
                path: path.into(),
                source,
            })?,
            None => {
                return Err(Error::Parse {
                    path: path.into(),
                    line: row + 1,
                    msg: format!("expected {num_rows} rows, file ends after {row}"),
                })
            }
        };
        let mut cols = 0;
        for field in line.split(',') {
            let field = field.trim();
            let value: f64 = field.parse().map_err(|_| Error::Parse {
                path: path.into(),
                line: row + 1,
                msg: format!("not a float: {field:?}"),
            })?;
            weights.push(value);
            cols += 1;
        }
        if cols != num_cols {
            return Err(Error::Parse {
                path: path.into(),
                line: row + 1,
                msg: format!("expected {num_cols} columns, found {cols}"),
            });
        }
    }
    Ok(weights)
}

/// One integer per line; blank lines are skipped. Used for the per-user
/// cluster assignment file.
pub fn read_ids_csv(path: &Path, num_rows: usize) -> Result<Vec<u32>> {
    let reader = open(path)?;
    let mut ids = Vec::with_capacity(num_rows);
    for (lineno, line) in reader.lines().enumerate() {
        let line = line.map_err(|source| Error::Io {
            path: path.into(),
            source,
        })?;
        let field = line.trim();
        if field.is_empty() {
            continue;
        }
        let id: u32 = field.parse().map_err(|_| Error::Parse {
            path: path.into(),
            line: lineno + 1,
            msg: format!("not an id: {field:?}"),
        })?;
        ids.push(id);
    }
    if ids.len() != num_rows {
        return Err(Error::Parse {
            path: path.into(),
            line: ids.len(),
            msg: format!("expected {num_rows} ids, found {}", ids.len()),
        });
    }
    Ok(ids)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    File::create(path)
        .map(BufWriter::new)
        .map_err(|source| Error::Io {
            path: path.into(),
            source,
        })
}

/// One row per user, K item ids in descending score order.
pub fn write_top_k_csv(path: &Path, top_k_items: &[i32], k: usize) -> Result<()> {
    let mut w = create(path)?;
    let io_err = |source| Error::Io {
        path: path.into(),
        source,
    };
    for row in top_k_items.chunks(k) {
        let line = row
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(",");
        writeln!(w, "{line}").map_err(io_err)?;
    }
    w.flush().map_err(io_err)
}

pub fn write_user_stats_csv(path: &Path, stats: &[UserStats]) -> Result<()> {
    let mut w = create(path)?;
    let io_err = |source| Error::Io {
        path: path.into(),
        source,
    };
    writeln!(w, "cluster_id,user_id,theta_uc,theta_max,items_visited,user_micros")
        .map_err(io_err)?;
    for s in stats {
        writeln!(
            w,
            "{},{},{},{},{},{}",
            s.cluster_id, s.user_id, s.theta_uc, s.theta_max, s.items_visited, s.user_micros
        )
        .map_err(io_err)?;
    }
    w.flush().map_err(io_err)
}
