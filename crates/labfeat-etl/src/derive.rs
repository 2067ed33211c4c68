//! Feature derivation pipeline
//!
//! Pure transformations over in-memory tables: no I/O, no async. Each step
//! consumes tables and produces a new one; the facade wires them together.
//!
//! Derived features, per user:
//! - `experiment_count`: number of experiment rows
//! - `avg_experiment_run_time`: arithmetic mean of run times
//! - `compound_id`: the most commonly experimented compound, with the
//!   all-tied fallback described on `most_common_compounds`

use crate::error::{EtlError, Result};
use labfeat_core::{Table, Value};
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

const USER_ID: &str = "user_id";
const COMPOUND_ID: &str = "compound_id";
const RUN_TIME: &str = "experiment_run_time";
const COMPOUND_IDS: &str = "experiment_compound_ids";

/// Fan out the `;`-delimited compound list of each experiment row into one
/// (user_id, compound_id) link row per token.
///
/// An empty or single-token field still yields one link.
pub fn fan_out_compound_links(experiments: &Table) -> Result<Table> {
    let user_col = experiments.require_column(USER_ID)?;
    let ids_col = experiments.require_column(COMPOUND_IDS)?;

    let mut links = Table::new(vec![USER_ID, COMPOUND_ID]);
    for row in experiments.rows() {
        let user = row[user_col].clone();
        let ids = row[ids_col].key_string();
        for token in ids.split(';') {
            links.push_row(vec![user.clone(), Value::Text(token.to_string())])?;
        }
    }
    Ok(links)
}

/// Feature 1: experiment count per user.
///
/// Users absent from the experiments table are absent here too; the later
/// outer join fills them with null.
pub fn experiment_counts(experiments: &Table) -> Result<Table> {
    let user_col = experiments.require_column(USER_ID)?;

    let mut order: Vec<Value> = Vec::new();
    let mut counts: HashMap<String, i64> = HashMap::new();
    for row in experiments.rows() {
        let key = row[user_col].key_string();
        if !counts.contains_key(&key) {
            order.push(row[user_col].clone());
        }
        *counts.entry(key).or_insert(0) += 1;
    }

    let mut out = Table::new(vec![USER_ID, "experiment_count"]);
    for user in order {
        let count = counts[&user.key_string()];
        out.push_row(vec![user, Value::Int(count)])?;
    }
    Ok(out)
}

/// Feature 2: arithmetic mean of experiment run times per user.
pub fn average_run_times(experiments: &Table) -> Result<Table> {
    let user_col = experiments.require_column(USER_ID)?;
    let time_col = experiments.require_column(RUN_TIME)?;

    let mut order: Vec<Value> = Vec::new();
    let mut sums: HashMap<String, (f64, u64)> = HashMap::new();
    for row in experiments.rows() {
        let run_time = row[time_col].parse_float().ok_or_else(|| {
            EtlError::Derivation(format!(
                "non-numeric {} value: {:?}",
                RUN_TIME,
                row[time_col].key_string()
            ))
        })?;
        let key = row[user_col].key_string();
        if !sums.contains_key(&key) {
            order.push(row[user_col].clone());
        }
        let entry = sums.entry(key).or_insert((0.0, 0));
        entry.0 += run_time;
        entry.1 += 1;
    }

    let mut out = Table::new(vec![USER_ID, "avg_experiment_run_time"]);
    for user in order {
        let (sum, n) = sums[&user.key_string()];
        out.push_row(vec![user, Value::Float(sum / n as f64)])?;
    }
    Ok(out)
}

/// Feature 3: most commonly experimented compound per user.
///
/// Counts (user, compound) link occurrences, then per user:
/// - if the maximum count is 1 (nothing repeats), every distinct compound is
///   emitted as its own row;
/// - otherwise only the winner is emitted: highest count, ties at the same
///   maximum broken by the smallest compound id (numeric when both ids parse
///   as integers, lexicographic otherwise).
///
/// Exact duplicate rows are deduplicated.
pub fn most_common_compounds(links: &Table) -> Result<Table> {
    let user_col = links.require_column(USER_ID)?;
    let compound_col = links.require_column(COMPOUND_ID)?;

    // Per-user compound occurrence counts, both levels in first-seen order.
    let mut user_order: Vec<Value> = Vec::new();
    let mut per_user: HashMap<String, Vec<(Value, i64)>> = HashMap::new();
    for row in links.rows() {
        let user_key = row[user_col].key_string();
        if !per_user.contains_key(&user_key) {
            user_order.push(row[user_col].clone());
        }
        let compounds = per_user.entry(user_key).or_default();
        let compound_key = row[compound_col].key_string();
        match compounds
            .iter_mut()
            .find(|(c, _)| c.key_string() == compound_key)
        {
            Some((_, count)) => *count += 1,
            None => compounds.push((row[compound_col].clone(), 1)),
        }
    }

    let mut out = Table::new(vec![USER_ID, COMPOUND_ID]);
    let mut seen: HashSet<(String, String)> = HashSet::new();
    for user in user_order {
        let compounds = &per_user[&user.key_string()];
        let max = compounds.iter().map(|(_, n)| *n).max().unwrap_or(0);

        let chosen: Vec<&Value> = if max <= 1 {
            // Nothing repeats: every compound is "most common".
            compounds.iter().map(|(c, _)| c).collect()
        } else {
            compounds
                .iter()
                .filter(|(_, n)| *n == max)
                .map(|(c, _)| c)
                .min_by(|a, b| compare_compound_ids(&a.key_string(), &b.key_string()))
                .into_iter()
                .collect()
        };

        for compound in chosen {
            if seen.insert((user.key_string(), compound.key_string())) {
                out.push_row(vec![user.clone(), (*compound).clone()])?;
            }
        }
    }
    Ok(out)
}

/// Total order on compound ids: numeric when both sides parse as integers,
/// lexicographic otherwise.
fn compare_compound_ids(a: &str, b: &str) -> Ordering {
    match (a.parse::<i64>(), b.parse::<i64>()) {
        (Ok(x), Ok(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

/// Full outer join of two tables on a shared key column.
///
/// Left-row order is preserved; a left row matching several right rows is
/// multiplied; right rows whose key never matched are appended after, with
/// null left cells. Null keys never match.
pub fn outer_join(left: &Table, right: &Table, key: &str) -> Result<Table> {
    let left_key = left.require_column(key)?;
    let right_key = right.require_column(key)?;

    let mut columns: Vec<String> = left.columns().to_vec();
    for (idx, name) in right.columns().iter().enumerate() {
        if idx != right_key {
            columns.push(name.clone());
        }
    }

    let mut right_index: HashMap<String, Vec<usize>> = HashMap::new();
    for (idx, row) in right.rows().iter().enumerate() {
        if !row[right_key].is_null() {
            right_index
                .entry(row[right_key].key_string())
                .or_default()
                .push(idx);
        }
    }

    let mut out = Table::new(columns);
    let mut matched: HashSet<usize> = HashSet::new();

    for left_row in left.rows() {
        let key_cell = &left_row[left_key];
        let matches = if key_cell.is_null() {
            None
        } else {
            right_index.get(&key_cell.key_string())
        };
        match matches {
            Some(indices) => {
                for &idx in indices {
                    matched.insert(idx);
                    let mut row = left_row.clone();
                    for (col, cell) in right.rows()[idx].iter().enumerate() {
                        if col != right_key {
                            row.push(cell.clone());
                        }
                    }
                    out.push_row(row)?;
                }
            }
            None => {
                let mut row = left_row.clone();
                row.extend(std::iter::repeat(Value::Null).take(right.n_cols() - 1));
                out.push_row(row)?;
            }
        }
    }

    // Right-only keys: null left side, key cell carried into the left key slot.
    for (idx, right_row) in right.rows().iter().enumerate() {
        if matched.contains(&idx) {
            continue;
        }
        let mut row = vec![Value::Null; left.n_cols()];
        row[left_key] = right_row[right_key].clone();
        for (col, cell) in right_row.iter().enumerate() {
            if col != right_key {
                row.push(cell.clone());
            }
        }
        out.push_row(row)?;
    }

    Ok(out)
}

/// Run the whole pipeline: three raw tables in, one feature table out.
///
/// Output columns: all user columns, `experiment_count`,
/// `avg_experiment_run_time`, `compound_id`, then all compound columns.
pub fn derive_features(users: &Table, compounds: &Table, experiments: &Table) -> Result<Table> {
    let links = fan_out_compound_links(experiments)?;
    let counts = experiment_counts(experiments)?;
    let run_times = average_run_times(experiments)?;
    let common = most_common_compounds(&links)?;

    let with_counts = outer_join(users, &counts, USER_ID)?;
    let with_run_times = outer_join(&with_counts, &run_times, USER_ID)?;
    let common_with_attrs = outer_join(&common, compounds, COMPOUND_ID)?;
    let features = outer_join(&with_run_times, &common_with_attrs, USER_ID)?;

    let features = features
        .coerce_column(USER_ID, Value::coerce_int)?
        .coerce_column(COMPOUND_ID, Value::coerce_int)?
        .coerce_column("signup_date", Value::coerce_timestamp)?;

    tracing::info!(
        "Derived {} feature rows across {} columns",
        features.n_rows(),
        features.n_cols()
    );
    Ok(features)
}
