//! Row-wise merging of performance tables from different projects or time
//! windows. Only additive columns are summed; derived columns are recomputed
//! from the merged sums, since merging two ratios directly is wrong
//! (`a1/b1 + a2/b2 != (a1+a2)/(b1+b2)`).

use crate::date_util::max_date;
use crate::error::{Error, Result};
use crate::performance::derive::{derive_ratios, DeriveOptions};
use crate::table::{ColumnKey, MetricTable, Row, UserAttrs};

fn merged_attrs(left: Option<&Row>, right: Option<&Row>) -> UserAttrs {
    let mut attrs = left.map(|r| r.attrs.clone()).unwrap_or_default();
    if let Some(r) = right {
        attrs.user_id = attrs.user_id.or_else(|| r.attrs.user_id.clone());
        attrs.username = attrs.username.or_else(|| r.attrs.username.clone());
        attrs.biography = attrs.biography.or_else(|| r.attrs.biography.clone());
    }
    attrs
}

/// Merges two tables of identical schema: row-key union, additive columns
/// summed, display attributes preferred from the left side,
/// `last_working_date` taken as the max. When the inputs carry derived
/// columns those are recomputed on the merged sums.
///
/// Merging is associative and commutative over the additive columns, so a
/// list of tables may be folded in any order.
pub fn merge(a: &MetricTable, b: &MetricTable, options: &DeriveOptions) -> Result<MetricTable> {
    if !a.same_schema(b) {
        return Err(Error::Schema(
            "tables to merge have different phase or column sets".into(),
        ));
    }

    let additive: Vec<ColumnKey> = a
        .columns()
        .iter()
        .copied()
        .filter(ColumnKey::is_additive)
        .collect();
    let mut merged = MetricTable::new(a.phases(), additive.clone())?;

    let keys = a
        .rows()
        .iter()
        .map(Row::key)
        .chain(b.rows().iter().map(Row::key).filter(|k| a.row(k).is_none()));
    for key in keys {
        let left = a.row(key);
        let right = b.row(key);

        let idx = merged.add_row(key.clone())?;
        {
            let row = merged.row_mut(idx);
            row.attrs = merged_attrs(left, right);
            row.last_working_date = max_date(
                left.and_then(|r| r.last_working_date),
                right.and_then(|r| r.last_working_date),
            );
        }
        for &col in &additive {
            // Missing acts as zero for one-sided rows
            merged.set(idx, col, a.get(key, col) + b.get(key, col))?;
        }
    }

    merged.fill_additive_zero(&additive);
    merged.sort_rows_by(|x, y| x.key().cmp(y.key()));

    if a.columns().iter().any(|c| !c.is_additive()) {
        derive_ratios(&merged, options)
    } else {
        Ok(merged)
    }
}

/// Folds a list of tables pairwise. `None` for an empty list.
pub fn merge_all(tables: &[MetricTable], options: &DeriveOptions) -> Result<Option<MetricTable>> {
    let Some((first, rest)) = tables.split_first() else {
        return Ok(None);
    };
    let mut acc = first.clone();
    for t in rest {
        acc = merge(&acc, t, options)?;
    }
    Ok(Some(acc))
}
