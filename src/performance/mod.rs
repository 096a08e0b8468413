//! Per-user productivity and quality aggregation: the direct pivot from raw
//! records into an additive [`MetricTable`], plus ratio derivation, merging
//! and whole-project summarization of such tables.

pub mod derive;
pub mod merge;
pub mod summary;

pub use derive::{derive_ratios, DeriveOptions};
pub use merge::{merge, merge_all};
pub use summary::summarize;

use std::collections::BTreeSet;

use crate::date_util::max_date;
use crate::error::Result;
use crate::records::{ActualWorktimeRecord, DailyWorktimeRecord, TaskWorktimeRecord, UserRecord};
use crate::table::{layout, Cell, ColumnKey, Metric, MetricTable, Phase, RowKey};

/// Phases actually present in the input records. Annotation is always
/// included so the zero-time ratio policy has a target column.
fn present_phases(
    task_worktimes: &[TaskWorktimeRecord],
    daily_worktimes: &[DailyWorktimeRecord],
) -> Vec<Phase> {
    let mut set = BTreeSet::new();
    set.insert(Phase::Annotation);
    set.extend(task_worktimes.iter().map(|r| r.phase));
    set.extend(daily_worktimes.iter().map(|r| r.phase));
    Phase::ALL.into_iter().filter(|p| set.contains(p)).collect()
}

fn ensure_row(table: &mut MetricTable, account_id: &str) -> Result<usize> {
    let key = RowKey::Account(account_id.to_string());
    match table.index_of(&key) {
        Some(i) => Ok(i),
        None => table.add_row(key),
    }
}

/// Builds the per-user additive table from raw records. The result has every
/// additive column defined (zero-filled) for every row; derived columns are
/// added by [`derive_ratios`].
///
/// Rows exist for every roster user and for every account that appears in
/// the records; display attributes come from the roster.
pub fn build_user_performance(
    task_worktimes: &[TaskWorktimeRecord],
    daily_worktimes: &[DailyWorktimeRecord],
    actual_worktimes: &[ActualWorktimeRecord],
    users: &[UserRecord],
) -> Result<MetricTable> {
    let phases = present_phases(task_worktimes, daily_worktimes);
    let columns = layout::additive_columns(&phases);
    let mut table = MetricTable::new(&phases, columns.clone())?;

    for user in users {
        let idx = ensure_row(&mut table, &user.account_id)?;
        let row = table.row_mut(idx);
        row.attrs.user_id = Some(user.user_id.clone());
        row.attrs.username = Some(user.username.clone());
        row.attrs.biography = user.biography.clone();
    }

    for rec in task_worktimes {
        let idx = ensure_row(&mut table, &rec.account_id)?;
        let p = rec.phase;
        table.add(
            idx,
            ColumnKey::phase(Metric::MonitoredWorktimeHour, p),
            Cell::Number(rec.worktime_hour),
        )?;
        table.add(
            idx,
            ColumnKey::sum(Metric::MonitoredWorktimeHour),
            Cell::Number(rec.worktime_hour),
        )?;
        table.add(
            idx,
            ColumnKey::phase(Metric::TaskCount, p),
            Cell::Number(rec.task_count),
        )?;
        table.add(
            idx,
            ColumnKey::phase(Metric::InputDataCount, p),
            Cell::Number(rec.input_data_count),
        )?;
        table.add(
            idx,
            ColumnKey::phase(Metric::AnnotationCount, p),
            Cell::Number(rec.annotation_count),
        )?;
        if p == Phase::Annotation {
            table.add(
                idx,
                ColumnKey::phase(Metric::PointedOutInspectionCommentCount, p),
                Cell::Number(rec.pointed_out_inspection_comment_count as f64),
            )?;
            table.add(
                idx,
                ColumnKey::phase(Metric::RejectedCount, p),
                Cell::Number(rec.rejected_count as f64),
            )?;
        }
    }

    for rec in daily_worktimes {
        let idx = ensure_row(&mut table, &rec.account_id)?;
        table.add(
            idx,
            ColumnKey::phase(Metric::RealMonitoredWorktimeHour, rec.phase),
            Cell::Number(rec.worktime_hour),
        )?;
        table.add(
            idx,
            ColumnKey::sum(Metric::RealMonitoredWorktimeHour),
            Cell::Number(rec.worktime_hour),
        )?;
        if rec.worktime_hour > 0.0 {
            let row = table.row_mut(idx);
            row.last_working_date = max_date(row.last_working_date, Some(rec.date));
        }
    }

    for rec in actual_worktimes {
        let idx = ensure_row(&mut table, &rec.account_id)?;
        table.add(
            idx,
            ColumnKey::sum(Metric::RealActualWorktimeHour),
            Cell::Number(rec.worktime_hour),
        )?;
        if rec.worktime_hour > 0.0 {
            let row = table.row_mut(idx);
            row.last_working_date = max_date(row.last_working_date, Some(rec.date));
        }
    }

    table.fill_additive_zero(&columns);
    table.sort_rows_by(|a, b| a.key().cmp(b.key()));
    Ok(table)
}
