//! Per-date productivity series: groups raw records by calendar date
//! (optionally per user), fills gaps in the date range with zeros, and adds
//! trailing-window velocity and cumulative columns.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;

use crate::date_util::date_range;
use crate::error::Result;
use crate::records::{ActualWorktimeRecord, DailyWorktimeRecord, TaskRecord, UserRecord};
use crate::table::{layout, Cell, ColumnKey, Metric, MetricTable, Phase, RowKey};

/// Configuration for series construction.
#[derive(Debug, Clone)]
pub struct SeriesOptions {
    /// Trailing-window length in days for velocity columns.
    pub window_days: usize,
    /// Days required in the window before a trailing value is emitted;
    /// shorter windows yield `Indeterminate`.
    pub min_window_days: usize,
    /// `(numerator, denominator)` pairs to compute instantaneous and
    /// trailing-window velocities for.
    pub velocity_pairs: Vec<(Metric, Metric)>,
}

impl Default for SeriesOptions {
    fn default() -> Self {
        SeriesOptions {
            window_days: 7,
            min_window_days: 2,
            velocity_pairs: vec![
                (Metric::MonitoredWorktimeHour, Metric::TaskCount),
                (Metric::MonitoredWorktimeHour, Metric::InputDataCount),
                (Metric::MonitoredWorktimeHour, Metric::AnnotationCount),
                (Metric::ActualWorktimeHour, Metric::TaskCount),
                (Metric::ActualWorktimeHour, Metric::InputDataCount),
                (Metric::ActualWorktimeHour, Metric::AnnotationCount),
            ],
        }
    }
}

#[derive(Debug, Clone, Default)]
struct DayAccum {
    task_count: f64,
    input_data_count: f64,
    annotation_count: f64,
    monitored_total: f64,
    monitored_by_phase: BTreeMap<Phase, f64>,
    actual: f64,
}

impl DayAccum {
    fn add_task(&mut self, rec: &TaskRecord) {
        self.task_count += 1.0;
        self.input_data_count += rec.input_data_count as f64;
        self.annotation_count += rec.annotation_count as f64;
    }

    fn add_monitored(&mut self, rec: &DailyWorktimeRecord) {
        self.monitored_total += rec.worktime_hour;
        *self.monitored_by_phase.entry(rec.phase).or_default() += rec.worktime_hour;
    }
}

fn series_phases(daily: &[DailyWorktimeRecord]) -> Vec<Phase> {
    let present: std::collections::BTreeSet<Phase> = daily.iter().map(|r| r.phase).collect();
    Phase::ALL
        .into_iter()
        .filter(|p| *p == Phase::Annotation || present.contains(p))
        .collect()
}

fn set_base_cells(
    table: &mut MetricTable,
    idx: usize,
    accum: &DayAccum,
    phases: &[Phase],
) -> Result<()> {
    table.set(
        idx,
        ColumnKey::unscoped(Metric::TaskCount),
        Cell::Number(accum.task_count),
    )?;
    table.set(
        idx,
        ColumnKey::unscoped(Metric::InputDataCount),
        Cell::Number(accum.input_data_count),
    )?;
    table.set(
        idx,
        ColumnKey::unscoped(Metric::AnnotationCount),
        Cell::Number(accum.annotation_count),
    )?;
    table.set(
        idx,
        ColumnKey::unscoped(Metric::MonitoredWorktimeHour),
        Cell::Number(accum.monitored_total),
    )?;
    for &p in phases {
        table.set(
            idx,
            ColumnKey::phase(Metric::MonitoredWorktimeHour, p),
            Cell::Number(accum.monitored_by_phase.get(&p).copied().unwrap_or(0.0)),
        )?;
    }
    table.set(
        idx,
        ColumnKey::unscoped(Metric::ActualWorktimeHour),
        Cell::Number(accum.actual),
    )?;
    Ok(())
}

/// Velocity and cumulative columns over one contiguous ascending-date
/// segment of rows (the whole table, or one user's slice).
fn fill_window_columns(
    table: &mut MetricTable,
    segment: &[usize],
    options: &SeriesOptions,
) -> Result<()> {
    for &(num, den) in &options.velocity_pairs {
        let num_col = ColumnKey::unscoped(num);
        let den_col = ColumnKey::unscoped(den);
        for (pos, &i) in segment.iter().enumerate() {
            let instant = table.cell(i, num_col) / table.cell(i, den_col);
            table.set(i, ColumnKey::rate(num, den), instant)?;

            let start = (pos + 1).saturating_sub(options.window_days);
            let window = &segment[start..=pos];
            let trailing = if window.len() < options.min_window_days {
                Cell::Indeterminate
            } else {
                let num_sum: Cell = window.iter().map(|&j| table.cell(j, num_col)).sum();
                let den_sum: Cell = window.iter().map(|&j| table.cell(j, den_col)).sum();
                num_sum / den_sum
            };
            table.set(i, ColumnKey::trailing_rate(num, den), trailing)?;
        }
    }

    for m in [
        Metric::TaskCount,
        Metric::InputDataCount,
        Metric::AnnotationCount,
        Metric::MonitoredWorktimeHour,
        Metric::ActualWorktimeHour,
    ] {
        let base = ColumnKey::unscoped(m);
        let mut running = 0.0;
        for &i in segment {
            running += table.cell(i, base).number().unwrap_or(0.0);
            table.set(i, ColumnKey::cumulative(m), Cell::Number(running))?;
        }
    }
    Ok(())
}

/// Whole-project per-date series. Tasks are attributed to their completed
/// date; tasks still in progress are skipped.
pub fn daily_whole_series(
    tasks: &[TaskRecord],
    daily: &[DailyWorktimeRecord],
    actual: &[ActualWorktimeRecord],
    options: &SeriesOptions,
) -> Result<MetricTable> {
    let mut grouped: BTreeMap<NaiveDate, DayAccum> = BTreeMap::new();
    let mut skipped = 0usize;
    for rec in tasks {
        let Some(date) = rec.completed_date else {
            skipped += 1;
            continue;
        };
        grouped.entry(date).or_default().add_task(rec);
    }
    if skipped > 0 {
        log::debug!("series: skipped {skipped} tasks without a completed date");
    }
    for rec in daily {
        grouped.entry(rec.date).or_default().add_monitored(rec);
    }
    for rec in actual {
        grouped.entry(rec.date).or_default().actual += rec.worktime_hour;
    }

    let phases = series_phases(daily);
    let columns = layout::series_columns(&phases, &options.velocity_pairs);
    let mut table = MetricTable::new(&phases, columns)?;

    let (Some((&first, _)), Some((&last, _))) =
        (grouped.first_key_value(), grouped.last_key_value())
    else {
        return Ok(table);
    };

    let empty = DayAccum::default();
    for date in date_range(first, last) {
        let idx = table.add_row(RowKey::Date(date))?;
        let accum = grouped.get(&date).unwrap_or(&empty);
        set_base_cells(&mut table, idx, accum, &phases)?;
    }

    let segment: Vec<usize> = (0..table.len()).collect();
    fill_window_columns(&mut table, &segment, options)?;
    Ok(table)
}

/// Per-user per-date series. The date range is filled per user, from that
/// user's first to last observed date; windowed and cumulative columns
/// restart at each user boundary. Display attributes come from the roster.
pub fn daily_user_series(
    tasks: &[TaskRecord],
    daily: &[DailyWorktimeRecord],
    actual: &[ActualWorktimeRecord],
    users: &[UserRecord],
    options: &SeriesOptions,
) -> Result<MetricTable> {
    let mut grouped: BTreeMap<String, BTreeMap<NaiveDate, DayAccum>> = BTreeMap::new();
    let mut skipped = 0usize;
    for rec in tasks {
        let (Some(account), Some(date)) = (&rec.account_id, rec.completed_date) else {
            skipped += 1;
            continue;
        };
        grouped
            .entry(account.clone())
            .or_default()
            .entry(date)
            .or_default()
            .add_task(rec);
    }
    if skipped > 0 {
        log::debug!("user series: skipped {skipped} tasks without an account or completed date");
    }
    for rec in daily {
        grouped
            .entry(rec.account_id.clone())
            .or_default()
            .entry(rec.date)
            .or_default()
            .add_monitored(rec);
    }
    for rec in actual {
        grouped
            .entry(rec.account_id.clone())
            .or_default()
            .entry(rec.date)
            .or_default()
            .actual += rec.worktime_hour;
    }

    let roster: HashMap<&str, &UserRecord> =
        users.iter().map(|u| (u.account_id.as_str(), u)).collect();

    let phases = series_phases(daily);
    let columns = layout::series_columns(&phases, &options.velocity_pairs);
    let mut table = MetricTable::new(&phases, columns)?;

    let empty = DayAccum::default();
    let mut segments: Vec<Vec<usize>> = Vec::new();
    for (account, days) in &grouped {
        let (Some((&first, _)), Some((&last, _))) = (days.first_key_value(), days.last_key_value())
        else {
            continue;
        };

        let start = table.len();
        for date in date_range(first, last) {
            let idx = table.add_row(RowKey::DateAccount(date, account.clone()))?;
            if let Some(user) = roster.get(account.as_str()) {
                let row = table.row_mut(idx);
                row.attrs.user_id = Some(user.user_id.clone());
                row.attrs.username = Some(user.username.clone());
                row.attrs.biography = user.biography.clone();
            }
            let accum = days.get(&date).unwrap_or(&empty);
            set_base_cells(&mut table, idx, accum, &phases)?;
        }
        segments.push((start..table.len()).collect());
    }

    for segment in &segments {
        fill_window_columns(&mut table, segment, options)?;
    }
    Ok(table)
}
