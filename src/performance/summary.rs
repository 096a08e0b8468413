//! Whole-project summary: collapses a per-user table into a single row.

use crate::date_util::max_date;
use crate::error::Result;
use crate::performance::derive::{derive_ratios, DeriveOptions};
use crate::table::{layout, Cell, ColumnKey, Metric, MetricTable, RowKey};

/// Reduces a per-user table to the single whole-project row: additive
/// columns summed, ratios derived from the sums, and per-phase
/// `working_user_count` computed from the pre-sum rows (it cannot be read
/// off the summed row). An empty input is not an error; it yields zeros and
/// the zero-denominator policy values.
pub fn summarize(table: &MetricTable, options: &DeriveOptions) -> Result<MetricTable> {
    if table.is_empty() {
        log::warn!("summarizing an empty per-user table");
    }

    let phases = table.phases().to_vec();
    let additive: Vec<ColumnKey> = table
        .columns()
        .iter()
        .copied()
        .filter(ColumnKey::is_additive)
        .collect();

    let mut summed = MetricTable::new(&phases, additive.clone())?;
    let idx = summed.add_row(RowKey::Total)?;
    for &col in &additive {
        let total: Cell = table.rows().iter().map(|r| table.get(r.key(), col)).sum();
        summed.set(idx, col, total)?;
    }
    summed.row_mut(idx).last_working_date = table
        .rows()
        .iter()
        .fold(None, |acc, r| max_date(acc, r.last_working_date));
    summed.fill_additive_zero(&additive);

    let derived = derive_ratios(&summed, options)?;

    let mut out = MetricTable::new(&phases, layout::summary_columns(&phases))?;
    let out_idx = out.add_row(RowKey::Total)?;
    out.row_mut(out_idx).last_working_date = derived.rows()[0].last_working_date;
    for &col in derived.columns() {
        out.set(out_idx, col, derived.cell(0, col))?;
    }
    for &p in &phases {
        let task_col = ColumnKey::phase(Metric::TaskCount, p);
        let working = table
            .rows()
            .iter()
            .filter(|r| matches!(table.get(r.key(), task_col), Cell::Number(n) if n > 0.0))
            .count();
        out.set(
            out_idx,
            ColumnKey::phase(Metric::WorkingUserCount, p),
            Cell::Number(working as f64),
        )?;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::performance::build_user_performance;
    use crate::records::TaskWorktimeRecord;
    use crate::table::Phase;

    fn task_wt(account: &str, phase: Phase, hours: f64, tasks: f64) -> TaskWorktimeRecord {
        TaskWorktimeRecord {
            task_id: "t".into(),
            account_id: account.into(),
            phase,
            worktime_hour: hours,
            task_count: tasks,
            input_data_count: tasks * 10.0,
            annotation_count: tasks * 50.0,
            pointed_out_inspection_comment_count: 0,
            rejected_count: 0,
        }
    }

    #[test]
    fn test_summary_matches_manual_sum() {
        // task_count[annotation] = [3, 5, 0] across three users
        let recs = [
            task_wt("u1", Phase::Annotation, 1.0, 3.0),
            task_wt("u2", Phase::Annotation, 2.0, 5.0),
            task_wt("u3", Phase::Annotation, 0.5, 0.0),
        ];
        let table = build_user_performance(&recs, &[], &[], &[]).unwrap();
        let summary = summarize(&table, &DeriveOptions::default()).unwrap();

        assert_eq!(summary.len(), 1);
        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::TaskCount, Phase::Annotation)
            ),
            Cell::Number(8.0)
        );
        // u3 worked zero tasks and does not count as a working user
        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::WorkingUserCount, Phase::Annotation)
            ),
            Cell::Number(2.0)
        );
    }

    #[test]
    fn test_working_user_count_per_phase() {
        let recs = [
            task_wt("u1", Phase::Annotation, 1.0, 2.0),
            task_wt("u2", Phase::Annotation, 1.0, 1.0),
            task_wt("u2", Phase::Inspection, 1.0, 1.0),
        ];
        let table = build_user_performance(&recs, &[], &[], &[]).unwrap();
        let summary = summarize(&table, &DeriveOptions::default()).unwrap();

        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::WorkingUserCount, Phase::Annotation)
            ),
            Cell::Number(2.0)
        );
        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::WorkingUserCount, Phase::Inspection)
            ),
            Cell::Number(1.0)
        );
    }

    #[test]
    fn test_summary_ratios_from_summed_row() {
        let recs = [
            task_wt("u1", Phase::Annotation, 1.0, 2.0),
            task_wt("u2", Phase::Annotation, 3.0, 2.0),
        ];
        let table = build_user_performance(&recs, &[], &[], &[]).unwrap();
        let summary = summarize(&table, &DeriveOptions::default()).unwrap();

        // 4 hours over 4 tasks, not the mean of the per-user rates
        let rate = summary
            .get(
                &RowKey::Total,
                ColumnKey::rate_phase(
                    Metric::MonitoredWorktimeHour,
                    Metric::TaskCount,
                    Phase::Annotation,
                ),
            )
            .number();
        assert_eq!(rate, Some(1.0));
    }

    #[test]
    fn test_empty_table_summarizes_to_zero_row() {
        let phases = [Phase::Annotation, Phase::Inspection];
        let table = MetricTable::new(&phases, layout::additive_columns(&phases)).unwrap();
        let summary = summarize(&table, &DeriveOptions::default()).unwrap();

        assert_eq!(summary.len(), 1);
        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::TaskCount, Phase::Annotation)
            ),
            Cell::Number(0.0)
        );
        // Zero monitored time engages the ratio policy
        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::MonitoredWorktimeRatio, Phase::Annotation)
            ),
            Cell::Number(1.0)
        );
        assert_eq!(
            summary.get(
                &RowKey::Total,
                ColumnKey::phase(Metric::WorkingUserCount, Phase::Inspection)
            ),
            Cell::Number(0.0)
        );
    }

    #[test]
    fn test_summary_last_working_date_is_max() {
        use crate::records::ActualWorktimeRecord;
        use chrono::NaiveDate;

        let actuals = [
            ActualWorktimeRecord {
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                account_id: "u1".into(),
                worktime_hour: 1.0,
            },
            ActualWorktimeRecord {
                date: NaiveDate::from_ymd_opt(2024, 3, 9).unwrap(),
                account_id: "u2".into(),
                worktime_hour: 1.0,
            },
        ];
        let table = build_user_performance(&[], &[], &actuals, &[]).unwrap();
        let summary = summarize(&table, &DeriveOptions::default()).unwrap();
        assert_eq!(
            summary.rows()[0].last_working_date,
            NaiveDate::from_ymd_opt(2024, 3, 9)
        );
    }
}
