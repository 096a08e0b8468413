//! Ratio derivation and actual-worktime allocation.
//!
//! Every derived column is a pure function of additive columns in the same
//! row, so tables coming out of [`derive_ratios`] never carry stale ratios.

use crate::error::Result;
use crate::table::{layout, Cell, ColumnKey, Metric, MetricTable, Phase};

/// Configuration for ratio derivation.
#[derive(Debug, Clone)]
pub struct DeriveOptions {
    /// Phase that receives the whole monitored-worktime ratio for rows with
    /// zero monitored time, so their reported actual time is allocated
    /// somewhere instead of being dropped.
    pub zero_time_allocation_phase: Phase,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        DeriveOptions {
            zero_time_allocation_phase: Phase::Annotation,
        }
    }
}

/// Per-phase monitored-worktime ratios. When the total is zero the
/// allocation phase takes ratio 1 and every other phase 0.
pub fn monitored_ratios(per_phase: &[Cell], total: Cell, allocation_idx: usize) -> Vec<Cell> {
    if total.or_zero() == Cell::Number(0.0) {
        return (0..per_phase.len())
            .map(|i| Cell::Number(if i == allocation_idx { 1.0 } else { 0.0 }))
            .collect();
    }
    per_phase.iter().map(|&c| c.or_zero() / total).collect()
}

/// Estimated actual worktime for the rows in view:
/// `real_actual × monitored / real_monitored`.
///
/// Scaling by the user's overall monitored-vs-reported proportion keeps a
/// task-filtered view's allocation consistent with the unfiltered one. Zero
/// reported time makes the estimate `Indeterminate`; zero measured time
/// attributes the whole reported figure to the view.
pub fn estimate_actual_sum(real_actual: Cell, real_monitored: Cell, monitored: Cell) -> Cell {
    match (real_actual, real_monitored) {
        (Cell::Number(ra), _) if ra == 0.0 => Cell::Indeterminate,
        (Cell::Number(ra), Cell::Number(rm)) if rm == 0.0 => Cell::Number(ra),
        _ => real_actual * (monitored / real_monitored),
    }
}

fn allocation_phase_idx(phases: &[Phase], options: &DeriveOptions) -> usize {
    match phases
        .iter()
        .position(|&p| p == options.zero_time_allocation_phase)
    {
        Some(i) => i,
        None => {
            log::warn!(
                "zero-time allocation phase {} not present; falling back to {}",
                options.zero_time_allocation_phase,
                phases[0]
            );
            0
        }
    }
}

/// Adds every derived column of the per-user performance layout to a copy of
/// `table`. Additive columns pass through unchanged; zero denominators
/// resolve to `Indeterminate` (or the zero-time policy for the monitored
/// ratio), never to an error.
pub fn derive_ratios(table: &MetricTable, options: &DeriveOptions) -> Result<MetricTable> {
    let phases = table.phases().to_vec();

    let mut required = vec![
        ColumnKey::sum(Metric::MonitoredWorktimeHour),
        ColumnKey::sum(Metric::RealMonitoredWorktimeHour),
        ColumnKey::sum(Metric::RealActualWorktimeHour),
        ColumnKey::phase(Metric::PointedOutInspectionCommentCount, Phase::Annotation),
        ColumnKey::phase(Metric::RejectedCount, Phase::Annotation),
    ];
    for &p in &phases {
        required.push(ColumnKey::phase(Metric::MonitoredWorktimeHour, p));
        required.push(ColumnKey::phase(Metric::TaskCount, p));
        required.push(ColumnKey::phase(Metric::InputDataCount, p));
        required.push(ColumnKey::phase(Metric::AnnotationCount, p));
    }
    table.ensure_columns(&required)?;

    if table.is_empty() {
        log::warn!("deriving ratios over an empty table");
    }

    let allocation_idx = allocation_phase_idx(&phases, options);
    let mut out = MetricTable::new(&phases, layout::performance_columns(&phases))?;

    for i in 0..table.rows().len() {
        let src = &table.rows()[i];
        let idx = out.add_row(src.key().clone())?;
        {
            let row = out.row_mut(idx);
            row.attrs = src.attrs.clone();
            row.last_working_date = src.last_working_date;
        }
        for &col in table.columns() {
            if col.is_additive() {
                out.set(idx, col, table.cell(i, col))?;
            }
        }

        let monitored_sum = table.cell(i, ColumnKey::sum(Metric::MonitoredWorktimeHour));
        let real_monitored_sum =
            table.cell(i, ColumnKey::sum(Metric::RealMonitoredWorktimeHour));
        let real_actual_sum = table.cell(i, ColumnKey::sum(Metric::RealActualWorktimeHour));

        let per_phase: Vec<Cell> = phases
            .iter()
            .map(|&p| table.cell(i, ColumnKey::phase(Metric::MonitoredWorktimeHour, p)))
            .collect();
        let ratios = monitored_ratios(&per_phase, monitored_sum, allocation_idx);
        for (&p, &ratio) in phases.iter().zip(&ratios) {
            out.set(idx, ColumnKey::phase(Metric::MonitoredWorktimeRatio, p), ratio)?;
        }

        out.set(
            idx,
            ColumnKey::rate_sum(
                Metric::RealMonitoredWorktimeHour,
                Metric::RealActualWorktimeHour,
            ),
            real_monitored_sum / real_actual_sum,
        )?;

        let actual_sum = estimate_actual_sum(real_actual_sum, real_monitored_sum, monitored_sum);
        out.set(idx, ColumnKey::sum(Metric::ActualWorktimeHour), actual_sum)?;
        for (&p, &ratio) in phases.iter().zip(&ratios) {
            out.set(
                idx,
                ColumnKey::phase(Metric::ActualWorktimeHour, p),
                actual_sum * ratio,
            )?;
        }

        for &p in &phases {
            let monitored = table.cell(i, ColumnKey::phase(Metric::MonitoredWorktimeHour, p));
            let actual = out.cell(idx, ColumnKey::phase(Metric::ActualWorktimeHour, p));
            let input = table.cell(i, ColumnKey::phase(Metric::InputDataCount, p));
            let annotation = table.cell(i, ColumnKey::phase(Metric::AnnotationCount, p));

            out.set(
                idx,
                ColumnKey::rate_phase(Metric::MonitoredWorktimeHour, Metric::InputDataCount, p),
                monitored / input,
            )?;
            out.set(
                idx,
                ColumnKey::rate_phase(Metric::MonitoredWorktimeHour, Metric::AnnotationCount, p),
                monitored / annotation,
            )?;
            out.set(
                idx,
                ColumnKey::rate_phase(Metric::ActualWorktimeHour, Metric::InputDataCount, p),
                actual / input,
            )?;
            out.set(
                idx,
                ColumnKey::rate_phase(Metric::ActualWorktimeHour, Metric::AnnotationCount, p),
                actual / annotation,
            )?;
        }

        let pointed = table.cell(
            i,
            ColumnKey::phase(Metric::PointedOutInspectionCommentCount, Phase::Annotation),
        );
        let rejected = table.cell(i, ColumnKey::phase(Metric::RejectedCount, Phase::Annotation));
        let ann_task = table.cell(i, ColumnKey::phase(Metric::TaskCount, Phase::Annotation));
        let ann_input = table.cell(i, ColumnKey::phase(Metric::InputDataCount, Phase::Annotation));
        let ann_annotation =
            table.cell(i, ColumnKey::phase(Metric::AnnotationCount, Phase::Annotation));

        out.set(
            idx,
            ColumnKey::rate_phase(
                Metric::PointedOutInspectionCommentCount,
                Metric::AnnotationCount,
                Phase::Annotation,
            ),
            pointed / ann_annotation,
        )?;
        out.set(
            idx,
            ColumnKey::rate_phase(
                Metric::PointedOutInspectionCommentCount,
                Metric::InputDataCount,
                Phase::Annotation,
            ),
            pointed / ann_input,
        )?;
        out.set(
            idx,
            ColumnKey::rate_phase(Metric::RejectedCount, Metric::TaskCount, Phase::Annotation),
            rejected / ann_task,
        )?;
    }

    Ok(out)
}
