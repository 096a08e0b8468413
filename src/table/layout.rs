//! Presentation layout: the fixed column orders of persisted tables and the
//! two-header-row / long-format record rendering. Writing files is the
//! caller's concern; everything here produces in-memory strings.

use serde_json::{Map, Number, Value};

use crate::error::Result;
use crate::table::{Cell, ColumnKey, Metric, MetricTable, Phase, RowKey};

/// Additive base columns in presentation order, for the given phase list.
/// This is the schema builders produce before ratio derivation.
pub fn additive_columns(phases: &[Phase]) -> Vec<ColumnKey> {
    let mut cols = Vec::new();

    cols.push(ColumnKey::sum(Metric::RealMonitoredWorktimeHour));
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::RealMonitoredWorktimeHour, p));
    }

    cols.push(ColumnKey::sum(Metric::MonitoredWorktimeHour));
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::MonitoredWorktimeHour, p));
    }

    for m in [
        Metric::TaskCount,
        Metric::InputDataCount,
        Metric::AnnotationCount,
    ] {
        for &p in phases {
            cols.push(ColumnKey::phase(m, p));
        }
    }

    cols.push(ColumnKey::sum(Metric::RealActualWorktimeHour));

    cols.push(ColumnKey::phase(
        Metric::PointedOutInspectionCommentCount,
        Phase::Annotation,
    ));
    cols.push(ColumnKey::phase(Metric::RejectedCount, Phase::Annotation));

    cols
}

/// Full per-user performance columns (additive + derived) in the fixed
/// presentation order: real-monitored, monitored (+ratio), production counts,
/// real-actual (+coverage ratio), actual, productivity ratios, quality.
pub fn performance_columns(phases: &[Phase]) -> Vec<ColumnKey> {
    let mut cols = Vec::new();

    cols.push(ColumnKey::sum(Metric::RealMonitoredWorktimeHour));
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::RealMonitoredWorktimeHour, p));
    }

    cols.push(ColumnKey::sum(Metric::MonitoredWorktimeHour));
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::MonitoredWorktimeHour, p));
    }
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::MonitoredWorktimeRatio, p));
    }

    for m in [
        Metric::TaskCount,
        Metric::InputDataCount,
        Metric::AnnotationCount,
    ] {
        for &p in phases {
            cols.push(ColumnKey::phase(m, p));
        }
    }

    cols.push(ColumnKey::sum(Metric::RealActualWorktimeHour));
    cols.push(ColumnKey::rate_sum(
        Metric::RealMonitoredWorktimeHour,
        Metric::RealActualWorktimeHour,
    ));

    cols.push(ColumnKey::sum(Metric::ActualWorktimeHour));
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::ActualWorktimeHour, p));
    }

    for num in [Metric::MonitoredWorktimeHour, Metric::ActualWorktimeHour] {
        for den in [Metric::InputDataCount, Metric::AnnotationCount] {
            for &p in phases {
                cols.push(ColumnKey::rate_phase(num, den, p));
            }
        }
    }

    cols.push(ColumnKey::phase(
        Metric::PointedOutInspectionCommentCount,
        Phase::Annotation,
    ));
    cols.push(ColumnKey::rate_phase(
        Metric::PointedOutInspectionCommentCount,
        Metric::AnnotationCount,
        Phase::Annotation,
    ));
    cols.push(ColumnKey::rate_phase(
        Metric::PointedOutInspectionCommentCount,
        Metric::InputDataCount,
        Phase::Annotation,
    ));
    cols.push(ColumnKey::phase(Metric::RejectedCount, Phase::Annotation));
    cols.push(ColumnKey::rate_phase(
        Metric::RejectedCount,
        Metric::TaskCount,
        Phase::Annotation,
    ));

    cols
}

/// Performance columns plus the per-phase distinct-working-user counts that
/// only exist on the whole-project summary row.
pub fn summary_columns(phases: &[Phase]) -> Vec<ColumnKey> {
    let mut cols = performance_columns(phases);
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::WorkingUserCount, p));
    }
    cols
}

/// Time-series columns: production counters, worktime (monitored also per
/// present phase), instantaneous + trailing-window velocity per configured
/// pair, then cumulative counters.
pub fn series_columns(phases: &[Phase], velocity_pairs: &[(Metric, Metric)]) -> Vec<ColumnKey> {
    let mut cols = vec![
        ColumnKey::unscoped(Metric::TaskCount),
        ColumnKey::unscoped(Metric::InputDataCount),
        ColumnKey::unscoped(Metric::AnnotationCount),
        ColumnKey::unscoped(Metric::MonitoredWorktimeHour),
    ];
    for &p in phases {
        cols.push(ColumnKey::phase(Metric::MonitoredWorktimeHour, p));
    }
    cols.push(ColumnKey::unscoped(Metric::ActualWorktimeHour));

    for &(num, den) in velocity_pairs {
        cols.push(ColumnKey::rate(num, den));
        cols.push(ColumnKey::trailing_rate(num, den));
    }

    for m in [
        Metric::TaskCount,
        Metric::InputDataCount,
        Metric::AnnotationCount,
        Metric::MonitoredWorktimeHour,
        Metric::ActualWorktimeHour,
    ] {
        cols.push(ColumnKey::cumulative(m));
    }

    cols
}

/// The identity columns a table's row-key variant puts before the metric
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Shape {
    Account,
    Date,
    DateAccount,
    Total,
}

fn shape_of(table: &MetricTable) -> Shape {
    match table.rows().first().map(|r| r.key()) {
        Some(RowKey::Date(_)) => Shape::Date,
        Some(RowKey::DateAccount(..)) => Shape::DateAccount,
        Some(RowKey::Total) => Shape::Total,
        _ => Shape::Account,
    }
}

fn identity_labels(shape: Shape) -> &'static [&'static str] {
    match shape {
        Shape::Account => &[
            "account_id",
            "user_id",
            "username",
            "biography",
            "last_working_date",
        ],
        Shape::Date => &["date"],
        Shape::DateAccount => &["date", "account_id", "user_id", "username"],
        Shape::Total => &[],
    }
}

fn identity_fields(table: &MetricTable, row_idx: usize, shape: Shape) -> Vec<String> {
    let row = &table.rows()[row_idx];
    let attr = |v: &Option<String>| v.clone().unwrap_or_default();
    match (shape, row.key()) {
        (Shape::Account, RowKey::Account(a)) => vec![
            a.clone(),
            attr(&row.attrs.user_id),
            attr(&row.attrs.username),
            attr(&row.attrs.biography),
            row.last_working_date.map(|d| d.to_string()).unwrap_or_default(),
        ],
        (Shape::Date, RowKey::Date(d)) => vec![d.to_string()],
        (Shape::DateAccount, RowKey::DateAccount(d, a)) => vec![
            d.to_string(),
            a.clone(),
            attr(&row.attrs.user_id),
            attr(&row.attrs.username),
        ],
        _ => Vec::new(),
    }
}

fn format_cell(cell: Cell) -> String {
    match cell {
        Cell::Number(v) => format!("{v}"),
        _ => String::new(),
    }
}

fn csv_escape(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

impl MetricTable {
    /// Renders the table as string records with two header rows: metric
    /// labels, then scope labels (empty for unscoped and identity columns).
    pub fn to_records(&self) -> Vec<Vec<String>> {
        let shape = shape_of(self);
        let identity = identity_labels(shape);

        let mut header1: Vec<String> = identity.iter().map(|s| s.to_string()).collect();
        let mut header2: Vec<String> = identity.iter().map(|_| String::new()).collect();
        for col in self.columns() {
            header1.push(col.metric_label());
            header2.push(col.scope_label().to_string());
        }

        let mut records = vec![header1, header2];
        for i in 0..self.rows().len() {
            let mut fields = identity_fields(self, i, shape);
            fields.extend(self.rows()[i].cells().iter().map(|&c| format_cell(c)));
            records.push(fields);
        }
        records
    }

    /// Renders a single-row summary table in long format: one record per
    /// column, `(metric, scope, value)`, with no header record.
    pub fn to_long_records(&self) -> Vec<[String; 3]> {
        let Some(row) = self.rows().first() else {
            return Vec::new();
        };
        self.columns()
            .iter()
            .zip(row.cells())
            .map(|(col, &cell)| {
                [
                    col.metric_label(),
                    col.scope_label().to_string(),
                    format_cell(cell),
                ]
            })
            .collect()
    }

    /// CSV rendering of [`to_records`](Self::to_records); summary tables
    /// render the long format instead.
    pub fn to_csv(&self) -> String {
        let records: Vec<Vec<String>> = if shape_of(self) == Shape::Total {
            self.to_long_records().into_iter().map(Vec::from).collect()
        } else {
            self.to_records()
        };
        let mut out = String::new();
        for record in &records {
            let line: Vec<String> = record.iter().map(|f| csv_escape(f)).collect();
            out.push_str(&line.join(","));
            out.push('\n');
        }
        out
    }

    /// JSON rendering: an array of row objects keyed by identity labels and
    /// `metric[scope]` column names. `Missing`/`Indeterminate` become null.
    pub fn to_json(&self) -> Result<String> {
        let shape = shape_of(self);
        let identity = identity_labels(shape);

        let mut rows = Vec::with_capacity(self.rows().len());
        for i in 0..self.rows().len() {
            let mut obj = Map::new();
            for (label, field) in identity.iter().zip(identity_fields(self, i, shape)) {
                let value = if field.is_empty() {
                    Value::Null
                } else {
                    Value::String(field)
                };
                obj.insert(label.to_string(), value);
            }
            for (col, &cell) in self.columns().iter().zip(self.rows()[i].cells()) {
                let value = match cell.number().and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => Value::Null,
                };
                obj.insert(col.to_string(), value);
            }
            rows.push(Value::Object(obj));
        }
        Ok(serde_json::to_string_pretty(&Value::Array(rows))?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_performance_columns_group_order() {
        let phases = [Phase::Annotation, Phase::Acceptance];
        let cols = performance_columns(&phases);

        // Starts with the real-monitored group, sum first
        assert_eq!(cols[0], ColumnKey::sum(Metric::RealMonitoredWorktimeHour));
        assert_eq!(
            cols[1],
            ColumnKey::phase(Metric::RealMonitoredWorktimeHour, Phase::Annotation)
        );

        // Coverage ratio sits right after real-actual
        let real_actual = cols
            .iter()
            .position(|c| *c == ColumnKey::sum(Metric::RealActualWorktimeHour))
            .unwrap();
        assert_eq!(
            cols[real_actual + 1],
            ColumnKey::rate_sum(
                Metric::RealMonitoredWorktimeHour,
                Metric::RealActualWorktimeHour
            )
        );

        // Quality ratios close the list
        assert_eq!(
            *cols.last().unwrap(),
            ColumnKey::rate_phase(Metric::RejectedCount, Metric::TaskCount, Phase::Annotation)
        );

        // No duplicates
        let mut seen = std::collections::HashSet::new();
        assert!(cols.iter().all(|c| seen.insert(*c)));
    }

    #[test]
    fn test_additive_columns_are_subset_of_performance() {
        let phases = [Phase::Annotation, Phase::Inspection, Phase::Acceptance];
        let all = performance_columns(&phases);
        for col in additive_columns(&phases) {
            assert!(all.contains(&col), "missing {col}");
            assert!(col.is_additive(), "{col} not additive");
        }
    }

    #[test]
    fn test_summary_columns_append_working_user_count() {
        let phases = [Phase::Annotation];
        let cols = summary_columns(&phases);
        assert_eq!(
            *cols.last().unwrap(),
            ColumnKey::phase(Metric::WorkingUserCount, Phase::Annotation)
        );
    }

    #[test]
    fn test_to_records_two_header_rows() {
        let phases = [Phase::Annotation];
        let mut t = MetricTable::new(&phases, additive_columns(&phases)).unwrap();
        let r = t.add_row(RowKey::Account("a1".into())).unwrap();
        t.row_mut(r).attrs.user_id = Some("u1".into());
        t.row_mut(r).attrs.username = Some("Alice".into());
        t.row_mut(r).last_working_date = NaiveDate::from_ymd_opt(2024, 1, 15);
        t.set(
            r,
            ColumnKey::phase(Metric::TaskCount, Phase::Annotation),
            Cell::Number(3.0),
        )
        .unwrap();

        let records = t.to_records();
        assert_eq!(records[0][0], "account_id");
        assert_eq!(records[0][4], "last_working_date");
        assert_eq!(records[1][0], "");
        // First metric column after the 5 identity columns
        assert_eq!(records[0][5], "real_monitored_worktime_hour");
        assert_eq!(records[1][5], "sum");

        let row = &records[2];
        assert_eq!(row[0], "a1");
        assert_eq!(row[2], "Alice");
        assert_eq!(row[4], "2024-01-15");
    }

    #[test]
    fn test_to_csv_quotes_and_empties() {
        let phases = [Phase::Annotation];
        let mut t = MetricTable::new(&phases, additive_columns(&phases)).unwrap();
        let r = t.add_row(RowKey::Account("a1".into())).unwrap();
        t.row_mut(r).attrs.username = Some("Smith, \"Al\"".into());
        t.set(
            r,
            ColumnKey::sum(Metric::MonitoredWorktimeHour),
            Cell::Indeterminate,
        )
        .unwrap();

        let csv = t.to_csv();
        assert!(csv.contains("\"Smith, \"\"Al\"\"\""));
        // Indeterminate renders as an empty field
        let data_line = csv.lines().nth(2).unwrap();
        assert!(data_line.contains(",,"));
    }

    #[test]
    fn test_summary_long_format() {
        let phases = [Phase::Annotation];
        let mut t = MetricTable::new(&phases, summary_columns(&phases)).unwrap();
        let r = t.add_row(RowKey::Total).unwrap();
        t.set(
            r,
            ColumnKey::phase(Metric::TaskCount, Phase::Annotation),
            Cell::Number(8.0),
        )
        .unwrap();

        let long = t.to_long_records();
        assert_eq!(long.len(), t.columns().len());
        let task = long
            .iter()
            .find(|rec| rec[0] == "task_count" && rec[1] == "annotation")
            .unwrap();
        assert_eq!(task[2], "8");

        // to_csv on a summary dispatches to the long format: no header rows
        let csv = t.to_csv();
        assert!(csv.starts_with("real_monitored_worktime_hour,sum,"));
    }

    #[test]
    fn test_to_json_null_for_indeterminate() {
        let phases = [Phase::Annotation];
        let mut t = MetricTable::new(
            &phases,
            vec![ColumnKey::phase(Metric::TaskCount, Phase::Annotation)],
        )
        .unwrap();
        let r = t.add_row(RowKey::Account("a1".into())).unwrap();
        t.set(
            r,
            ColumnKey::phase(Metric::TaskCount, Phase::Annotation),
            Cell::Indeterminate,
        )
        .unwrap();

        let json: serde_json::Value = serde_json::from_str(&t.to_json().unwrap()).unwrap();
        assert!(json[0]["task_count[annotation]"].is_null());
        assert_eq!(json[0]["account_id"], "a1");
        assert!(json[0]["biography"].is_null());
    }

    #[test]
    fn test_series_shape_identity_columns() {
        let phases = [Phase::Annotation];
        let mut t = MetricTable::new(&phases, series_columns(&phases, &[])).unwrap();
        t.add_row(RowKey::Date(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()))
            .unwrap();
        let records = t.to_records();
        assert_eq!(records[0][0], "date");
        assert_eq!(records[2][0], "2024-01-01");
    }
}
