use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Div, Mul};

use serde::{Deserialize, Serialize, Serializer};

/// One stage of a task's workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Annotation,
    Inspection,
    Acceptance,
}

impl Phase {
    /// Workflow order. Tables list their present phases in this order.
    pub const ALL: [Phase; 3] = [Phase::Annotation, Phase::Inspection, Phase::Acceptance];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Annotation => "annotation",
            Phase::Inspection => "inspection",
            Phase::Acceptance => "acceptance",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The phase qualifier of a column: a concrete phase or the cross-phase total.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Scope {
    Phase(Phase),
    Sum,
}

impl Scope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scope::Phase(p) => p.as_str(),
            Scope::Sum => "sum",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A base metric name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    TaskCount,
    InputDataCount,
    AnnotationCount,
    MonitoredWorktimeHour,
    MonitoredWorktimeRatio,
    RealMonitoredWorktimeHour,
    RealActualWorktimeHour,
    ActualWorktimeHour,
    PointedOutInspectionCommentCount,
    RejectedCount,
    WorkingUserCount,
}

impl Metric {
    /// Additive metrics sum under merge; the rest are recomputed.
    pub fn is_additive(&self) -> bool {
        !matches!(
            self,
            Metric::MonitoredWorktimeRatio | Metric::ActualWorktimeHour | Metric::WorkingUserCount
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::TaskCount => "task_count",
            Metric::InputDataCount => "input_data_count",
            Metric::AnnotationCount => "annotation_count",
            Metric::MonitoredWorktimeHour => "monitored_worktime_hour",
            Metric::MonitoredWorktimeRatio => "monitored_worktime_ratio",
            Metric::RealMonitoredWorktimeHour => "real_monitored_worktime_hour",
            Metric::RealActualWorktimeHour => "real_actual_worktime_hour",
            Metric::ActualWorktimeHour => "actual_worktime_hour",
            Metric::PointedOutInspectionCommentCount => "pointed_out_inspection_comment_count",
            Metric::RejectedCount => "rejected_count",
            Metric::WorkingUserCount => "working_user_count",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A column's metric identity: a base metric, a derived ratio between two
/// base metrics, or a running total of one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricId {
    Metric(Metric),
    /// `numerator / denominator`. With `trailing` set, the ratio of
    /// trailing-window sums rather than the same-row values.
    Rate {
        numerator: Metric,
        denominator: Metric,
        trailing: bool,
    },
    Cumulative(Metric),
}

impl MetricId {
    /// Header label, e.g. `monitored_worktime_hour/annotation_count`.
    /// Trailing-window rates carry a `__lastweek` suffix; running totals a
    /// `cumulative_` prefix.
    pub fn label(&self) -> String {
        match self {
            MetricId::Metric(m) => m.as_str().to_string(),
            MetricId::Rate {
                numerator,
                denominator,
                trailing: false,
            } => format!("{numerator}/{denominator}"),
            MetricId::Rate {
                numerator,
                denominator,
                trailing: true,
            } => format!("{numerator}/{denominator}__lastweek"),
            MetricId::Cumulative(m) => format!("cumulative_{m}"),
        }
    }
}

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

/// A full column key: metric plus optional phase/sum scope. Identity and
/// time-series columns are unscoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ColumnKey {
    pub metric: MetricId,
    pub scope: Option<Scope>,
}

impl ColumnKey {
    pub fn phase(metric: Metric, phase: Phase) -> Self {
        ColumnKey {
            metric: MetricId::Metric(metric),
            scope: Some(Scope::Phase(phase)),
        }
    }

    pub fn sum(metric: Metric) -> Self {
        ColumnKey {
            metric: MetricId::Metric(metric),
            scope: Some(Scope::Sum),
        }
    }

    pub fn unscoped(metric: Metric) -> Self {
        ColumnKey {
            metric: MetricId::Metric(metric),
            scope: None,
        }
    }

    pub fn rate_phase(numerator: Metric, denominator: Metric, phase: Phase) -> Self {
        ColumnKey {
            metric: MetricId::Rate {
                numerator,
                denominator,
                trailing: false,
            },
            scope: Some(Scope::Phase(phase)),
        }
    }

    pub fn rate_sum(numerator: Metric, denominator: Metric) -> Self {
        ColumnKey {
            metric: MetricId::Rate {
                numerator,
                denominator,
                trailing: false,
            },
            scope: Some(Scope::Sum),
        }
    }

    pub fn rate(numerator: Metric, denominator: Metric) -> Self {
        ColumnKey {
            metric: MetricId::Rate {
                numerator,
                denominator,
                trailing: false,
            },
            scope: None,
        }
    }

    pub fn trailing_rate(numerator: Metric, denominator: Metric) -> Self {
        ColumnKey {
            metric: MetricId::Rate {
                numerator,
                denominator,
                trailing: true,
            },
            scope: None,
        }
    }

    pub fn cumulative(metric: Metric) -> Self {
        ColumnKey {
            metric: MetricId::Cumulative(metric),
            scope: None,
        }
    }

    /// True for plain columns of an additive base metric.
    pub fn is_additive(&self) -> bool {
        match self.metric {
            MetricId::Metric(m) => m.is_additive(),
            _ => false,
        }
    }

    /// First header row: the metric label.
    pub fn metric_label(&self) -> String {
        self.metric.label()
    }

    /// Second header row: the scope label, empty for unscoped columns.
    pub fn scope_label(&self) -> &'static str {
        self.scope.map(|s| s.as_str()).unwrap_or("")
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.scope {
            Some(s) => write!(f, "{}[{}]", self.metric, s),
            None => write!(f, "{}", self.metric),
        }
    }
}

/// A single table value. `Missing` is "no value recorded" and acts as the
/// additive identity; `Indeterminate` is "mathematically undefined" (a zero
/// denominator) and propagates through all subsequent arithmetic. Both
/// render as empty fields at the serialization boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Number(f64),
    Missing,
    Indeterminate,
}

impl Cell {
    /// Non-finite floats become `Indeterminate` so undefined values stay
    /// explicit instead of riding along as NaN.
    pub fn from_f64(value: f64) -> Self {
        if value.is_finite() {
            Cell::Number(value)
        } else {
            Cell::Indeterminate
        }
    }

    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn is_number(&self) -> bool {
        matches!(self, Cell::Number(_))
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn is_indeterminate(&self) -> bool {
        matches!(self, Cell::Indeterminate)
    }

    /// Additive fill: `Missing` becomes zero, everything else unchanged.
    pub fn or_zero(self) -> Cell {
        match self {
            Cell::Missing => Cell::Number(0.0),
            other => other,
        }
    }
}

impl Add for Cell {
    type Output = Cell;

    fn add(self, rhs: Cell) -> Cell {
        match (self, rhs) {
            (Cell::Indeterminate, _) | (_, Cell::Indeterminate) => Cell::Indeterminate,
            (Cell::Missing, other) | (other, Cell::Missing) => other,
            (Cell::Number(a), Cell::Number(b)) => Cell::from_f64(a + b),
        }
    }
}

impl AddAssign for Cell {
    fn add_assign(&mut self, rhs: Cell) {
        *self = *self + rhs;
    }
}

impl Mul for Cell {
    type Output = Cell;

    fn mul(self, rhs: Cell) -> Cell {
        match (self, rhs) {
            (Cell::Indeterminate, _) | (_, Cell::Indeterminate) => Cell::Indeterminate,
            (Cell::Missing, _) | (_, Cell::Missing) => Cell::Missing,
            (Cell::Number(a), Cell::Number(b)) => Cell::from_f64(a * b),
        }
    }
}

impl Div for Cell {
    type Output = Cell;

    /// Zero denominators (including 0/0) are `Indeterminate`, never a panic
    /// and never an IEEE infinity.
    fn div(self, rhs: Cell) -> Cell {
        match (self, rhs) {
            (Cell::Indeterminate, _) | (_, Cell::Indeterminate) => Cell::Indeterminate,
            (Cell::Missing, _) | (_, Cell::Missing) => Cell::Missing,
            (Cell::Number(_), Cell::Number(d)) if d == 0.0 => Cell::Indeterminate,
            (Cell::Number(n), Cell::Number(d)) => Cell::from_f64(n / d),
        }
    }
}

impl Sum for Cell {
    fn sum<I: Iterator<Item = Cell>>(iter: I) -> Cell {
        iter.fold(Cell::Missing, |acc, c| acc + c)
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Cell::Number(v) => serializer.serialize_f64(*v),
            _ => serializer.serialize_none(),
        }
    }
}
