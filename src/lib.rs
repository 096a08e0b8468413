pub mod date_util;
pub mod error;
pub mod performance;
pub mod rating;
pub mod records;
pub mod stats;
pub mod table;
pub mod timeseries;

pub use error::{Error, Result};
pub use performance::{
    build_user_performance, derive_ratios, merge, merge_all, summarize, DeriveOptions,
};
pub use rating::{
    deviation_scores, quartile_ranks, samples_from_table, DeviationRow, Rank, RankRow,
    RatingSample, RatingThresholds, StandardizeOptions,
};
pub use records::{
    ActualWorktimeRecord, DailyWorktimeRecord, TaskRecord, TaskWorktimeRecord, UserRecord,
};
pub use table::{
    Cell, ColumnKey, Metric, MetricId, MetricTable, Phase, Row, RowKey, Scope, UserAttrs,
};
pub use timeseries::{daily_user_series, daily_whole_series, SeriesOptions};
