/// Data layer: core types, loading, filtering and aggregation.
///
/// Architecture:
/// ```text
///   effectifs.csv  (';'-separated)
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  parse + coerce year + year-range filter → Table
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  Table    │  Vec<Record>, year / pathology index
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │  filter   │  pathology group / year predicate, sum_by
///   └──────────┘
///        │
///        ▼
///   ┌───────────┐
///   │ aggregate  │  totals, yearly series, age / region / sex breakdowns
///   └───────────┘
/// ```

pub mod aggregate;
pub mod filter;
pub mod loader;
pub mod model;
