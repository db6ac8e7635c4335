/// Data layer: format schemas, loading, derived series, and figure assembly.
///
/// Architecture:
/// ```text
///  whitespace contact log
///        │
///        ▼
///   ┌──────────┐
///   │  loader   │  tokenize + route records → ContactDataset
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ metrics   │  evaluate derived series → key → Vec<f64>
///   └──────────┘
///        │
///        ▼
///   ┌──────────┐
///   │ figures   │  resolve trace keys → Vec<Figure>
///   └──────────┘
///
/// every stage is driven by a FormatSpec (schema module)
/// ```

pub mod export;
pub mod figures;
pub mod loader;
pub mod metrics;
pub mod model;
pub mod schema;
