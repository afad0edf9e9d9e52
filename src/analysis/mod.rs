pub mod aggregate;
pub mod charts;
pub mod preprocess;
pub mod report;

pub use aggregate::{GroupAverage, HeroDelta, GroupDistribution, Trend};
pub use charts::{generate_charts, ChartPaths};
pub use preprocess::{preprocess, HeroObservation};
pub use report::{generate_report, TrendReport};
