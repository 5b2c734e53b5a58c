mod common;
pub use self::common::{Interval, Query, QueryCommon};

mod chart;
pub use self::chart::{ChartQuery, ChartSpan, Range};
