mod client;
mod errors;
mod query;
pub mod types;
mod user_agent;
pub use self::client::Client;
pub use self::errors::Error;
pub use self::query::{ChartQuery, ChartSpan, Interval, Query, QueryCommon, Range};
pub use self::user_agent::get_user_agent;
