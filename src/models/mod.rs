pub mod alert;
pub mod quote;

pub use alert::{Alert, AlertKind, AlertOp, NewAlert, Trigger};
pub use quote::{CheckReport, CoinQuote, GlobalMetrics, QuoteFields, QuoteSnapshot};
