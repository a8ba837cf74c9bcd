mod cents;

pub mod op;

pub use cents::{Cents, MoneyError, DEFAULT_CURRENCY_CODE};
