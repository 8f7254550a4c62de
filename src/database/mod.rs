mod connection;

pub use connection::{check_health, Database};
