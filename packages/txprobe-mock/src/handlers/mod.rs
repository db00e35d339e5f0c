//! HTTP endpoint implementations for login and statement execution.

pub mod login;
pub mod query;
pub mod request_utils;
pub mod response;

pub use login::login;
pub use query::{query, query_result};
pub use response::{codes, failure, success};
