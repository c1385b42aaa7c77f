//! Result envelopes and their message texts

pub mod messages;
mod result_status;

pub use result_status::{ResultStatus, StatusLine, HTTP_INTERNAL_SERVER_ERROR, HTTP_OK};
