//! Request/response logging for outgoing HTTP calls.
//!
//! Bodies and headers pass through the redaction engine before they are
//! written to a [`LogSink`](crate::logger::LogSink). The helpers in [`body`]
//! are pure and can be used without the wrapper.

pub mod body;
pub mod wrapper;

pub use body::{
    BodyKind, TRUNCATED_MARKER, classify_body, is_body_loggable, normalize_content_type,
    render_body, should_capture_body, should_capture_by_length, truncate_body,
};
pub use wrapper::{BODY_READ_TIMED_OUT, HttpCallLogger, HttpLogError, LoggedResponse, ResponseBody};
