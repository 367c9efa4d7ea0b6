#![forbid(unsafe_code)]

pub mod api;
pub mod http;
pub mod memory;
pub mod sse;

pub use api::{BackendError, ExamBackend, SubmissionStatus, TakePaper};
pub use http::{BackendConfig, HttpBackend};
pub use memory::InMemoryBackend;
pub use sse::{ProgressStream, SseParser};
