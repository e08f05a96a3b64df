pub mod file_processor;
pub mod observer;

pub use file_processor::{FileProcessor, JobOutcome, JobReport};
pub use observer::{JobObserver, NoopObserver, TracingObserver};
