pub mod cancel;
pub mod detector;
pub mod progress;
pub mod report;
pub mod scanner;
