//! 计算层（Engine）
//!
//! 纯计算，不依赖任何 I/O 或运行时。

pub mod calculator;

pub use calculator::calculate;
