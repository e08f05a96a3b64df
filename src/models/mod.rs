pub mod output;
pub mod reference;
pub mod report;

pub use output::{ActualHeatRate, GenerationOutput, GeneratorTotal, MaxEmissionDay};
pub use reference::{FactorTier, ReferenceData};
pub use report::{DailyRecord, Generator, GeneratorClass, GeneratorKind, Report};
