//! 计算结果模型

use chrono::{DateTime, FixedOffset};

/// 单台发电机的总价值
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratorTotal {
    pub name: String,
    pub total: f64,
}

/// 某一天排放最高的发电机
#[derive(Debug, Clone, PartialEq)]
pub struct MaxEmissionDay {
    pub name: String,
    pub date: DateTime<FixedOffset>,
    pub emission: f64,
}

/// 燃煤机组的实际热耗率
///
/// 净发电量为 0 时 `heat_rate` 为 NaN。
#[derive(Debug, Clone, PartialEq)]
pub struct ActualHeatRate {
    pub name: String,
    pub heat_rate: f64,
}

/// 计算输出
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOutput {
    pub totals: Vec<GeneratorTotal>,
    pub max_emission_generators: Vec<MaxEmissionDay>,
    pub actual_heat_rates: Vec<ActualHeatRate>,
}

impl GenerationOutput {
    /// 三个集合是否都为空
    pub fn is_empty(&self) -> bool {
        self.totals.is_empty() && self.max_emission_generators.is_empty() && self.actual_heat_rates.is_empty()
    }
}
