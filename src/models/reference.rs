//! 参考数据：价值系数与排放系数

/// 三档系数（高 / 中 / 低），均为无量纲乘数，不做范围校验
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FactorTier {
    pub high: f64,
    pub medium: f64,
    pub low: f64,
}

impl FactorTier {
    pub fn new(high: f64, medium: f64, low: f64) -> Self {
        Self { high, medium, low }
    }
}

/// 参考数据
///
/// 每个任务都会从配置路径重新加载，不做缓存。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReferenceData {
    pub value_factor: FactorTier,
    pub emissions_factor: FactorTier,
}

impl ReferenceData {
    pub fn new(value_factor: FactorTier, emissions_factor: FactorTier) -> Self {
        Self {
            value_factor,
            emissions_factor,
        }
    }
}
