//! 发电计算引擎
//!
//! 纯函数：不做 I/O，不持有状态，相同输入得到逐位相同的输出（NaN 除外）。
//!
//! 三项计算：
//! 1. **总价值**：每台发电机 `Σ energy * price * valueFactor`
//! 2. **每日最高排放**：燃气 + 燃煤机组，按日期取 `energy * emissionsRating * emissionFactor` 最大者
//! 3. **实际热耗率**：燃煤机组 `totalHeatInput / actualNetGeneration`

use std::collections::HashMap;

use chrono::{DateTime, FixedOffset};

use crate::models::{
    ActualHeatRate, GenerationOutput, Generator, GeneratorClass, GeneratorKind, GeneratorTotal, MaxEmissionDay,
    ReferenceData, Report,
};

/// 风电位置标签：海上
pub const OFFSHORE: &str = "Offshore";

/// 计算输出
///
/// # 参数
/// - `report`: 发电报告
/// - `reference`: 参考数据
///
/// # 返回
/// 任一参数缺失时返回三个集合都为空的输出，不视为错误
pub fn calculate(report: Option<&Report>, reference: Option<&ReferenceData>) -> GenerationOutput {
    let (Some(report), Some(reference)) = (report, reference) else {
        return GenerationOutput::default();
    };

    GenerationOutput {
        totals: generator_totals(report, reference),
        max_emission_generators: max_emission_generators(report, reference),
        actual_heat_rates: actual_heat_rates(report),
    }
}

/// 每台发电机的总价值，顺序为 风电 → 燃气 → 燃煤
fn generator_totals(report: &Report, reference: &ReferenceData) -> Vec<GeneratorTotal> {
    report
        .enumerate()
        .map(|generator| {
            let value_factor = value_factor(generator, reference);
            let total = generator
                .generation
                .iter()
                .map(|day| day.energy * day.price * value_factor)
                .sum();

            GeneratorTotal {
                name: generator.name.clone(),
                total,
            }
        })
        .collect()
}

/// 每个日期保留排放最高的机组
///
/// 扫描顺序为燃气 → 燃煤，只有严格大于当前值才替换，相同值保留先出现者。
/// 结果按日期首次出现的顺序排列。
fn max_emission_generators(report: &Report, reference: &ReferenceData) -> Vec<MaxEmissionDay> {
    let mut days: Vec<MaxEmissionDay> = Vec::new();
    let mut index_by_date: HashMap<DateTime<FixedOffset>, usize> = HashMap::new();

    let emitters = report
        .of_class(GeneratorClass::Gas)
        .chain(report.of_class(GeneratorClass::Coal));

    for generator in emitters {
        let Some((emissions_rating, emission_factor)) = emission_inputs(generator, reference) else {
            continue;
        };

        for day in &generator.generation {
            let emission = day.energy * emissions_rating * emission_factor;

            match index_by_date.get(&day.date) {
                Some(&index) => {
                    if emission > days[index].emission {
                        days[index] = MaxEmissionDay {
                            name: generator.name.clone(),
                            date: day.date,
                            emission,
                        };
                    }
                }
                None => {
                    index_by_date.insert(day.date, days.len());
                    days.push(MaxEmissionDay {
                        name: generator.name.clone(),
                        date: day.date,
                        emission,
                    });
                }
            }
        }
    }

    days
}

/// 燃煤机组热耗率，净发电量为 0 时为 NaN
fn actual_heat_rates(report: &Report) -> Vec<ActualHeatRate> {
    report
        .of_class(GeneratorClass::Coal)
        .filter_map(|generator| match generator.kind {
            GeneratorKind::Coal {
                total_heat_input,
                actual_net_generation,
                ..
            } => Some(ActualHeatRate {
                name: generator.name.clone(),
                heat_rate: heat_rate(total_heat_input, actual_net_generation),
            }),
            _ => None,
        })
        .collect()
}

fn heat_rate(total_heat_input: f64, actual_net_generation: f64) -> f64 {
    if actual_net_generation == 0.0 {
        f64::NAN
    } else {
        total_heat_input / actual_net_generation
    }
}

fn value_factor(generator: &Generator, reference: &ReferenceData) -> f64 {
    match &generator.kind {
        GeneratorKind::Wind { location } if location.as_deref() == Some(OFFSHORE) => reference.value_factor.low,
        GeneratorKind::Wind { .. } => reference.value_factor.high,
        GeneratorKind::Gas { .. } | GeneratorKind::Coal { .. } => reference.value_factor.medium,
    }
}

/// (排放率, 排放系数)；风电没有排放
fn emission_inputs(generator: &Generator, reference: &ReferenceData) -> Option<(f64, f64)> {
    match generator.kind {
        GeneratorKind::Wind { .. } => None,
        GeneratorKind::Gas { emissions_rating } => Some((emissions_rating, reference.emissions_factor.medium)),
        GeneratorKind::Coal { emissions_rating, .. } => Some((emissions_rating, reference.emissions_factor.high)),
    }
}
