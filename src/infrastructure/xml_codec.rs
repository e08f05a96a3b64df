//! XML 编解码器 - 基础设施层
//!
//! 只负责"文档 ↔ 模型"的转换，不认识目录、调度或计算。
//!
//! 三种文档：
//! - `GenerationReport`：输入报告
//! - `ReferenceData`：参考系数
//! - `GenerationOutput`：计算结果

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::CodecError;
use crate::models::{
    ActualHeatRate, DailyRecord, FactorTier, GenerationOutput, Generator, GeneratorKind, GeneratorTotal,
    MaxEmissionDay, ReferenceData, Report,
};

const XML_DECLARATION: &str = "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n";

/// 编解码能力
///
/// 流方法是必须实现的；基于路径的方法默认打开文件后委托给流方法。
/// 所有方法都是阻塞的，调用方负责放到阻塞线程池中执行。
pub trait Codec: Send + Sync {
    fn read_report(&self, reader: &mut dyn BufRead) -> Result<Report, CodecError>;

    fn read_reference(&self, reader: &mut dyn BufRead) -> Result<ReferenceData, CodecError>;

    fn write_output(&self, output: &GenerationOutput, writer: &mut dyn Write) -> Result<(), CodecError>;

    fn read_output(&self, reader: &mut dyn BufRead) -> Result<GenerationOutput, CodecError>;

    fn decode_report(&self, path: &Path) -> Result<Report, CodecError> {
        let mut reader = open(path)?;
        self.read_report(&mut reader)
    }

    fn decode_reference(&self, path: &Path) -> Result<ReferenceData, CodecError> {
        let mut reader = open(path)?;
        self.read_reference(&mut reader)
    }

    fn encode_output(&self, output: &GenerationOutput, path: &Path) -> Result<(), CodecError> {
        let file = File::create(path).map_err(|e| CodecError::io(path, e))?;
        let mut writer = BufWriter::new(file);
        self.write_output(output, &mut writer)?;
        writer.flush().map_err(|e| CodecError::io(path, e))
    }

    fn decode_output(&self, path: &Path) -> Result<GenerationOutput, CodecError> {
        let mut reader = open(path)?;
        self.read_output(&mut reader)
    }
}

fn open(path: &Path) -> Result<BufReader<File>, CodecError> {
    File::open(path)
        .map(BufReader::new)
        .map_err(|e| CodecError::io(path, e))
}

/// 基于 quick-xml + serde 的实现
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlCodec;

impl XmlCodec {
    pub fn new() -> Self {
        Self
    }
}

impl Codec for XmlCodec {
    fn read_report(&self, reader: &mut dyn BufRead) -> Result<Report, CodecError> {
        let document: ReportXml = quick_xml::de::from_reader(reader)?;
        document.into_report()
    }

    fn read_reference(&self, reader: &mut dyn BufRead) -> Result<ReferenceData, CodecError> {
        let document: ReferenceXml = quick_xml::de::from_reader(reader)?;
        Ok(document.into_reference())
    }

    fn write_output(&self, output: &GenerationOutput, writer: &mut dyn Write) -> Result<(), CodecError> {
        let document = OutputXml::from_output(output);

        let mut xml = String::from(XML_DECLARATION);
        let mut serializer = quick_xml::se::Serializer::new(&mut xml);
        serializer.indent(' ', 2);
        document.serialize(serializer)?;
        xml.push('\n');

        writer.write_all(xml.as_bytes()).map_err(CodecError::Stream)?;
        writer.flush().map_err(CodecError::Stream)
    }

    fn read_output(&self, reader: &mut dyn BufRead) -> Result<GenerationOutput, CodecError> {
        let document: OutputXml = quick_xml::de::from_reader(reader)?;
        document.into_output()
    }
}

// ========== 日期 ==========

/// 解析日期
///
/// 支持 RFC 3339、无时区的 `YYYY-MM-DDTHH:MM:SS`（按 UTC 处理）以及纯日期 `YYYY-MM-DD`
fn parse_date(value: &str) -> Result<DateTime<FixedOffset>, CodecError> {
    let trimmed = value.trim();

    if let Ok(date) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(date);
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, "%Y-%m-%dT%H:%M:%S%.f") {
        return Ok(naive.and_utc().fixed_offset());
    }
    if let Some(naive) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
    {
        return Ok(naive.and_utc().fixed_offset());
    }

    Err(CodecError::InvalidDate {
        value: value.to_string(),
    })
}

fn format_date(date: &DateTime<FixedOffset>) -> String {
    date.to_rfc3339()
}

// ========== 报告文档 ==========

#[derive(Debug, Default, Deserialize)]
#[serde(rename = "GenerationReport")]
struct ReportXml {
    #[serde(rename = "Wind", default)]
    wind: WindListXml,
    #[serde(rename = "Gas", default)]
    gas: GasListXml,
    #[serde(rename = "Coal", default)]
    coal: CoalListXml,
}

#[derive(Debug, Default, Deserialize)]
struct WindListXml {
    #[serde(rename = "WindGenerator", default)]
    generators: Vec<WindGeneratorXml>,
}

#[derive(Debug, Default, Deserialize)]
struct GasListXml {
    #[serde(rename = "GasGenerator", default)]
    generators: Vec<GasGeneratorXml>,
}

#[derive(Debug, Default, Deserialize)]
struct CoalListXml {
    #[serde(rename = "CoalGenerator", default)]
    generators: Vec<CoalGeneratorXml>,
}

#[derive(Debug, Deserialize)]
struct WindGeneratorXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Generation", default)]
    generation: GenerationXml,
    #[serde(rename = "Location", default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GasGeneratorXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Generation", default)]
    generation: GenerationXml,
    #[serde(rename = "EmissionsRating", default)]
    emissions_rating: f64,
}

#[derive(Debug, Deserialize)]
struct CoalGeneratorXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Generation", default)]
    generation: GenerationXml,
    #[serde(rename = "TotalHeatInput", default)]
    total_heat_input: f64,
    #[serde(rename = "ActualNetGeneration", default)]
    actual_net_generation: f64,
    #[serde(rename = "EmissionsRating", default)]
    emissions_rating: f64,
}

#[derive(Debug, Default, Deserialize)]
struct GenerationXml {
    #[serde(rename = "Day", default)]
    days: Vec<DayXml>,
}

#[derive(Debug, Deserialize)]
struct DayXml {
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Energy", default)]
    energy: f64,
    #[serde(rename = "Price", default)]
    price: f64,
}

impl GenerationXml {
    fn into_records(self) -> Result<Vec<DailyRecord>, CodecError> {
        self.days
            .into_iter()
            .map(|day| Ok(DailyRecord::new(parse_date(&day.date)?, day.energy, day.price)))
            .collect()
    }
}

impl ReportXml {
    fn into_report(self) -> Result<Report, CodecError> {
        let mut generators = Vec::with_capacity(
            self.wind.generators.len() + self.gas.generators.len() + self.coal.generators.len(),
        );

        for g in self.wind.generators {
            generators.push(Generator {
                name: g.name,
                generation: g.generation.into_records()?,
                kind: GeneratorKind::Wind {
                    location: g.location,
                },
            });
        }
        for g in self.gas.generators {
            generators.push(Generator {
                name: g.name,
                generation: g.generation.into_records()?,
                kind: GeneratorKind::Gas {
                    emissions_rating: g.emissions_rating,
                },
            });
        }
        for g in self.coal.generators {
            generators.push(Generator {
                name: g.name,
                generation: g.generation.into_records()?,
                kind: GeneratorKind::Coal {
                    total_heat_input: g.total_heat_input,
                    actual_net_generation: g.actual_net_generation,
                    emissions_rating: g.emissions_rating,
                },
            });
        }

        Ok(Report::new(generators))
    }
}

// ========== 参考数据文档 ==========

#[derive(Debug, Default, Deserialize)]
#[serde(rename = "ReferenceData")]
struct ReferenceXml {
    #[serde(rename = "Factors", default)]
    factors: FactorsXml,
}

#[derive(Debug, Default, Deserialize)]
struct FactorsXml {
    #[serde(rename = "ValueFactor", default)]
    value_factor: TierXml,
    #[serde(rename = "EmissionsFactor", default)]
    emissions_factor: TierXml,
}

#[derive(Debug, Default, Deserialize)]
struct TierXml {
    #[serde(rename = "High", default)]
    high: f64,
    #[serde(rename = "Medium", default)]
    medium: f64,
    #[serde(rename = "Low", default)]
    low: f64,
}

impl From<TierXml> for FactorTier {
    fn from(tier: TierXml) -> Self {
        FactorTier::new(tier.high, tier.medium, tier.low)
    }
}

impl ReferenceXml {
    fn into_reference(self) -> ReferenceData {
        ReferenceData::new(self.factors.value_factor.into(), self.factors.emissions_factor.into())
    }
}

// ========== 输出文档 ==========

#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(rename = "GenerationOutput")]
struct OutputXml {
    #[serde(rename = "Totals", default)]
    totals: TotalsXml,
    #[serde(rename = "MaxEmissionGenerators", default)]
    max_emission_generators: MaxEmissionsXml,
    #[serde(rename = "ActualHeatRates", default)]
    actual_heat_rates: HeatRatesXml,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct TotalsXml {
    #[serde(rename = "Generator", default)]
    generators: Vec<GeneratorTotalXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MaxEmissionsXml {
    #[serde(rename = "Day", default)]
    days: Vec<MaxEmissionDayXml>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct HeatRatesXml {
    #[serde(rename = "CoalGenerator", default)]
    generators: Vec<HeatRateXml>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeneratorTotalXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Total")]
    total: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct MaxEmissionDayXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "Date")]
    date: String,
    #[serde(rename = "Emission")]
    emission: f64,
}

#[derive(Debug, Serialize, Deserialize)]
struct HeatRateXml {
    #[serde(rename = "Name", default)]
    name: String,
    #[serde(rename = "HeatRate")]
    heat_rate: f64,
}

impl OutputXml {
    fn from_output(output: &GenerationOutput) -> Self {
        Self {
            totals: TotalsXml {
                generators: output
                    .totals
                    .iter()
                    .map(|t| GeneratorTotalXml {
                        name: t.name.clone(),
                        total: t.total,
                    })
                    .collect(),
            },
            max_emission_generators: MaxEmissionsXml {
                days: output
                    .max_emission_generators
                    .iter()
                    .map(|d| MaxEmissionDayXml {
                        name: d.name.clone(),
                        date: format_date(&d.date),
                        emission: d.emission,
                    })
                    .collect(),
            },
            actual_heat_rates: HeatRatesXml {
                generators: output
                    .actual_heat_rates
                    .iter()
                    .map(|h| HeatRateXml {
                        name: h.name.clone(),
                        heat_rate: h.heat_rate,
                    })
                    .collect(),
            },
        }
    }

    fn into_output(self) -> Result<GenerationOutput, CodecError> {
        let max_emission_generators = self
            .max_emission_generators
            .days
            .into_iter()
            .map(|d| {
                Ok(MaxEmissionDay {
                    name: d.name,
                    date: parse_date(&d.date)?,
                    emission: d.emission,
                })
            })
            .collect::<Result<Vec<_>, CodecError>>()?;

        Ok(GenerationOutput {
            totals: self
                .totals
                .generators
                .into_iter()
                .map(|t| GeneratorTotal {
                    name: t.name,
                    total: t.total,
                })
                .collect(),
            max_emission_generators,
            actual_heat_rates: self
                .actual_heat_rates
                .generators
                .into_iter()
                .map(|h| ActualHeatRate {
                    name: h.name,
                    heat_rate: h.heat_rate,
                })
                .collect(),
        })
    }
}
