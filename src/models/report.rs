//! 发电报告模型
//!
//! 一份报告由若干发电机组成，按类别（风电 / 燃气 / 燃煤）区分。
//! 类别相关的字段放在 [`GeneratorKind`] 中，通用字段（名称、每日记录）放在 [`Generator`] 上。

use chrono::{DateTime, FixedOffset};

/// 单日发电记录
#[derive(Debug, Clone, PartialEq)]
pub struct DailyRecord {
    /// 日期
    pub date: DateTime<FixedOffset>,
    /// 发电量
    pub energy: f64,
    /// 单位电价
    pub price: f64,
}

impl DailyRecord {
    pub fn new(date: DateTime<FixedOffset>, energy: f64, price: f64) -> Self {
        Self {
            date,
            energy,
            price,
        }
    }
}

/// 发电机类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeneratorClass {
    Wind,
    Gas,
    Coal,
}

impl GeneratorClass {
    /// 枚举顺序：风电 → 燃气 → 燃煤
    pub const ALL: [GeneratorClass; 3] = [GeneratorClass::Wind, GeneratorClass::Gas, GeneratorClass::Coal];

    pub fn name(self) -> &'static str {
        match self {
            GeneratorClass::Wind => "Wind",
            GeneratorClass::Gas => "Gas",
            GeneratorClass::Coal => "Coal",
        }
    }
}

/// 类别相关字段
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratorKind {
    /// 风电，带位置标签（例如 "Offshore" / "Onshore"）
    Wind { location: Option<String> },
    /// 燃气，带排放率
    Gas { emissions_rating: f64 },
    /// 燃煤
    Coal {
        total_heat_input: f64,
        actual_net_generation: f64,
        emissions_rating: f64,
    },
}

impl GeneratorKind {
    pub fn class(&self) -> GeneratorClass {
        match self {
            GeneratorKind::Wind { .. } => GeneratorClass::Wind,
            GeneratorKind::Gas { .. } => GeneratorClass::Gas,
            GeneratorKind::Coal { .. } => GeneratorClass::Coal,
        }
    }
}

/// 发电机
#[derive(Debug, Clone, PartialEq)]
pub struct Generator {
    /// 名称（报告内应唯一，但不做校验）
    pub name: String,
    /// 按输入顺序排列的每日记录
    pub generation: Vec<DailyRecord>,
    pub kind: GeneratorKind,
}

impl Generator {
    /// 创建风电机组
    pub fn wind(name: impl Into<String>, location: Option<&str>, generation: Vec<DailyRecord>) -> Self {
        Self {
            name: name.into(),
            generation,
            kind: GeneratorKind::Wind {
                location: location.map(str::to_string),
            },
        }
    }

    /// 创建燃气机组
    pub fn gas(name: impl Into<String>, emissions_rating: f64, generation: Vec<DailyRecord>) -> Self {
        Self {
            name: name.into(),
            generation,
            kind: GeneratorKind::Gas { emissions_rating },
        }
    }

    /// 创建燃煤机组
    pub fn coal(
        name: impl Into<String>,
        total_heat_input: f64,
        actual_net_generation: f64,
        emissions_rating: f64,
        generation: Vec<DailyRecord>,
    ) -> Self {
        Self {
            name: name.into(),
            generation,
            kind: GeneratorKind::Coal {
                total_heat_input,
                actual_net_generation,
                emissions_rating,
            },
        }
    }

    pub fn class(&self) -> GeneratorClass {
        self.kind.class()
    }
}

/// 发电报告
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Report {
    pub generators: Vec<Generator>,
}

impl Report {
    pub fn new(generators: Vec<Generator>) -> Self {
        Self { generators }
    }

    /// 某一类别的发电机，保持输入顺序
    pub fn of_class(&self, class: GeneratorClass) -> impl Iterator<Item = &Generator> {
        self.generators.iter().filter(move |g| g.class() == class)
    }

    /// 按 风电 → 燃气 → 燃煤 的顺序枚举全部发电机
    pub fn enumerate(&self) -> impl Iterator<Item = &Generator> {
        GeneratorClass::ALL
            .into_iter()
            .flat_map(move |class| self.of_class(class))
    }

    pub fn count(&self, class: GeneratorClass) -> usize {
        self.of_class(class).count()
    }

    pub fn is_empty(&self) -> bool {
        self.generators.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enumerate_orders_by_class_then_input_order() {
        let report = Report::new(vec![
            Generator::coal("Coal[1]", 1.0, 1.0, 0.5, vec![]),
            Generator::gas("Gas[1]", 0.03, vec![]),
            Generator::wind("Wind[1]", Some("Onshore"), vec![]),
            Generator::gas("Gas[2]", 0.04, vec![]),
            Generator::wind("Wind[2]", None, vec![]),
        ]);

        let names: Vec<&str> = report.enumerate().map(|g| g.name.as_str()).collect();
        assert_eq!(names, ["Wind[1]", "Wind[2]", "Gas[1]", "Gas[2]", "Coal[1]"]);
        assert_eq!(report.count(GeneratorClass::Gas), 2);
    }
}
