use serde::{Deserialize, Serialize};

/// Этап воронки продаж
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStage {
    pub id: String,
    #[serde(rename = "pipelineId")]
    pub pipeline_id: String,
    pub name: String,
    pub order: i32,
}

/// Воронка продаж вместе с её этапами
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Pipeline {
    pub id: String,
    pub name: String,
    #[serde(rename = "isDefault", default)]
    pub is_default: bool,
    #[serde(default)]
    pub stages: Vec<PipelineStage>,
}

/// Ключ сравнения названий этапов: пробелы схлопнуты, регистр не учитывается
/// (включая кириллицу)
pub fn stage_name_key(name: &str) -> String {
    name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

impl Pipeline {
    /// Поиск этапа по id, затем по ключу названия
    pub fn find_stage(&self, value: &str) -> Option<&PipelineStage> {
        let value = value.trim();
        let key = stage_name_key(value);
        self.stages
            .iter()
            .find(|s| s.id == value)
            .or_else(|| self.stages.iter().find(|s| stage_name_key(&s.name) == key))
    }

    /// Порядковый номер, следующий за последним существующим этапом
    pub fn next_stage_order(&self) -> i32 {
        self.stages.iter().map(|s| s.order).max().map_or(0, |m| m + 1)
    }

    /// Сопоставление значения ячейки с воронкой: по id, затем по названию
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        self.id == value || self.name.to_lowercase() == value.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> Pipeline {
        Pipeline {
            id: "p1".into(),
            name: "Продажи".into(),
            is_default: true,
            stages: vec![
                PipelineStage { id: "s1".into(), pipeline_id: "p1".into(), name: "Новая".into(), order: 0 },
                PipelineStage { id: "s2".into(), pipeline_id: "p1".into(), name: "Переговоры".into(), order: 3 },
            ],
        }
    }

    #[test]
    fn test_find_stage_by_id_or_name() {
        let p = pipeline();
        assert_eq!(p.find_stage("s2").map(|s| s.order), Some(3));
        assert_eq!(p.find_stage(" новая ").map(|s| s.id.as_str()), Some("s1"));
        assert!(p.find_stage("Закрыта").is_none());
    }

    #[test]
    fn test_find_stage_ignores_inner_spacing() {
        let mut p = pipeline();
        p.stages[1].name = "Новая стадия".into();
        assert_eq!(p.find_stage("новая  стадия").map(|s| s.id.as_str()), Some("s2"));
        assert_eq!(stage_name_key("  Пилот\tПРОЕКТ "), "пилот проект");
    }

    #[test]
    fn test_next_stage_order() {
        assert_eq!(pipeline().next_stage_order(), 4);
        let empty = Pipeline { stages: vec![], ..pipeline() };
        assert_eq!(empty.next_stage_order(), 0);
    }

    #[test]
    fn test_matches_name_case_insensitive() {
        assert!(pipeline().matches("ПРОДАЖИ"));
        assert!(pipeline().matches("p1"));
    }
}
