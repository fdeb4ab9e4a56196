use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

pub const FALLBACK_DEPARTMENT: &str = "Alcaldía";
pub const FALLBACK_UNIT: &str = "Alcaldía";
pub const FALLBACK_SLA_HOURS: u32 = 48;

/// Routing entry for one citizen-selectable category.
///
/// `unit` must match the unit names known to the persistence layer, since
/// downstream screens look units up by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryRule {
    #[serde(rename = "category")]
    pub category_key: String,
    pub unit: String,
    pub sla_hours: u32,
    pub department: String,
}

impl CategoryRule {
    pub fn new(category_key: &str, unit: &str, sla_hours: u32, department: &str) -> Self {
        Self {
            category_key: category_key.to_string(),
            unit: unit.to_string(),
            sla_hours,
            department: department.to_string(),
        }
    }

    pub fn fallback() -> Self {
        Self::new("", FALLBACK_UNIT, FALLBACK_SLA_HOURS, FALLBACK_DEPARTMENT)
    }
}

const BUILTIN_RULES: &[(&str, &str, u32, &str)] = &[
    // UDEL
    ("Rural", "PDTI", 48, "UDEL"),
    ("Agricola", "Prodesal", 48, "UDEL"),
    ("Ambiente", "Medio Ambiente", 24, "UDEL"),
    ("Turismo", "Turismo", 72, "UDEL"),
    // DIDECO
    ("Social", "Social", 24, "DIDECO"),
    ("Vivienda", "Vivienda", 96, "DIDECO"),
    ("Laboral", "OMIL", 48, "DIDECO"),
    ("Seguridad", "Seguridad Pública", 2, "DIDECO"),
    // DOM
    ("Caminos", "Caminos / Operaciones", 72, "DOM"),
    ("Alumbrado", "Alumbrado", 48, "DOM"),
    ("Obras", "Caminos / Operaciones", 72, "DOM"),
    // DAF
    ("Patentes", "Rentas y Patentes", 120, "DAF"),
    ("Salud", "Farmacia / Posta", 24, "Salud"),
    ("Juzgado", "Juzgado Policía Local", 144, "Justicia"),
];

/// Immutable category table. Built once at startup, read-only afterwards.
#[derive(Debug, Clone)]
pub struct RuleTable {
    rules: HashMap<String, CategoryRule>,
    fallback: CategoryRule,
}

impl RuleTable {
    pub fn builtin() -> Self {
        let rules = BUILTIN_RULES
            .iter()
            .map(|(key, unit, sla, dept)| {
                (key.to_string(), CategoryRule::new(key, unit, *sla, dept))
            })
            .collect();
        Self {
            rules,
            fallback: CategoryRule::fallback(),
        }
    }

    /// Builds a table from configured rules, rejecting duplicate keys and
    /// zero SLAs.
    pub fn from_rules(rules: Vec<CategoryRule>) -> AppResult<Self> {
        let mut table = HashMap::with_capacity(rules.len());
        for rule in rules {
            if rule.sla_hours == 0 {
                return Err(AppError::Configuration(format!(
                    "rule '{}' must have a positive sla_hours",
                    rule.category_key
                )));
            }
            if table.contains_key(&rule.category_key) {
                return Err(AppError::Configuration(format!(
                    "duplicate rule for category '{}'",
                    rule.category_key
                )));
            }
            table.insert(rule.category_key.clone(), rule);
        }
        Ok(Self {
            rules: table,
            fallback: CategoryRule::fallback(),
        })
    }

    /// Exact, case-sensitive lookup. Unknown keys resolve to the mayor's
    /// office for manual re-triage.
    pub fn lookup(&self, category_key: &str) -> &CategoryRule {
        self.rules.get(category_key).unwrap_or(&self.fallback)
    }

    pub fn fallback(&self) -> &CategoryRule {
        &self.fallback
    }

    pub fn contains(&self, category_key: &str) -> bool {
        self.rules.contains_key(category_key)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Rules sorted by category key.
    pub fn rules(&self) -> Vec<&CategoryRule> {
        let mut rules = self.rules.values().collect::<Vec<_>>();
        rules.sort_by(|a, b| a.category_key.cmp(&b.category_key));
        rules
    }
}

impl Default for RuleTable {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_table_has_all_categories() {
        let table = RuleTable::builtin();
        assert_eq!(table.len(), 14);
        assert!(table.rules().iter().all(|rule| rule.sla_hours > 0));
    }

    #[test]
    fn looks_up_exact_category() {
        let table = RuleTable::builtin();
        let rule = table.lookup("Patentes");
        assert_eq!(rule.department, "DAF");
        assert_eq!(rule.unit, "Rentas y Patentes");
        assert_eq!(rule.sla_hours, 120);
    }

    #[test]
    fn lookup_is_case_sensitive() {
        let table = RuleTable::builtin();
        assert!(!table.contains("rural"));
        assert_eq!(table.lookup("rural").department, FALLBACK_DEPARTMENT);
    }

    #[test]
    fn unknown_categories_fall_back_to_mayor_office() {
        let table = RuleTable::builtin();
        let long = "x".repeat(10_000);
        for key in ["", "Desconocida123", "Ñandú 🚜", " Rural", long.as_str()] {
            let rule = table.lookup(key);
            assert_eq!(rule.department, "Alcaldía");
            assert_eq!(rule.unit, "Alcaldía");
            assert_eq!(rule.sla_hours, 48);
        }
    }

    #[test]
    fn rejects_duplicate_rules() {
        let err = RuleTable::from_rules(vec![
            CategoryRule::new("Rural", "PDTI", 48, "UDEL"),
            CategoryRule::new("Rural", "Prodesal", 24, "UDEL"),
        ])
        .unwrap_err();
        assert!(matches!(err, AppError::Configuration(_)));
    }

    #[test]
    fn rejects_zero_sla() {
        let err = RuleTable::from_rules(vec![CategoryRule::new("Rural", "PDTI", 0, "UDEL")])
            .unwrap_err();
        assert!(err.to_string().contains("sla_hours"));
    }
}
