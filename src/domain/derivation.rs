use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::domain::rule::{CategoryRule, RuleTable};
use crate::domain::urgency::{UrgencyClassifier, UrgencyLevel};

/// Routing and priority metadata merged into a ticket before it is stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivationResult {
    pub assigned_dept: String,
    pub assigned_unit: String,
    pub sla_hours: u32,
    pub ai_urgency: UrgencyLevel,
}

/// Stateless derivation over an immutable rule table and keyword lists.
///
/// Every input yields a result: unknown categories use the fallback rule and
/// empty descriptions classify as `Media`.
#[derive(Debug, Clone, Default)]
pub struct DerivationEngine {
    rules: RuleTable,
    classifier: UrgencyClassifier,
}

impl DerivationEngine {
    pub fn new(rules: RuleTable, classifier: UrgencyClassifier) -> Self {
        Self { rules, classifier }
    }

    pub fn builtin() -> Self {
        Self::new(RuleTable::builtin(), UrgencyClassifier::builtin())
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn classifier(&self) -> &UrgencyClassifier {
        &self.classifier
    }

    pub fn lookup_rule(&self, category_key: &str) -> &CategoryRule {
        self.rules.lookup(category_key)
    }

    pub fn classify_urgency(&self, description: Option<&str>, category_key: &str) -> UrgencyLevel {
        self.classifier.classify(description, category_key)
    }

    pub fn derive(&self, category_key: &str, description: Option<&str>) -> DerivationResult {
        if !self.rules.contains(category_key) {
            tracing::debug!(category = category_key, "no rule for category, routing to fallback");
        }
        let rule = self.lookup_rule(category_key);
        DerivationResult {
            assigned_dept: rule.department.clone(),
            assigned_unit: rule.unit.clone(),
            sla_hours: rule.sla_hours,
            ai_urgency: self.classify_urgency(description, category_key),
        }
    }
}

static BUILTIN_ENGINE: LazyLock<DerivationEngine> = LazyLock::new(DerivationEngine::builtin);

pub fn lookup_rule(category_key: &str) -> &'static CategoryRule {
    BUILTIN_ENGINE.lookup_rule(category_key)
}

pub fn classify_urgency(description: Option<&str>, category_key: &str) -> UrgencyLevel {
    BUILTIN_ENGINE.classify_urgency(description, category_key)
}

pub fn derive(category_key: &str, description: &str) -> DerivationResult {
    BUILTIN_ENGINE.derive(category_key, Some(description))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expected(dept: &str, unit: &str, sla_hours: u32, urgency: UrgencyLevel) -> DerivationResult {
        DerivationResult {
            assigned_dept: dept.to_string(),
            assigned_unit: unit.to_string(),
            sla_hours,
            ai_urgency: urgency,
        }
    }

    #[test]
    fn routes_rural_request() {
        assert_eq!(
            derive("Rural", "Necesito ayuda con mi siembra"),
            expected("UDEL", "PDTI", 48, UrgencyLevel::Media)
        );
    }

    #[test]
    fn keyword_escalation_keeps_category_sla() {
        assert_eq!(
            derive(
                "Caminos",
                "Hay un incendio junto al camino principal, es urgente"
            ),
            expected("DOM", "Caminos / Operaciones", 72, UrgencyLevel::Alta)
        );
    }

    #[test]
    fn sensitive_category_escalates() {
        assert_eq!(
            derive("Seguridad", "Hay ruido en la plaza"),
            expected("DIDECO", "Seguridad Pública", 2, UrgencyLevel::Alta)
        );
    }

    #[test]
    fn unknown_category_and_empty_text_fall_back() {
        assert_eq!(
            derive("Desconocida123", ""),
            expected("Alcaldía", "Alcaldía", 48, UrgencyLevel::Media)
        );
    }

    #[test]
    fn routes_business_license_request() {
        assert_eq!(
            derive("Patentes", "Quiero renovar mi patente comercial"),
            expected("DAF", "Rentas y Patentes", 120, UrgencyLevel::Media)
        );
    }

    #[test]
    fn missing_description_is_handled() {
        let engine = DerivationEngine::builtin();
        let result = engine.derive("Salud", None);
        assert_eq!(result.assigned_unit, "Farmacia / Posta");
        assert_eq!(result.ai_urgency, UrgencyLevel::Media);
    }

    #[test]
    fn derivation_is_total_and_deterministic() {
        let long = "peligro ".repeat(5_000);
        let inputs = [
            ("", ""),
            ("Rural", "\u{0}\u{7f}"),
            ("🚒", "ÍNCENDIO"),
            ("Seguridad", long.as_str()),
            ("Juzgado", "   "),
        ];
        for (category, description) in inputs {
            let first = derive(category, description);
            let second = derive(category, description);
            assert_eq!(first, second);
            assert!(first.sla_hours > 0);
            assert!(matches!(
                first.ai_urgency,
                UrgencyLevel::Media | UrgencyLevel::Alta
            ));
        }
    }

    #[test]
    fn free_functions_match_builtin_engine() {
        let engine = DerivationEngine::builtin();
        assert_eq!(lookup_rule("Vivienda"), engine.lookup_rule("Vivienda"));
        assert_eq!(
            classify_urgency(Some("riesgo de derrumbe"), "Obras"),
            UrgencyLevel::Alta
        );
    }

    #[test]
    fn custom_engine_uses_configured_rules() {
        let rules = RuleTable::from_rules(vec![CategoryRule::new("Aseo", "Aseo y Ornato", 36, "DOM")])
            .unwrap();
        let engine = DerivationEngine::new(rules, UrgencyClassifier::builtin());
        let result = engine.derive("Aseo", Some("Basura acumulada"));
        assert_eq!(result, expected("DOM", "Aseo y Ornato", 36, UrgencyLevel::Media));
        assert_eq!(engine.derive("Rural", None).assigned_dept, "Alcaldía");
    }

    #[test]
    fn serializes_result_fields() {
        let value = serde_json::to_value(derive("Seguridad", "")).unwrap();
        assert_eq!(value["assigned_dept"], "DIDECO");
        assert_eq!(value["sla_hours"], 2);
        assert_eq!(value["ai_urgency"], "Media");
    }
}
