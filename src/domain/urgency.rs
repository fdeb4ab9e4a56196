use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum UrgencyLevel {
    Baja,
    Media,
    Alta,
    #[serde(rename = "Crítica")]
    Critica,
}

impl UrgencyLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyLevel::Baja => "Baja",
            UrgencyLevel::Media => "Media",
            UrgencyLevel::Alta => "Alta",
            UrgencyLevel::Critica => "Crítica",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "baja" => Some(UrgencyLevel::Baja),
            "media" => Some(UrgencyLevel::Media),
            "alta" => Some(UrgencyLevel::Alta),
            "crítica" | "critica" => Some(UrgencyLevel::Critica),
            _ => None,
        }
    }
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

const DANGER_KEYWORDS: &[&str] = &[
    "grave", "urgente", "peligro", "riesgo", "muerte", "incendio", "robo",
];
const SENSITIVE_CATEGORIES: &[&str] = &["Seguridad", "Salud"];

/// Keyword-driven urgency heuristic. Deterministic substring matching only.
///
/// Only `Media` and `Alta` are ever produced; `Baja` and `Crítica` are set
/// manually by officials.
#[derive(Debug, Clone)]
pub struct UrgencyClassifier {
    danger_keywords: Vec<String>,
    sensitive_categories: Vec<String>,
}

impl UrgencyClassifier {
    pub fn new<K, C>(danger_keywords: K, sensitive_categories: C) -> Self
    where
        K: IntoIterator,
        K::Item: AsRef<str>,
        C: IntoIterator,
        C::Item: AsRef<str>,
    {
        Self {
            danger_keywords: danger_keywords
                .into_iter()
                .map(|k| k.as_ref().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
            sensitive_categories: sensitive_categories
                .into_iter()
                .map(|c| c.as_ref().to_string())
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new(DANGER_KEYWORDS, SENSITIVE_CATEGORIES)
    }

    pub fn danger_keywords(&self) -> &[String] {
        &self.danger_keywords
    }

    pub fn sensitive_categories(&self) -> &[String] {
        &self.sensitive_categories
    }

    pub fn classify(&self, description: Option<&str>, category_key: &str) -> UrgencyLevel {
        let Some(text) = description.filter(|text| !text.is_empty()) else {
            return UrgencyLevel::Media;
        };

        let lowered = text.to_lowercase();
        if self
            .danger_keywords
            .iter()
            .any(|keyword| lowered.contains(keyword.as_str()))
        {
            return UrgencyLevel::Alta;
        }

        if self
            .sensitive_categories
            .iter()
            .any(|category| category == category_key)
        {
            return UrgencyLevel::Alta;
        }

        UrgencyLevel::Media
    }
}

impl Default for UrgencyClassifier {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_description_is_media_even_for_sensitive_category() {
        let classifier = UrgencyClassifier::builtin();
        assert_eq!(classifier.classify(None, "Seguridad"), UrgencyLevel::Media);
        assert_eq!(classifier.classify(Some(""), "Salud"), UrgencyLevel::Media);
    }

    #[test]
    fn keywords_escalate_regardless_of_category() {
        let classifier = UrgencyClassifier::builtin();
        for keyword in DANGER_KEYWORDS {
            let text = format!("Vecino reporta {} en el sector", keyword.to_uppercase());
            assert_eq!(
                classifier.classify(Some(&text), "Turismo"),
                UrgencyLevel::Alta,
                "keyword {keyword}"
            );
        }
    }

    #[test]
    fn keywords_match_as_substrings() {
        let classifier = UrgencyClassifier::builtin();
        assert_eq!(
            classifier.classify(Some("Me robaron, fue un ROBO grande"), "Social"),
            UrgencyLevel::Alta
        );
        assert_eq!(
            classifier.classify(Some("Situación Urgentemente reportada"), "Social"),
            UrgencyLevel::Alta
        );
    }

    #[test]
    fn sensitive_categories_escalate_without_keywords() {
        let classifier = UrgencyClassifier::builtin();
        assert_eq!(
            classifier.classify(Some("Hay ruido en la plaza"), "Seguridad"),
            UrgencyLevel::Alta
        );
        assert_eq!(
            classifier.classify(Some("Necesito hora"), "Salud"),
            UrgencyLevel::Alta
        );
        assert_eq!(
            classifier.classify(Some("Necesito hora"), "salud"),
            UrgencyLevel::Media
        );
    }

    #[test]
    fn plain_requests_stay_media() {
        let classifier = UrgencyClassifier::builtin();
        assert_eq!(
            classifier.classify(Some("Quiero renovar mi patente comercial"), "Patentes"),
            UrgencyLevel::Media
        );
    }

    #[test]
    fn custom_keywords_are_lowercased() {
        let classifier = UrgencyClassifier::new(["DERRUMBE"], Vec::<String>::new());
        assert_eq!(
            classifier.classify(Some("hubo un derrumbe"), "Caminos"),
            UrgencyLevel::Alta
        );
        assert_eq!(
            classifier.classify(Some("hay peligro"), "Seguridad"),
            UrgencyLevel::Media
        );
    }

    #[test]
    fn parses_urgency_labels() {
        assert_eq!(UrgencyLevel::from_str("ALTA"), Some(UrgencyLevel::Alta));
        assert_eq!(UrgencyLevel::from_str("Crítica"), Some(UrgencyLevel::Critica));
        assert_eq!(UrgencyLevel::from_str("critica"), Some(UrgencyLevel::Critica));
        assert_eq!(UrgencyLevel::from_str("extrema"), None);
    }

    #[test]
    fn serializes_spanish_labels() {
        let json = serde_json::to_string(&UrgencyLevel::Critica).unwrap();
        assert_eq!(json, "\"Crítica\"");
        let parsed: UrgencyLevel = serde_json::from_str("\"Media\"").unwrap();
        assert_eq!(parsed, UrgencyLevel::Media);
    }
}
