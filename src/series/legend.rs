//! Legend templates
//!
//! `{{ label }}` placeholders in a legend are replaced with the series'
//! label values. Placeholders naming unknown labels stay as written.

use regex::{Captures, Regex};
use std::sync::OnceLock;

fn placeholder() -> &'static Regex {
    static PLACEHOLDER: OnceLock<Regex> = OnceLock::new();
    PLACEHOLDER.get_or_init(|| {
        Regex::new(r"\{\{\s*(.+?)\s*\}\}")
            .unwrap_or_else(|e| unreachable!("legend placeholder pattern is invalid: {}", e))
    })
}

/// Formats series names from one legend template
#[derive(Debug, Clone)]
pub struct LegendFormatter {
    template: String,
}

impl LegendFormatter {
    pub fn new(template: &str) -> Self {
        Self {
            template: template.trim().to_string(),
        }
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    /// Substitute `labels` into the template
    ///
    /// Every placeholder is resolved against the template as written, so
    /// inserted values are never expanded again.
    pub fn format(&self, labels: &[(String, String)]) -> String {
        if !self.template.contains("{{") {
            return self.template.clone();
        }

        placeholder()
            .replace_all(&self.template, |caps: &Captures| {
                let name = &caps[1];
                match labels.iter().find(|(label, _)| label == name) {
                    Some((_, value)) => value.clone(),
                    None => caps[0].to_string(),
                }
            })
            .into_owned()
    }
}

/// Series name used when the legend renders empty
pub fn default_series_name(metric_name: &str, labels: &[(String, String)]) -> String {
    if labels.is_empty() {
        return metric_name.to_string();
    }
    labels
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_template_without_placeholders_unchanged() {
        let legend = LegendFormatter::new("  total  ");
        assert_eq!(legend.format(&labels(&[("host", "a")])), "total");
    }

    #[test]
    fn test_substitution_tolerates_whitespace() {
        let legend = LegendFormatter::new("{{host}} / {{  zone }}");
        assert_eq!(legend.format(&labels(&[("host", "a"), ("zone", "eu")])), "a / eu");
        assert_eq!(legend.format(&labels(&[("host", "b"), ("zone", "us")])), "b / us");
    }

    #[test]
    fn test_unknown_placeholder_left_in_place() {
        let legend = LegendFormatter::new("{{host}}-{{missing}}");
        assert_eq!(legend.format(&labels(&[("host", "a")])), "a-{{missing}}");
    }

    #[test]
    fn test_values_inserted_literally() {
        let legend = LegendFormatter::new("{{path}}");
        assert_eq!(legend.format(&labels(&[("path", "$1 {{x}}")])), "$1 {{x}}");
    }

    #[test]
    fn test_value_naming_another_label_not_expanded() {
        let legend = LegendFormatter::new("{{a}}");
        assert_eq!(legend.format(&labels(&[("a", "{{b}}"), ("b", "x")])), "{{b}}");

        let legend = LegendFormatter::new("{{a}}/{{b}}");
        assert_eq!(legend.format(&labels(&[("a", "{{b}}"), ("b", "x")])), "{{b}}/x");
    }

    #[test]
    fn test_label_names_with_regex_characters() {
        let legend = LegendFormatter::new("{{ tags['env'] }}");
        assert_eq!(legend.format(&labels(&[("tags['env']", "prod")])), "prod");
    }

    #[test]
    fn test_default_series_name() {
        assert_eq!(default_series_name("cpu", &[]), "cpu");
        assert_eq!(
            default_series_name("cpu", &labels(&[("host", "a"), ("zone", "eu")])),
            "host=a, zone=eu"
        );
    }
}
