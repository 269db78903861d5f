//! Compose domain types as the service layer sees them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::ids::IdProvider;
use crate::label::{LabeledResource, Labels};
use crate::locale::{ResourceTranslation, Translatable};

pub const CHART_RESOURCE_TYPE: &str = "compose:chart";

const LOCALE_KEY_NAME: &str = "name";

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Namespace {
    #[serde(rename = "namespaceID", with = "string_id")]
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    #[serde(rename = "chartID", with = "string_id")]
    pub id: u64,
    #[serde(rename = "namespaceID", with = "string_id")]
    pub namespace_id: u64,
    #[serde(default)]
    pub handle: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub config: ChartConfig,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Labels>,
    #[serde(default)]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Chart configuration. A value type: compared structurally.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartConfig {
    pub reports: Vec<ChartReport>,
    pub color_scheme: String,
    pub no_animation: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartReport {
    #[serde(rename = "reportID", with = "string_id")]
    pub report_id: u64,
    #[serde(rename = "moduleID", with = "string_id")]
    pub module_id: u64,
    pub filter: String,
    pub dimensions: Vec<Value>,
    pub metrics: Vec<ChartMetric>,
    /// Presentation keys (yAxis, legend, tooltip, ...) kept as-is.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartMetric {
    /// Accepted as number or string, written as string.
    #[serde(rename = "metricID", skip_serializing_if = "Option::is_none", with = "opt_string_id")]
    pub metric_id: Option<u64>,
    pub field: String,
    pub aggregate: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ChartConfig {
    /// Assigns IDs to reports and metrics that lack one. Existing IDs are never
    /// touched. Returns whether anything was assigned.
    pub fn generate_ids(&mut self, ids: &dyn IdProvider) -> bool {
        let mut assigned = false;
        for report in &mut self.reports {
            if report.report_id == 0 {
                report.report_id = ids.next_id();
                assigned = true;
            }
            for metric in &mut report.metrics {
                if metric.metric_id.unwrap_or(0) == 0 {
                    metric.metric_id = Some(ids.next_id());
                    assigned = true;
                }
            }
        }
        assigned
    }
}

/// Which charts a search returns with respect to soft deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterState {
    /// Only charts that are not deleted.
    #[default]
    Excluded,
    /// Deleted and live charts.
    Inclusive,
    /// Only deleted charts.
    Exclusive,
}

impl FilterState {
    pub fn admits(&self, deleted_at: Option<DateTime<Utc>>) -> bool {
        match self {
            FilterState::Excluded => deleted_at.is_none(),
            FilterState::Inclusive => true,
            FilterState::Exclusive => deleted_at.is_some(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartFilter {
    #[serde(rename = "namespaceID", with = "string_id")]
    pub namespace_id: u64,
    #[serde(rename = "chartID")]
    pub chart_id: Vec<u64>,
    pub handle: String,
    pub name: String,
    pub query: String,
    pub labels: Labels,
    /// Resolved from `labels` by the service; restricts the search when non-empty.
    #[serde(rename = "labeledIDs")]
    pub labeled_ids: Vec<u64>,
    pub deleted: FilterState,
    /// 0 means no limit.
    pub limit: u32,
    /// Keyset cursor: only charts with a greater ID. Advanced by the service
    /// while it pages past charts the caller may not read.
    #[serde(skip)]
    pub after_id: u64,
}

impl ChartFilter {
    pub fn for_namespace(namespace_id: u64) -> Self {
        Self { namespace_id, ..Self::default() }
    }
}

impl Chart {
    pub fn is_deleted(&self) -> bool { self.deleted_at.is_some() }
}

impl LabeledResource for Chart {
    fn label_resource_kind(&self) -> &'static str { CHART_RESOURCE_TYPE }
    fn label_resource_id(&self) -> u64 { self.id }
    fn labels(&self) -> Option<&Labels> { self.labels.as_ref() }
    fn set_labels(&mut self, labels: Labels) {
        self.labels = if labels.is_empty() { None } else { Some(labels) };
    }
}

fn metric_label_key(metric_id: u64) -> String { format!("metrics.{}.label", metric_id) }

impl Translatable for Chart {
    fn resource_translation(&self) -> String {
        format!("{}/{}/{}", CHART_RESOURCE_TYPE, self.namespace_id, self.id)
    }

    fn encode_translations(&self) -> Vec<ResourceTranslation> {
        let resource = self.resource_translation();
        let mut out = vec![ResourceTranslation {
            lang: String::new(),
            resource: resource.clone(),
            key: LOCALE_KEY_NAME.to_string(),
            msg: self.name.clone(),
        }];
        let labeled = self
            .config
            .reports
            .iter()
            .flat_map(|r| r.metrics.iter())
            .filter(|m| !m.label.is_empty());
        for m in labeled {
            if let Some(mid) = m.metric_id {
                out.push(ResourceTranslation {
                    lang: String::new(),
                    resource: resource.clone(),
                    key: metric_label_key(mid),
                    msg: m.label.clone(),
                });
            }
        }
        out
    }

    fn decode_translations(&mut self, bundle: &[ResourceTranslation]) {
        for t in bundle.iter().filter(|t| !t.msg.is_empty()) {
            if t.key == LOCALE_KEY_NAME {
                self.name = t.msg.clone();
                continue;
            }
            let metric = t
                .key
                .strip_prefix("metrics.")
                .and_then(|rest| rest.strip_suffix(".label"))
                .and_then(|id| id.parse::<u64>().ok());
            if let Some(mid) = metric {
                self.config
                    .reports
                    .iter_mut()
                    .flat_map(|r| r.metrics.iter_mut())
                    .filter(|m| m.metric_id == Some(mid))
                    .for_each(|m| m.label = t.msg.clone());
            }
        }
    }
}

/// u64 IDs serialized as decimal strings; numbers, empty strings and null are accepted.
pub(crate) mod string_id {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(id: &u64, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&id.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u64, D::Error> {
        parse(Value::deserialize(d)?).map_err(de::Error::custom)
    }

    pub(super) fn parse(v: Value) -> Result<u64, String> {
        match v {
            Value::Null => Ok(0),
            Value::Number(n) => n.as_u64().ok_or_else(|| format!("invalid ID: {}", n)),
            Value::String(s) if s.is_empty() => Ok(0),
            Value::String(s) => s.parse().map_err(|_| format!("invalid ID: {:?}", s)),
            other => Err(format!("invalid ID: {}", other)),
        }
    }
}

pub(crate) mod opt_string_id {
    use serde::{de, Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    pub fn serialize<S: Serializer>(id: &Option<u64>, s: S) -> Result<S::Ok, S::Error> {
        match id {
            Some(id) => s.serialize_str(&id.to_string()),
            None => s.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<u64>, D::Error> {
        let id = super::string_id::parse(Value::deserialize(d)?).map_err(de::Error::custom)?;
        Ok(if id == 0 { None } else { Some(id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::mock::Sequential;
    use serde_json::json;

    fn config_json() -> Value {
        json!({
            "reports": [{
                "reportID": "0",
                "moduleID": 42,
                "filter": "",
                "dimensions": [{"field": "createdAt"}],
                "metrics": [
                    {"field": "count", "label": "Total", "fill": true},
                    {"metricID": "77", "field": "amount", "aggregate": "SUM"}
                ],
                "yAxis": {"beginAtZero": true}
            }],
            "colorScheme": "tableau10"
        })
    }

    #[test]
    fn config_reads_loose_ids_and_keeps_unknown_keys() {
        let cfg: ChartConfig = serde_json::from_value(config_json()).unwrap();
        let report = &cfg.reports[0];
        assert_eq!(report.report_id, 0);
        assert_eq!(report.module_id, 42);
        assert_eq!(report.metrics[0].metric_id, None);
        assert_eq!(report.metrics[1].metric_id, Some(77));
        assert_eq!(report.metrics[0].extra.get("fill"), Some(&json!(true)));
        assert!(report.extra.contains_key("yAxis"));

        let back = serde_json::to_value(&cfg).unwrap();
        assert_eq!(back["reports"][0]["metrics"][1]["metricID"], json!("77"));
        assert!(back["reports"][0]["metrics"][0].get("metricID").is_none());
        assert_eq!(back["reports"][0]["yAxis"], json!({"beginAtZero": true}));
    }

    #[test]
    fn generate_ids_fills_only_missing() {
        let ids = Sequential::starting_at(500);
        let mut cfg: ChartConfig = serde_json::from_value(config_json()).unwrap();
        assert!(cfg.generate_ids(&ids));
        let report = &cfg.reports[0];
        assert_eq!(report.report_id, 500);
        assert_eq!(report.metrics[0].metric_id, Some(501));
        assert_eq!(report.metrics[1].metric_id, Some(77));

        let before = cfg.clone();
        assert!(!cfg.generate_ids(&ids));
        assert_eq!(cfg, before);
    }

    #[test]
    fn config_equality_is_structural() {
        let a: ChartConfig = serde_json::from_value(config_json()).unwrap();
        let mut b: ChartConfig = serde_json::from_value(config_json()).unwrap();
        assert_eq!(a, b);
        b.reports[0].metrics[1].aggregate = "AVG".into();
        assert_ne!(a, b);
    }

    #[test]
    fn translations_encode_and_decode() {
        let mut c = Chart { id: 9, namespace_id: 3, name: "Sales".into(), ..Chart::default() };
        c.config.reports.push(ChartReport {
            report_id: 1,
            metrics: vec![ChartMetric { metric_id: Some(5), label: "Total".into(), ..ChartMetric::default() }],
            ..ChartReport::default()
        });

        let tt = c.encode_translations();
        assert_eq!(tt.len(), 2);
        assert!(tt.iter().all(|t| t.resource == "compose:chart/3/9" && t.lang.is_empty()));
        assert!(tt.iter().any(|t| t.key == "metrics.5.label" && t.msg == "Total"));

        let bundle = vec![
            ResourceTranslation { lang: "de".into(), resource: c.resource_translation(), key: "name".into(), msg: "Umsatz".into() },
            ResourceTranslation { lang: "de".into(), resource: c.resource_translation(), key: "metrics.5.label".into(), msg: "Summe".into() },
            ResourceTranslation { lang: "de".into(), resource: c.resource_translation(), key: "metrics.6.label".into(), msg: "ignored".into() },
        ];
        c.decode_translations(&bundle);
        assert_eq!(c.name, "Umsatz");
        assert_eq!(c.config.reports[0].metrics[0].label, "Summe");
    }

    #[test]
    fn empty_label_set_is_none() {
        let mut c = Chart::default();
        c.set_labels(Labels::new());
        assert!(c.labels.is_none());
        c.set_labels(Labels::from([("team".to_string(), "ops".to_string())]));
        assert_eq!(c.labels.as_ref().map(|l| l.len()), Some(1));
    }

    #[test]
    fn filter_state_admission() {
        let now = Some(Utc::now());
        assert!(FilterState::Excluded.admits(None));
        assert!(!FilterState::Excluded.admits(now));
        assert!(FilterState::Inclusive.admits(now));
        assert!(!FilterState::Exclusive.admits(None));
    }
}
