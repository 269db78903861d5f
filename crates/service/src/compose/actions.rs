//! Audit vocabulary for chart verbs: which action ran, what it touched and
//! how to describe it.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use super::domain::{Chart, ChartFilter, Namespace, CHART_RESOURCE_TYPE};
use crate::actionlog::{Action, Severity};
use crate::context::Context;
use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChartAction {
    Search,
    Lookup,
    Create,
    Update,
    Delete,
    Undelete,
}

impl ChartAction {
    pub fn name(&self) -> &'static str {
        match self {
            ChartAction::Search => "search",
            ChartAction::Lookup => "lookup",
            ChartAction::Create => "create",
            ChartAction::Update => "update",
            ChartAction::Delete => "delete",
            ChartAction::Undelete => "undelete",
        }
    }

    /// Severity of a successful action; failures take the error's severity.
    pub fn severity(&self) -> Severity {
        match self {
            ChartAction::Search | ChartAction::Lookup => Severity::Info,
            _ => Severity::Notice,
        }
    }

    fn done(&self) -> &'static str {
        match self {
            ChartAction::Search => "searched for",
            ChartAction::Lookup => "looked-up for a",
            ChartAction::Create => "added",
            ChartAction::Update => "updated",
            ChartAction::Delete => "deleted",
            ChartAction::Undelete => "undeleted",
        }
    }

    fn attempted(&self) -> &'static str {
        match self {
            ChartAction::Search => "search for",
            ChartAction::Lookup => "look up",
            ChartAction::Create => "add",
            ChartAction::Update => "update",
            ChartAction::Delete => "delete",
            ChartAction::Undelete => "undelete",
        }
    }
}

impl fmt::Display for ChartAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.name()) }
}

/// Whatever a verb learned before it finished or failed. Builders return a
/// new value and leave the receiver untouched.
#[derive(Debug, Clone, Default)]
pub struct ChartActionProps {
    namespace: Option<Namespace>,
    chart: Option<Chart>,
    changed: Option<Chart>,
    filter: Option<ChartFilter>,
}

impl ChartActionProps {
    pub fn new() -> Self { Self::default() }

    pub fn with_namespace(&self, ns: &Namespace) -> Self {
        Self { namespace: Some(ns.clone()), ..self.clone() }
    }

    pub fn with_chart(&self, c: &Chart) -> Self {
        Self { chart: Some(c.clone()), ..self.clone() }
    }

    pub fn with_changed(&self, c: &Chart) -> Self {
        Self { changed: Some(c.clone()), ..self.clone() }
    }

    pub fn with_filter(&self, f: &ChartFilter) -> Self {
        Self { filter: Some(f.clone()), ..self.clone() }
    }

    pub fn namespace(&self) -> Option<&Namespace> { self.namespace.as_ref() }
    pub fn chart(&self) -> Option<&Chart> { self.chart.as_ref() }
    pub fn changed(&self) -> Option<&Chart> { self.changed.as_ref() }
    pub fn filter(&self) -> Option<&ChartFilter> { self.filter.as_ref() }

    fn subject(&self) -> Option<&Chart> { self.changed.as_ref().or(self.chart.as_ref()) }

    /// `compose:chart/<namespace>/<chart>` once both IDs are known.
    pub fn resource(&self) -> String {
        match self.subject() {
            Some(c) if c.id > 0 && c.namespace_id > 0 => {
                format!("{}/{}/{}", CHART_RESOURCE_TYPE, c.namespace_id, c.id)
            }
            _ => CHART_RESOURCE_TYPE.to_string(),
        }
    }

    pub fn describe(&self, action: ChartAction, err: Option<&ServiceError>) -> String {
        let subject = match action {
            ChartAction::Search => "charts".to_string(),
            _ => self.subject().map(describe_chart).unwrap_or_else(|| "chart".to_string()),
        };
        let mut out = match err {
            None => format!("{} {}", action.done(), subject),
            Some(_) => format!("failed to {} {}", action.attempted(), subject),
        };
        if let Some(ns) = &self.namespace {
            out.push_str(" in ");
            out.push_str(&describe_namespace(ns));
        }
        if let Some(e) = err {
            out.push_str(": ");
            out.push_str(&e.to_string());
        }
        out
    }

    pub fn meta(&self) -> Map<String, Value> {
        let mut m = Map::new();
        if let Some(ns) = &self.namespace {
            m.insert("namespace.ID".into(), ns.id.to_string().into());
            m.insert("namespace.name".into(), ns.name.clone().into());
            m.insert("namespace.slug".into(), ns.slug.clone().into());
        }
        if let Some(c) = &self.chart {
            m.insert("chart.ID".into(), c.id.to_string().into());
            m.insert("chart.handle".into(), c.handle.clone().into());
            m.insert("chart.name".into(), c.name.clone().into());
        }
        if let Some(c) = &self.changed {
            m.insert("changed.handle".into(), c.handle.clone().into());
            m.insert("changed.name".into(), c.name.clone().into());
            if let Some(ts) = c.updated_at {
                m.insert("changed.updatedAt".into(), ts.to_rfc3339().into());
            }
        }
        if let Some(f) = &self.filter {
            m.insert("filter.query".into(), f.query.clone().into());
            m.insert("filter.handle".into(), f.handle.clone().into());
            m.insert("filter.deleted".into(), serde_json::to_value(f.deleted).unwrap_or(Value::Null));
            m.insert("filter.limit".into(), f.limit.into());
            if !f.labels.is_empty() {
                let labels = f.labels.iter().map(|(k, v)| (k.clone(), Value::from(v.clone()))).collect();
                m.insert("filter.labels".into(), Value::Object(labels));
            }
        }
        m
    }

    pub fn into_action(self, action: ChartAction, ctx: &Context, err: Option<&ServiceError>, ts: DateTime<Utc>) -> Action {
        Action {
            timestamp: ts,
            request_id: ctx.request_id(),
            actor_id: ctx.actor_id(),
            resource: self.resource(),
            action: action.name(),
            error: err.map(|e| e.to_string()),
            severity: err.map(ServiceError::severity).unwrap_or_else(|| action.severity()),
            description: self.describe(action, err),
            meta: self.meta(),
        }
    }
}

fn describe_chart(c: &Chart) -> String {
    if !c.handle.is_empty() {
        format!("chart {:?}", c.handle)
    } else if !c.name.is_empty() {
        format!("chart {:?}", c.name)
    } else if c.id > 0 {
        format!("chart {}", c.id)
    } else {
        "chart".to_string()
    }
}

fn describe_namespace(ns: &Namespace) -> String {
    if !ns.slug.is_empty() {
        format!("namespace {:?}", ns.slug)
    } else if !ns.name.is_empty() {
        format!("namespace {:?}", ns.name)
    } else {
        format!("namespace {}", ns.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crm() -> Namespace {
        Namespace { id: 1, name: "CRM".into(), slug: "crm".into(), ..Namespace::default() }
    }

    fn sales() -> Chart {
        Chart { id: 10, namespace_id: 1, handle: "sales".into(), name: "Sales".into(), ..Chart::default() }
    }

    #[test]
    fn builders_leave_receiver_untouched() {
        let base = ChartActionProps::new();
        let with_ns = base.with_namespace(&crm());
        assert!(base.namespace().is_none());
        assert_eq!(with_ns.namespace().map(|n| n.id), Some(1));
    }

    #[test]
    fn describes_success_and_failure() {
        let props = ChartActionProps::new().with_namespace(&crm()).with_chart(&sales());
        assert_eq!(props.describe(ChartAction::Update, None), r#"updated chart "sales" in namespace "crm""#);
        assert_eq!(
            props.describe(ChartAction::Delete, Some(&ServiceError::NotAllowed("delete this chart"))),
            r#"failed to delete chart "sales" in namespace "crm": not allowed to delete this chart"#
        );
        assert_eq!(ChartActionProps::new().describe(ChartAction::Search, None), "searched for charts");
    }

    #[test]
    fn changed_chart_wins_for_resource() {
        let props = ChartActionProps::new().with_chart(&Chart { namespace_id: 1, ..Chart::default() });
        assert_eq!(props.resource(), "compose:chart");
        let props = props.with_changed(&sales());
        assert_eq!(props.resource(), "compose:chart/1/10");
    }

    #[test]
    fn action_carries_context_and_severity() {
        let ctx = Context::new(42);
        let props = ChartActionProps::new().with_chart(&sales());
        let ok = props.clone().into_action(ChartAction::Lookup, &ctx, None, Utc::now());
        assert_eq!(ok.actor_id, 42);
        assert_eq!(ok.request_id, ctx.request_id());
        assert_eq!(ok.severity, Severity::Info);
        assert_eq!(ok.meta.get("chart.ID"), Some(&Value::from("10")));

        let failed = props.into_action(ChartAction::Create, &ctx, Some(&ServiceError::HandleNotUnique), Utc::now());
        assert_eq!(failed.severity, Severity::Warning);
        assert_eq!(failed.error.as_deref(), Some("handle not unique"));
    }
}
