//! Access-control gate consulted by the chart service. The policy engine
//! behind it lives elsewhere; denial is a plain `false`.

use async_trait::async_trait;

use super::domain::{Chart, Namespace};
use crate::context::Context;
use crate::locale::LocaleAccessController;

#[async_trait]
pub trait ChartAccessController: LocaleAccessController {
    async fn can_search_charts_on_namespace(&self, ctx: &Context, ns: &Namespace) -> bool;
    async fn can_create_chart_on_namespace(&self, ctx: &Context, ns: &Namespace) -> bool;
    async fn can_read_chart(&self, ctx: &Context, c: &Chart) -> bool;
    async fn can_update_chart(&self, ctx: &Context, c: &Chart) -> bool;
    async fn can_delete_chart(&self, ctx: &Context, c: &Chart) -> bool;

    /// Restoring a chart requires the delete permission unless overridden.
    async fn can_undelete_chart(&self, ctx: &Context, c: &Chart) -> bool {
        self.can_delete_chart(ctx, c).await
    }
}

/// Grants everything. For system contexts and tooling.
#[derive(Debug, Default, Clone, Copy)]
pub struct AllowAll;

#[async_trait]
impl LocaleAccessController for AllowAll {
    async fn can_manage_resource_translations(&self, _ctx: &Context) -> bool { true }
}

#[async_trait]
impl ChartAccessController for AllowAll {
    async fn can_search_charts_on_namespace(&self, _ctx: &Context, _ns: &Namespace) -> bool { true }
    async fn can_create_chart_on_namespace(&self, _ctx: &Context, _ns: &Namespace) -> bool { true }
    async fn can_read_chart(&self, _ctx: &Context, _c: &Chart) -> bool { true }
    async fn can_update_chart(&self, _ctx: &Context, _c: &Chart) -> bool { true }
    async fn can_delete_chart(&self, _ctx: &Context, _c: &Chart) -> bool { true }
}

/// Rule-driven controller for tests: everything is allowed until denied.
pub mod mock {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Mutex;

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub enum Operation {
        ManageTranslations,
        SearchCharts,
        CreateChart,
        ReadChart,
        UpdateChart,
        DeleteChart,
        UndeleteChart,
    }

    #[derive(Debug, Default)]
    pub struct RuleAccessController {
        denied: Mutex<HashSet<Operation>>,
        denied_charts: Mutex<HashSet<(Operation, u64)>>,
    }

    impl RuleAccessController {
        pub fn deny(&self, op: Operation) {
            self.denied.lock().unwrap_or_else(|e| e.into_inner()).insert(op);
        }

        pub fn deny_chart(&self, op: Operation, chart_id: u64) {
            self.denied_charts.lock().unwrap_or_else(|e| e.into_inner()).insert((op, chart_id));
        }

        pub fn allow_all(&self) {
            self.denied.lock().unwrap_or_else(|e| e.into_inner()).clear();
            self.denied_charts.lock().unwrap_or_else(|e| e.into_inner()).clear();
        }

        fn allowed(&self, op: Operation, chart_id: Option<u64>) -> bool {
            if self.denied.lock().unwrap_or_else(|e| e.into_inner()).contains(&op) {
                return false;
            }
            match chart_id {
                Some(id) => !self.denied_charts.lock().unwrap_or_else(|e| e.into_inner()).contains(&(op, id)),
                None => true,
            }
        }
    }

    #[async_trait]
    impl LocaleAccessController for RuleAccessController {
        async fn can_manage_resource_translations(&self, _ctx: &Context) -> bool {
            self.allowed(Operation::ManageTranslations, None)
        }
    }

    #[async_trait]
    impl ChartAccessController for RuleAccessController {
        async fn can_search_charts_on_namespace(&self, _ctx: &Context, _ns: &Namespace) -> bool {
            self.allowed(Operation::SearchCharts, None)
        }
        async fn can_create_chart_on_namespace(&self, _ctx: &Context, _ns: &Namespace) -> bool {
            self.allowed(Operation::CreateChart, None)
        }
        async fn can_read_chart(&self, _ctx: &Context, c: &Chart) -> bool {
            self.allowed(Operation::ReadChart, Some(c.id))
        }
        async fn can_update_chart(&self, _ctx: &Context, c: &Chart) -> bool {
            self.allowed(Operation::UpdateChart, Some(c.id))
        }
        async fn can_delete_chart(&self, _ctx: &Context, c: &Chart) -> bool {
            self.allowed(Operation::DeleteChart, Some(c.id))
        }
        async fn can_undelete_chart(&self, _ctx: &Context, c: &Chart) -> bool {
            self.allowed(Operation::UndeleteChart, Some(c.id))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{Operation, RuleAccessController};
    use super::*;

    struct DeleteOnly;

    #[async_trait]
    impl LocaleAccessController for DeleteOnly {
        async fn can_manage_resource_translations(&self, _ctx: &Context) -> bool { false }
    }

    #[async_trait]
    impl ChartAccessController for DeleteOnly {
        async fn can_search_charts_on_namespace(&self, _ctx: &Context, _ns: &Namespace) -> bool { false }
        async fn can_create_chart_on_namespace(&self, _ctx: &Context, _ns: &Namespace) -> bool { false }
        async fn can_read_chart(&self, _ctx: &Context, _c: &Chart) -> bool { false }
        async fn can_update_chart(&self, _ctx: &Context, _c: &Chart) -> bool { false }
        async fn can_delete_chart(&self, _ctx: &Context, _c: &Chart) -> bool { true }
    }

    #[tokio::test]
    async fn undelete_defaults_to_delete_permission() {
        let ctx = Context::new(1);
        assert!(DeleteOnly.can_undelete_chart(&ctx, &Chart::default()).await);
    }

    #[tokio::test]
    async fn rules_deny_per_operation_and_chart() {
        let ctx = Context::new(1);
        let ac = RuleAccessController::default();
        let a = Chart { id: 1, ..Chart::default() };
        let b = Chart { id: 2, ..Chart::default() };

        ac.deny_chart(Operation::ReadChart, 1);
        assert!(!ac.can_read_chart(&ctx, &a).await);
        assert!(ac.can_read_chart(&ctx, &b).await);

        ac.deny(Operation::UpdateChart);
        assert!(!ac.can_update_chart(&ctx, &b).await);

        ac.allow_all();
        assert!(ac.can_read_chart(&ctx, &a).await);
        assert!(ac.can_update_chart(&ctx, &b).await);
    }
}
