//! Translation binder: encodes translatable fields on write and overlays the
//! caller's language on read.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::context::Context;
use crate::errors::ServiceError;
use crate::store::TranslationRepository;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceTranslation {
    /// Empty until the binder assigns the default language.
    pub lang: String,
    pub resource: String,
    pub key: String,
    pub msg: String,
}

pub trait Translatable {
    /// Resource reference translations are stored under.
    fn resource_translation(&self) -> String;
    fn encode_translations(&self) -> Vec<ResourceTranslation>;
    fn decode_translations(&mut self, bundle: &[ResourceTranslation]);
}

#[async_trait]
pub trait LocaleAccessController: Send + Sync {
    async fn can_manage_resource_translations(&self, ctx: &Context) -> bool;
}

#[derive(Debug, Clone)]
pub struct Locale {
    enabled: bool,
    default_language: String,
}

impl Default for Locale {
    fn default() -> Self { Self { enabled: true, default_language: "en".into() } }
}

impl Locale {
    pub fn new(cfg: &configs::LocaleConfig) -> Self {
        Self { enabled: cfg.enabled, default_language: cfg.default_language.clone() }
    }

    pub fn disabled() -> Self { Self { enabled: false, ..Self::default() } }

    pub fn default_language(&self) -> &str { &self.default_language }

    pub fn preferred_language<'a>(&'a self, ctx: &'a Context) -> &'a str {
        ctx.language().unwrap_or(&self.default_language)
    }

    /// Read path only. Lookup failures leave the resource untranslated.
    pub async fn decode<R, T>(&self, ctx: &Context, repo: &R, res: &mut T)
    where
        R: TranslationRepository + ?Sized,
        T: Translatable,
    {
        if !self.enabled {
            return;
        }
        let lang = self.preferred_language(ctx);
        match repo.resource_translations(lang, &res.resource_translation()).await {
            Ok(bundle) => res.decode_translations(&bundle),
            Err(e) => warn!(error = %e, %lang, "resource_translations_unavailable"),
        }
    }

    /// Persists `tt`, filling in the default language where none is set.
    /// Actors without translation management rights are skipped silently.
    pub async fn update_translations<R, A>(
        &self,
        ctx: &Context,
        ac: &A,
        repo: &R,
        mut tt: Vec<ResourceTranslation>,
    ) -> Result<(), ServiceError>
    where
        R: TranslationRepository + ?Sized,
        A: LocaleAccessController + ?Sized,
    {
        if !self.enabled || tt.is_empty() {
            return Ok(());
        }
        if !ac.can_manage_resource_translations(ctx).await {
            debug!(actor_id = ctx.actor_id(), "translations_not_managed_by_actor");
            return Ok(());
        }
        for t in tt.iter_mut().filter(|t| t.lang.is_empty()) {
            t.lang = self.default_language.clone();
        }
        repo.upsert_resource_translations(&tt).await?;
        Ok(())
    }
}
