//! Landing-page translations loaded from `{lang_dir}/{code}.json`.

use crate::models::Language;
use moka::future::Cache;
use serde_json::{Map, Value};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

pub type TranslationMap = Map<String, Value>;

pub fn supported_languages() -> &'static [Language] {
    &Language::ALL
}

/// Cached loader for the JSON language files.
#[derive(Clone)]
pub struct Translations {
    dir: PathBuf,
    cache: Cache<Language, Arc<TranslationMap>>,
}

impl Translations {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            cache: Cache::builder()
                .time_to_live(Duration::from_secs(300))
                .max_capacity(Language::ALL.len() as u64)
                .build(),
        }
    }

    async fn read_file(&self, language: Language) -> Option<TranslationMap> {
        let path = self.dir.join(format!("{}.json", language.code()));
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) => {
                tracing::warn!("⚠️  Translation file {} unavailable: {}", path.display(), e);
                return None;
            }
        };

        match serde_json::from_str::<TranslationMap>(&content) {
            Ok(map) => Some(map),
            Err(e) => {
                tracing::warn!("⚠️  Translation file {} is not a JSON object: {}", path.display(), e);
                None
            }
        }
    }

    /// Translations for `language`, falling back to Turkish and then to an empty map.
    pub async fn load(&self, language: Language) -> Arc<TranslationMap> {
        if let Some(cached) = self.cache.get(&language).await {
            return cached;
        }

        let map = match self.read_file(language).await {
            Some(map) => map,
            None if language != Language::Tr => {
                self.read_file(Language::Tr).await.unwrap_or_default()
            }
            None => TranslationMap::new(),
        };

        let map = Arc::new(map);
        self.cache.insert(language, map.clone()).await;
        map
    }
}
