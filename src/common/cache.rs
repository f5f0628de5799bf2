//! Cache em memória de três níveis para as visões de estoque dos itens.
//!
//! As chaves têm namespace (`item:42`), então uma mutação de estoque pode
//! derrubar o namespace inteiro com [`TieredCache::invalidate_prefix`].

use std::future::Future;
use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};
use std::time::Duration;

use moka::future::Cache;
use serde::Serialize;

/// Namespace das visões de estoque por item.
pub const ITEM_CACHE_PREFIX: &str = "item:";

pub fn item_cache_key(item_id: i64) -> String {
    format!("{ITEM_CACHE_PREFIX}{item_id}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheTier {
    Short,
    Medium,
    Long,
}

/// Quantidade de entradas por nível.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub short: u64,
    pub medium: u64,
    pub long: u64,
}

#[derive(Clone)]
pub struct TieredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    short: Cache<String, V>,
    medium: Cache<String, V>,
    long: Cache<String, V>,
    // Incrementado a cada invalidação. Um loader que começou antes não grava.
    generation: Arc<AtomicU64>,
}

impl<V> TieredCache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new(short_ttl: Duration, medium_ttl: Duration, long_ttl: Duration) -> Self {
        let build = |ttl: Duration| -> Cache<String, V> {
            Cache::builder().max_capacity(1000).time_to_live(ttl).build()
        };
        Self {
            short: build(short_ttl),
            medium: build(medium_ttl),
            long: build(long_ttl),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    fn tier(&self, tier: CacheTier) -> &Cache<String, V> {
        match tier {
            CacheTier::Short => &self.short,
            CacheTier::Medium => &self.medium,
            CacheTier::Long => &self.long,
        }
    }

    fn tiers(&self) -> [&Cache<String, V>; 3] {
        [&self.short, &self.medium, &self.long]
    }

    pub async fn get(&self, key: &str, tier: CacheTier) -> Option<V> {
        self.tier(tier).get(key).await
    }

    pub async fn insert(&self, key: &str, value: V, tier: CacheTier) {
        self.tier(tier).insert(key.to_string(), value).await;
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn bump_generation(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
    }

    /// Remove `key` de todos os níveis.
    pub async fn remove(&self, key: &str) {
        self.bump_generation();
        for cache in self.tiers() {
            cache.invalidate(key).await;
        }
    }

    /// Devolve o valor em cache ou roda `init` e guarda o resultado.
    /// Erros de `init` voltam como estão e nada é guardado. Se houve uma
    /// invalidação enquanto `init` rodava, o valor é devolvido mas não fica
    /// em cache.
    pub async fn get_or_try_insert_with<F, E>(
        &self,
        key: &str,
        tier: CacheTier,
        init: F,
    ) -> Result<V, E>
    where
        F: Future<Output = Result<V, E>>,
    {
        if let Some(hit) = self.get(key, tier).await {
            tracing::debug!(key, "cache hit");
            return Ok(hit);
        }
        let started_at = self.generation();
        let value = init.await?;
        if self.generation() != started_at {
            tracing::debug!(key, "cache fill skipped, invalidated while loading");
            return Ok(value);
        }
        self.insert(key, value.clone(), tier).await;
        // Invalidação entre a checagem e o insert
        if self.generation() != started_at {
            self.tier(tier).invalidate(key).await;
        }
        Ok(value)
    }

    /// Derruba toda entrada cuja chave começa com `prefix`, em todos os níveis.
    /// Retorna quantas entradas saíram.
    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.bump_generation();
        let mut removed = 0;
        for cache in self.tiers() {
            let keys: Vec<String> = cache
                .iter()
                .filter(|(key, _)| key.starts_with(prefix))
                .map(|(key, _)| key.to_string())
                .collect();
            for key in keys {
                cache.invalidate(&key).await;
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::debug!(prefix, removed, "cache entries invalidated");
        }
        removed
    }

    pub async fn clear(&self) {
        self.bump_generation();
        for cache in self.tiers() {
            cache.invalidate_all();
            cache.run_pending_tasks().await;
        }
    }

    pub async fn stats(&self) -> CacheStats {
        for cache in self.tiers() {
            cache.run_pending_tasks().await;
        }
        CacheStats {
            short: self.short.entry_count(),
            medium: self.medium.entry_count(),
            long: self.long.entry_count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn cache() -> TieredCache<String> {
        TieredCache::new(
            Duration::from_secs(60),
            Duration::from_secs(300),
            Duration::from_secs(3600),
        )
    }

    #[tokio::test]
    async fn get_or_try_insert_with_runs_loader_once() {
        let cache = cache();
        let calls = AtomicUsize::new(0);

        for _ in 0..2 {
            let value: Result<String, ()> = cache
                .get_or_try_insert_with("item:1", CacheTier::Medium, async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("value-1".to_string())
                })
                .await;
            assert_eq!(value.as_deref(), Ok("value-1"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn loader_errors_are_not_cached() {
        let cache = cache();

        let first: Result<String, &str> = cache
            .get_or_try_insert_with("item:2", CacheTier::Short, async { Err("boom") })
            .await;
        assert_eq!(first, Err("boom"));
        assert_eq!(cache.get("item:2", CacheTier::Short).await, None);
    }

    #[tokio::test]
    async fn invalidation_during_load_keeps_old_value_out() {
        let cache = cache();

        let loaded: Result<String, ()> = cache
            .get_or_try_insert_with("item:5", CacheTier::Medium, async {
                // Leitura antiga, e uma escrita commita antes do loader terminar
                let snapshot = "stock=10".to_string();
                cache.invalidate_prefix(ITEM_CACHE_PREFIX).await;
                Ok(snapshot)
            })
            .await;

        assert_eq!(loaded.as_deref(), Ok("stock=10"));
        assert_eq!(cache.get("item:5", CacheTier::Medium).await, None);

        let fresh: Result<String, ()> = cache
            .get_or_try_insert_with("item:5", CacheTier::Medium, async { Ok("stock=4".to_string()) })
            .await;
        assert_eq!(fresh.as_deref(), Ok("stock=4"));
        assert_eq!(cache.get("item:5", CacheTier::Medium).await.as_deref(), Some("stock=4"));
    }

    #[tokio::test]
    async fn tiers_are_independent() {
        let cache = cache();
        cache.insert("short:key", "1".into(), CacheTier::Short).await;
        cache.insert("medium:key", "2".into(), CacheTier::Medium).await;
        cache.insert("long:key", "3".into(), CacheTier::Long).await;

        assert_eq!(cache.get("short:key", CacheTier::Short).await.as_deref(), Some("1"));
        assert_eq!(cache.get("short:key", CacheTier::Long).await, None);
        assert_eq!(cache.get("long:key", CacheTier::Long).await.as_deref(), Some("3"));

        cache.remove("medium:key").await;
        assert_eq!(cache.get("medium:key", CacheTier::Medium).await, None);
    }

    #[tokio::test]
    async fn invalidate_prefix_spans_tiers_and_spares_other_namespaces() {
        let cache = cache();
        cache.insert(&item_cache_key(1), "A".into(), CacheTier::Medium).await;
        cache.insert(&item_cache_key(2), "B".into(), CacheTier::Long).await;
        cache.insert("patient:1", "C".into(), CacheTier::Medium).await;

        let removed = cache.invalidate_prefix(ITEM_CACHE_PREFIX).await;

        assert_eq!(removed, 2);
        assert_eq!(cache.get("item:1", CacheTier::Medium).await, None);
        assert_eq!(cache.get("patient:1", CacheTier::Medium).await.as_deref(), Some("C"));
    }

    #[tokio::test]
    async fn clear_empties_every_tier() {
        let cache = cache();
        cache.insert("a", "1".into(), CacheTier::Short).await;
        cache.insert("b", "2".into(), CacheTier::Long).await;
        assert_eq!(cache.stats().await.short, 1);

        cache.clear().await;

        assert_eq!(
            cache.stats().await,
            CacheStats { short: 0, medium: 0, long: 0 }
        );
    }
}
