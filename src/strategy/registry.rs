//! Strategy factories and stored configurations

use super::params::StrategyConfig;
use super::{BreakoutStrategy, DefaultStrategy, NewCoinStrategy, Strategy, VolumeSpikeStrategy};
use crate::error::{Error, Result};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Builds a fresh strategy instance
pub type StrategyFactory = Arc<dyn Fn() -> Result<Box<dyn Strategy>> + Send + Sync>;

/// Name to factory and name to config maps
#[derive(Default)]
pub struct StrategyRegistry {
    factories: RwLock<HashMap<String, StrategyFactory>>,
    configs: RwLock<HashMap<String, StrategyConfig>>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in strategies registered
    pub async fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register_default_strategies().await;
        registry
    }

    /// Register a factory, replacing any previous one with the same name
    pub async fn register(&self, name: impl Into<String>, factory: StrategyFactory) {
        let name = name.into();
        tracing::debug!(strategy = %name, "Strategy factory registered");
        self.factories.write().await.insert(name, factory);
    }

    /// Register `default`, `newcoin`, `volumespike` and `breakout`
    pub async fn register_default_strategies(&self) {
        self.register("default", factory::<DefaultStrategy>()).await;
        self.register("newcoin", factory::<NewCoinStrategy>()).await;
        self.register("volumespike", factory::<VolumeSpikeStrategy>())
            .await;
        self.register("breakout", factory::<BreakoutStrategy>())
            .await;
    }

    /// Build a strategy and initialize it with the stored config, if any
    pub async fn create(&self, name: &str) -> Result<Box<dyn Strategy>> {
        let factory = self
            .factories
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("strategy {}", name)))?;
        let mut strategy = factory()?;

        let config = match self.configs.read().await.get(name) {
            Some(config) => config.clone(),
            None => strategy.params(),
        };
        strategy.initialize(&config)?;
        Ok(strategy)
    }

    pub async fn save_config(&self, name: impl Into<String>, config: StrategyConfig) -> Result<()> {
        config.validate()?;
        self.configs.write().await.insert(name.into(), config);
        Ok(())
    }

    pub async fn get_config(&self, name: &str) -> Result<StrategyConfig> {
        self.configs
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| Error::NotFound(format!("config for {}", name)))
    }

    pub async fn delete_config(&self, name: &str) -> Result<()> {
        self.configs
            .write()
            .await
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("config for {}", name)))
    }

    /// Registered factory names, sorted
    pub async fn list(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.read().await.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Factory building `S` with its default parameters
pub fn factory<S: Strategy + Default + 'static>() -> StrategyFactory {
    Arc::new(|| -> Result<Box<dyn Strategy>> { Ok(Box::new(S::default())) })
}
