//! Auto-buy persistence

use super::{AutoBuyExecution, AutoBuyRule};
use crate::error::{Error, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for rule and execution storage
#[async_trait]
pub trait AutoBuyRepository: Send + Sync {
    /// Insert a new rule; fails with `Duplicate` on a known id
    async fn create(&self, rule: &AutoBuyRule) -> Result<()>;
    /// Replace a rule; fails with `NotFound` on an unknown id
    async fn update(&self, rule: &AutoBuyRule) -> Result<()>;
    async fn delete(&self, id: Uuid) -> Result<()>;
    async fn get(&self, id: Uuid) -> Result<Option<AutoBuyRule>>;
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<AutoBuyRule>>;
    /// Every enabled rule
    async fn list_active(&self) -> Result<Vec<AutoBuyRule>>;
    async fn record_execution(&self, execution: &AutoBuyExecution) -> Result<()>;
    /// Executions of a rule, oldest first
    async fn executions(&self, rule_id: Uuid) -> Result<Vec<AutoBuyExecution>>;
}

/// Auto-buy repository backed by maps
#[derive(Default)]
pub struct InMemoryAutoBuyRepository {
    rules: RwLock<HashMap<Uuid, AutoBuyRule>>,
    executions: RwLock<Vec<AutoBuyExecution>>,
}

impl InMemoryAutoBuyRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn sorted(mut rules: Vec<AutoBuyRule>) -> Vec<AutoBuyRule> {
    rules.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
    rules
}

#[async_trait]
impl AutoBuyRepository for InMemoryAutoBuyRepository {
    async fn create(&self, rule: &AutoBuyRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        if rules.contains_key(&rule.id) {
            return Err(Error::Duplicate(format!("auto-buy rule {}", rule.id)));
        }
        rules.insert(rule.id, rule.clone());
        Ok(())
    }

    async fn update(&self, rule: &AutoBuyRule) -> Result<()> {
        let mut rules = self.rules.write().await;
        let slot = rules
            .get_mut(&rule.id)
            .ok_or_else(|| Error::NotFound(format!("auto-buy rule {}", rule.id)))?;
        *slot = rule.clone();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        self.rules
            .write()
            .await
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(format!("auto-buy rule {}", id)))
    }

    async fn get(&self, id: Uuid) -> Result<Option<AutoBuyRule>> {
        Ok(self.rules.read().await.get(&id).cloned())
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<AutoBuyRule>> {
        let rules = self.rules.read().await;
        Ok(sorted(
            rules
                .values()
                .filter(|r| r.user_id == user_id)
                .cloned()
                .collect(),
        ))
    }

    async fn list_active(&self) -> Result<Vec<AutoBuyRule>> {
        let rules = self.rules.read().await;
        Ok(sorted(rules.values().filter(|r| r.enabled).cloned().collect()))
    }

    async fn record_execution(&self, execution: &AutoBuyExecution) -> Result<()> {
        self.executions.write().await.push(execution.clone());
        Ok(())
    }

    async fn executions(&self, rule_id: Uuid) -> Result<Vec<AutoBuyExecution>> {
        Ok(self
            .executions
            .read()
            .await
            .iter()
            .filter(|e| e.rule_id == rule_id)
            .cloned()
            .collect())
    }
}
