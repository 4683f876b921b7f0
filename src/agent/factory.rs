//! Agent construction, memoized per credential.

use super::runner::CritiqueAgent;
use super::tools::ToolContext;
use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::gemini::GeminiClient;
use crate::search::DuckDuckGo;
use crate::session::Credential;
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

/// Builds a fresh agent for a credential.
pub trait AgentBuilder: Send + Sync {
    fn build(&self, credential: &Credential) -> Result<CritiqueAgent>;
}

/// Builds Gemini-backed agents with DuckDuckGo search.
pub struct GeminiAgentBuilder {
    settings: Settings,
    prompts: Prompts,
}

impl GeminiAgentBuilder {
    pub fn new(settings: Settings, prompts: Prompts) -> Self {
        Self { settings, prompts }
    }
}

impl AgentBuilder for GeminiAgentBuilder {
    fn build(&self, credential: &Credential) -> Result<CritiqueAgent> {
        let client = Arc::new(GeminiClient::new(credential.clone(), &self.settings.gemini)?);
        let agent_settings = &self.settings.agent;

        let system_prompt = self
            .prompts
            .system_instruction(&agent_settings.name, agent_settings.markdown);

        let mut agent = CritiqueAgent::new(&agent_settings.name, client.clone(), client)
            .with_system_prompt(&system_prompt)
            .with_max_iterations(agent_settings.max_iterations);

        if agent_settings.web_search {
            let search = Arc::new(DuckDuckGo::new(&self.settings.search)?);
            agent = agent.with_tools(ToolContext::new(search, self.settings.search.max_results));
        }

        Ok(agent)
    }
}

/// Agents kept when no capacity is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 32;

#[derive(Default)]
struct CacheEntries {
    agents: HashMap<Credential, Arc<CritiqueAgent>>,
    /// Least recently used first.
    recency: VecDeque<Credential>,
}

impl CacheEntries {
    fn touch(&mut self, credential: &Credential) {
        self.recency.retain(|c| c != credential);
        self.recency.push_back(credential.clone());
    }
}

/// Shared cache of agents keyed by credential, bounded by `capacity`.
///
/// Once full, the least recently used agent is dropped to make room.
#[derive(Clone)]
pub struct AgentCache {
    entries: Arc<Mutex<CacheEntries>>,
    capacity: usize,
}

impl Default for AgentCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }
}

impl AgentCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: Arc::new(Mutex::new(CacheEntries::default())),
            capacity: capacity.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, CacheEntries> {
        // A poisoned lock only means another request panicked mid-update; the map is still usable
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn get(&self, credential: &Credential) -> Option<Arc<CritiqueAgent>> {
        let mut entries = self.lock();
        let agent = entries.agents.get(credential).cloned()?;
        entries.touch(credential);
        Some(agent)
    }

    /// Insert `agent` unless another request got there first; returns the cached one.
    fn insert(&self, credential: &Credential, agent: Arc<CritiqueAgent>) -> Arc<CritiqueAgent> {
        let mut entries = self.lock();
        let cached = entries
            .agents
            .entry(credential.clone())
            .or_insert(agent)
            .clone();
        entries.touch(credential);

        while entries.agents.len() > self.capacity {
            let Some(oldest) = entries.recency.pop_front() else {
                break;
            };
            entries.agents.remove(&oldest);
            debug!("Evicted agent for {}", oldest.masked());
        }

        cached
    }

    pub fn contains(&self, credential: &Credential) -> bool {
        self.lock().agents.contains_key(credential)
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.lock().agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Hands out agents, building each credential's agent once while it stays cached.
#[derive(Clone)]
pub struct AgentFactory {
    builder: Arc<dyn AgentBuilder>,
    cache: AgentCache,
}

impl AgentFactory {
    pub fn new(builder: Arc<dyn AgentBuilder>, cache: AgentCache) -> Self {
        Self { builder, cache }
    }

    /// Return the cached agent for `credential`, building it on first use.
    ///
    /// The build runs without holding the cache lock. If two requests race on a
    /// new credential, the first insert wins and both get that agent.
    pub fn get_or_init(&self, credential: &Credential) -> Result<Arc<CritiqueAgent>> {
        if let Some(agent) = self.cache.get(credential) {
            debug!("Reusing agent for {}", credential.masked());
            return Ok(agent);
        }

        let agent = Arc::new(self.builder.build(credential)?);
        info!(
            "Initialized agent '{}' ({}) for {}",
            agent.name(),
            agent.model_name(),
            credential.masked()
        );
        Ok(self.cache.insert(credential, agent))
    }

    pub fn cache(&self) -> &AgentCache {
        &self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CriticError;
    use crate::testing::{CountingBuilder, ScriptedModel};

    struct FailingBuilder;

    impl AgentBuilder for FailingBuilder {
        fn build(&self, _credential: &Credential) -> Result<CritiqueAgent> {
            Err(CriticError::Config("bad base url".to_string()))
        }
    }

    #[test]
    fn test_same_credential_reuses_agent() {
        let builder = Arc::new(CountingBuilder::new(Arc::new(ScriptedModel::new(vec![]))));
        let factory = AgentFactory::new(builder.clone(), AgentCache::new());
        let credential = Credential::new("abc123").unwrap();

        let first = factory.get_or_init(&credential).unwrap();
        let second = factory.get_or_init(&credential).unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(builder.build_count(), 1);
        assert_eq!(factory.cache().len(), 1);
    }

    #[test]
    fn test_different_credentials_get_different_agents() {
        let builder = Arc::new(CountingBuilder::new(Arc::new(ScriptedModel::new(vec![]))));
        let factory = AgentFactory::new(builder.clone(), AgentCache::new());

        let a = factory.get_or_init(&Credential::new("key-a").unwrap()).unwrap();
        let b = factory.get_or_init(&Credential::new("key-b").unwrap()).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(builder.build_count(), 2);
    }

    #[test]
    fn test_cache_is_shared_between_factories() {
        let builder = Arc::new(CountingBuilder::new(Arc::new(ScriptedModel::new(vec![]))));
        let cache = AgentCache::new();
        let credential = Credential::new("abc123").unwrap();

        AgentFactory::new(builder.clone(), cache.clone())
            .get_or_init(&credential)
            .unwrap();
        AgentFactory::new(builder.clone(), cache.clone())
            .get_or_init(&credential)
            .unwrap();

        assert_eq!(builder.build_count(), 1);
    }

    #[test]
    fn test_build_failure_is_not_cached() {
        let factory = AgentFactory::new(Arc::new(FailingBuilder), AgentCache::new());
        assert!(factory.get_or_init(&Credential::new("abc").unwrap()).is_err());
        assert!(factory.cache().is_empty());
    }

    #[test]
    fn test_cache_drops_least_recently_used_agent() {
        let builder = Arc::new(CountingBuilder::new(Arc::new(ScriptedModel::new(vec![]))));
        let factory = AgentFactory::new(builder.clone(), AgentCache::with_capacity(2));
        let a = Credential::new("key-a").unwrap();
        let b = Credential::new("key-b").unwrap();
        let c = Credential::new("key-c").unwrap();

        factory.get_or_init(&a).unwrap();
        factory.get_or_init(&b).unwrap();
        // Touch a so b becomes the oldest
        factory.get_or_init(&a).unwrap();
        factory.get_or_init(&c).unwrap();

        let cache = factory.cache();
        assert_eq!(cache.len(), 2);
        assert!(cache.contains(&a));
        assert!(!cache.contains(&b));
        assert!(cache.contains(&c));
        assert_eq!(builder.build_count(), 3);

        // An evicted credential is rebuilt on its next use
        factory.get_or_init(&b).unwrap();
        assert_eq!(builder.build_count(), 4);
        assert_eq!(cache.len(), 2);
        assert!(!cache.contains(&a));
    }

    #[test]
    fn test_zero_capacity_still_holds_one_agent() {
        let cache = AgentCache::with_capacity(0);
        assert_eq!(cache.capacity(), 1);
    }

    #[test]
    fn test_concurrent_first_use_shares_one_agent() {
        let builder = Arc::new(CountingBuilder::new(Arc::new(ScriptedModel::new(vec![]))));
        let factory = AgentFactory::new(builder.clone(), AgentCache::new());
        let credential = Credential::new("abc123").unwrap();

        let agents: Vec<_> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..4)
                .map(|_| scope.spawn(|| factory.get_or_init(&credential).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert!(agents.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
        assert_eq!(factory.cache().len(), 1);
    }

    #[test]
    fn test_gemini_builder_wires_tools() {
        let credential = Credential::new("abc123").unwrap();

        let agent = GeminiAgentBuilder::new(Settings::default(), Prompts::default())
            .build(&credential)
            .unwrap();
        assert_eq!(agent.name(), "AI Media Critic");
        assert_eq!(agent.model_name(), "gemini-2.0-flash-exp");
        assert!(agent.has_tools());

        let mut settings = Settings::default();
        settings.agent.web_search = false;
        let agent = GeminiAgentBuilder::new(settings, Prompts::default())
            .build(&credential)
            .unwrap();
        assert!(!agent.has_tools());
    }
}
