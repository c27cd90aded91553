use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use super::RepositoryError;
use crate::config::RepositoryConfig;
use crate::provider::DataProvider;
use crate::record::Data;
use crate::schema::DataModel;

/// Builds a provider on demand for a model that has none registered.
pub type ProviderFactory = Arc<dyn Fn(&DataModel) -> Arc<dyn DataProvider> + Send + Sync>;

/// One level of the provider resolution chain, highest priority first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResolutionStep {
    /// `_provider` extended value on the record.
    RecordOverride,
    /// Provider named by the caller for this call only.
    CallOverride,
    ModelProviderType,
    /// Repository type mapped to a provider name.
    ModelRepositoryType,
    /// Provider registered under the model's type name.
    ModelTypeName,
    Default,
}

impl ResolutionStep {
    pub const ORDER: [ResolutionStep; 6] = [
        ResolutionStep::RecordOverride,
        ResolutionStep::CallOverride,
        ResolutionStep::ModelProviderType,
        ResolutionStep::ModelRepositoryType,
        ResolutionStep::ModelTypeName,
        ResolutionStep::Default,
    ];

    /// Explicit overrides fail loudly when they name an unknown provider;
    /// every other step falls through to the next.
    pub fn is_explicit(self) -> bool {
        matches!(self, ResolutionStep::RecordOverride | ResolutionStep::CallOverride)
    }
}

impl fmt::Display for ResolutionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolutionStep::RecordOverride => "record-override",
            ResolutionStep::CallOverride => "call-override",
            ResolutionStep::ModelProviderType => "model-provider-type",
            ResolutionStep::ModelRepositoryType => "model-repository-type",
            ResolutionStep::ModelTypeName => "model-type-name",
            ResolutionStep::Default => "default",
        };
        f.write_str(name)
    }
}

/// Named providers plus the tables the resolution chain consults.
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn DataProvider>>>,
    repository_types: RwLock<HashMap<String, String>>,
    default_provider: RwLock<Option<String>>,
    fallback: Option<ProviderFactory>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: RwLock::new(HashMap::new()),
            repository_types: RwLock::new(HashMap::new()),
            default_provider: RwLock::new(None),
            fallback: None,
        }
    }

    /// Factory used at [`ResolutionStep::ModelTypeName`] when nothing is
    /// registered under the model's type name.
    pub fn with_fallback<F>(mut self, factory: F) -> Self
    where
        F: Fn(&DataModel) -> Arc<dyn DataProvider> + Send + Sync + 'static,
    {
        self.fallback = Some(Arc::new(factory));
        self
    }

    /// Register under the provider's own name, returning any provider it
    /// replaced.
    pub fn register(
        &self,
        provider: Arc<dyn DataProvider>,
    ) -> Result<Option<Arc<dyn DataProvider>>, RepositoryError> {
        let name = provider.name().to_string();
        self.register_as(name, provider)
    }

    pub fn register_as(
        &self,
        name: impl Into<String>,
        provider: Arc<dyn DataProvider>,
    ) -> Result<Option<Arc<dyn DataProvider>>, RepositoryError> {
        let mut providers = self
            .providers
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("provider registration"))?;
        Ok(providers.insert(name.into(), provider))
    }

    pub fn get(&self, name: &str) -> Result<Option<Arc<dyn DataProvider>>, RepositoryError> {
        let providers = self
            .providers
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("provider lookup"))?;
        Ok(providers.get(name).cloned())
    }

    /// Existing provider for `name`, or the one `create` builds. Concurrent
    /// first calls may each run `create`; exactly one result is kept and
    /// every caller gets that one.
    pub fn get_or_register<F>(
        &self,
        name: &str,
        create: F,
    ) -> Result<Arc<dyn DataProvider>, RepositoryError>
    where
        F: FnOnce() -> Arc<dyn DataProvider>,
    {
        if let Some(provider) = self.get(name)? {
            return Ok(provider);
        }
        let candidate = create();
        let mut providers = self
            .providers
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("provider registration"))?;
        Ok(Arc::clone(
            providers.entry(name.to_string()).or_insert(candidate),
        ))
    }

    pub fn names(&self) -> Result<Vec<String>, RepositoryError> {
        let providers = self
            .providers
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("provider lookup"))?;
        let mut names: Vec<String> = providers.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    pub fn map_repository_type(
        &self,
        repository_type: impl Into<String>,
        provider: impl Into<String>,
    ) -> Result<(), RepositoryError> {
        let mut types = self
            .repository_types
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("repository type mapping"))?;
        types.insert(repository_type.into(), provider.into());
        Ok(())
    }

    pub fn set_default(&self, provider: impl Into<String>) -> Result<(), RepositoryError> {
        let mut default = self
            .default_provider
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("default provider"))?;
        *default = Some(provider.into());
        Ok(())
    }

    /// Load the default provider and repository type mappings.
    pub fn apply_config(&self, config: &RepositoryConfig) -> Result<(), RepositoryError> {
        if let Some(default) = &config.default_provider {
            self.set_default(default.clone())?;
        }
        for (repository_type, provider) in &config.repository_types {
            self.map_repository_type(repository_type.clone(), provider.clone())?;
        }
        Ok(())
    }

    /// Provider name a step would consult, if the step applies at all.
    pub fn candidate(
        &self,
        step: ResolutionStep,
        data: &Data,
        call_override: Option<&str>,
    ) -> Result<Option<String>, RepositoryError> {
        let model = data.model();
        let name = match step {
            ResolutionStep::RecordOverride => data.provider_override().map(str::to_string),
            ResolutionStep::CallOverride => call_override
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            ResolutionStep::ModelProviderType => {
                model.repository_provider_type().map(str::to_string)
            }
            ResolutionStep::ModelRepositoryType => match model.repository_type() {
                Some(repository_type) => {
                    let types = self
                        .repository_types
                        .read()
                        .map_err(|_| RepositoryError::LockPoisoned("repository type lookup"))?;
                    types.get(repository_type).cloned()
                }
                None => None,
            },
            ResolutionStep::ModelTypeName => Some(model.type_name().to_string()),
            ResolutionStep::Default => self
                .default_provider
                .read()
                .map_err(|_| RepositoryError::LockPoisoned("default provider"))?
                .clone(),
        };
        Ok(name)
    }

    /// Evaluate a single step.
    pub fn resolve_step(
        &self,
        step: ResolutionStep,
        data: &Data,
        call_override: Option<&str>,
    ) -> Result<Option<Arc<dyn DataProvider>>, RepositoryError> {
        let Some(name) = self.candidate(step, data, call_override)? else {
            return Ok(None);
        };
        if let Some(provider) = self.get(&name)? {
            return Ok(Some(provider));
        }
        match step {
            ResolutionStep::ModelTypeName => match &self.fallback {
                Some(factory) => {
                    let model: &DataModel = data.model();
                    let provider = self.get_or_register(&name, || factory(model))?;
                    Ok(Some(provider))
                }
                None => Ok(None),
            },
            step if step.is_explicit() => Err(RepositoryError::ProviderNotFound(name)),
            _ => Ok(None),
        }
    }

    /// Walk the chain and return the first provider found with the step
    /// that produced it.
    pub fn resolve(
        &self,
        data: &Data,
        call_override: Option<&str>,
    ) -> Result<(ResolutionStep, Arc<dyn DataProvider>), RepositoryError> {
        for step in ResolutionStep::ORDER {
            if let Some(provider) = self.resolve_step(step, data, call_override)? {
                debug!(
                    model = %data.model().type_name(),
                    provider = %provider.name(),
                    step = %step,
                    "resolved provider"
                );
                return Ok((step, provider));
            }
        }
        Err(RepositoryError::NoProvider {
            model: data.model().type_name().to_string(),
        })
    }
}
