//! Tool Box
//!
//! Process-wide tool registry built at most once, on first use.
//!
//! ```text
//!   NotStarted ──first caller──▶ InProgress(shared build) ──ok──▶ Ready(Toolset)
//!        ▲                              │
//!        └────────────── err ───────────┘  (every waiter of that attempt sees the error)
//! ```
//!
//! Concurrent callers during `InProgress` await the same shared build, so a
//! caller only ever observes "not built" or a complete [`Toolset`].

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use crate::error::{AgentError, Result};
use crate::provider::{BoundModel, GenerationOptions, LlmProvider};
use crate::tool::{Tool, ToolRegistry};

/// An externally supplied tool collection (e.g. a browser-backed toolkit)
/// loaded during registry initialization.
#[async_trait]
pub trait ToolSource: Send + Sync {
    /// Source name, for logging
    fn name(&self) -> &str;

    /// Start the backing subsystem and hand out its tools
    async fn load(&self) -> Result<Vec<Arc<dyn Tool>>>;

    /// Release the backing subsystem
    async fn shutdown(&self) -> Result<()> {
        Ok(())
    }
}

/// The built registry and the model bound to it
pub struct Toolset {
    registry: ToolRegistry,
    model: BoundModel,
}

impl Toolset {
    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    pub fn model(&self) -> &BoundModel {
        &self.model
    }
}

type BuildOutcome = std::result::Result<Arc<Toolset>, String>;

enum InitState {
    NotStarted,
    InProgress {
        attempt: u64,
        build: Shared<BoxFuture<'static, BuildOutcome>>,
    },
    Ready(Arc<Toolset>),
}

struct Blueprint {
    provider: Arc<dyn LlmProvider>,
    local_tools: Vec<Arc<dyn Tool>>,
    sources: Vec<Arc<dyn ToolSource>>,
    options: GenerationOptions,
    model_timeout: Duration,
}

/// Lazily built, shared tool registry
pub struct ToolBox {
    blueprint: Arc<Blueprint>,
    state: Mutex<InitState>,
    attempts: AtomicU64,
}

impl ToolBox {
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        local_tools: Vec<Arc<dyn Tool>>,
        sources: Vec<Arc<dyn ToolSource>>,
        options: GenerationOptions,
        model_timeout: Duration,
    ) -> Self {
        Self {
            blueprint: Arc::new(Blueprint {
                provider,
                local_tools,
                sources,
                options,
                model_timeout,
            }),
            state: Mutex::new(InitState::NotStarted),
            attempts: AtomicU64::new(0),
        }
    }

    /// Build the tool set on first call; later calls return the same instance.
    pub async fn ensure_initialized(&self) -> Result<Arc<Toolset>> {
        let (attempt, build) = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let in_flight = match &*state {
                InitState::Ready(toolset) => return Ok(toolset.clone()),
                InitState::InProgress { attempt, build } => Some((*attempt, build.clone())),
                InitState::NotStarted => None,
            };
            match in_flight {
                Some(joined) => joined,
                None => {
                    let attempt = self.next_attempt();
                    let build = Self::build(self.blueprint.clone()).boxed().shared();
                    *state = InitState::InProgress {
                        attempt,
                        build: build.clone(),
                    };
                    (attempt, build)
                }
            }
        };

        let outcome = build.await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let current = matches!(&*state, InitState::InProgress { attempt: a, .. } if *a == attempt);
        match outcome {
            Ok(toolset) => {
                if current {
                    *state = InitState::Ready(toolset.clone());
                }
                Ok(toolset)
            }
            Err(msg) => {
                if current {
                    *state = InitState::NotStarted;
                }
                Err(AgentError::RegistryInit(msg))
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(
            &*self.state.lock().unwrap_or_else(PoisonError::into_inner),
            InitState::Ready(_)
        )
    }

    /// Shut down external sources and drop the built tool set.
    pub async fn shutdown(&self) -> Result<()> {
        let was_ready = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            let ready = matches!(&*state, InitState::Ready(_));
            if ready {
                *state = InitState::NotStarted;
            }
            ready
        };
        if !was_ready {
            return Ok(());
        }
        for source in &self.blueprint.sources {
            source.shutdown().await?;
            tracing::info!(source = source.name(), "Tool source shut down");
        }
        Ok(())
    }

    fn next_attempt(&self) -> u64 {
        self.attempts.fetch_add(1, Ordering::SeqCst) + 1
    }

    async fn build(blueprint: Arc<Blueprint>) -> BuildOutcome {
        tracing::info!("Initializing tool box");

        let mut tools = blueprint.local_tools.clone();
        for source in &blueprint.sources {
            let loaded = source.load().await.map_err(|e| {
                tracing::error!(source = source.name(), error = %e, "Tool source failed to start");
                format!("{}: {}", source.name(), e)
            })?;
            tracing::debug!(source = source.name(), count = loaded.len(), "Loaded tool source");
            tools.extend(loaded);
        }

        let registry: ToolRegistry = tools.into_iter().collect();
        let model = BoundModel::new(
            blueprint.provider.clone(),
            registry.schemas(),
            blueprint.options.clone(),
            blueprint.model_timeout,
        );

        tracing::info!(count = registry.len(), tools = ?registry.names(), "Tool box ready");
        Ok(Arc::new(Toolset { registry, model }))
    }
}
