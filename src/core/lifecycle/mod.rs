use anyhow::Result;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Default, PartialEq)]
pub enum LifecycleState {
    #[default]
    Init,
    Ready,
    Shutdown,
}

#[async_trait::async_trait]
pub trait LifecycleComponent {
    async fn on_init(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_start(&mut self) -> Result<()> {
        Ok(())
    }
    async fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }
}

#[derive(Default)]
pub struct LifecycleManager {
    state: LifecycleState,
    components: Vec<Arc<Mutex<dyn LifecycleComponent + Send + Sync>>>,
}

impl LifecycleManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &LifecycleState {
        &self.state
    }

    pub fn attach(&mut self, component: Arc<Mutex<dyn LifecycleComponent + Send + Sync>>) {
        self.components.push(component);
    }

    pub async fn start(&mut self) -> Result<()> {
        info!("Lifecycle Phase: Init");
        self.state = LifecycleState::Init;
        for comp in &self.components {
            comp.lock().await.on_init().await?;
        }

        for comp in &self.components {
            comp.lock().await.on_start().await?;
        }

        info!("Lifecycle Phase: Ready");
        self.state = LifecycleState::Ready;
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<()> {
        info!("Lifecycle Phase: Shutdown");
        self.state = LifecycleState::Shutdown;

        for comp in &self.components {
            if let Err(e) = comp.lock().await.on_shutdown().await {
                warn!("Component shutdown error: {}", e);
            }
        }

        Ok(())
    }
}
