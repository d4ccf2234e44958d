//! Strictly ordered, single-flight access to the live instance.
//!
//! Every call is sent to a worker task at the moment it is made, not when
//! its future is first polled, so submission order is call order. The
//! worker owns the instance slot and handles one command at a time; swaps
//! travel through the same channel, which puts them in order with ordinary
//! calls.

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot};

use crate::reload::ReloadEvent;

use super::binding::{ModuleBinding, ModuleFactory};
use super::lifecycle::{InstanceSlot, ModuleLifecycle};
use super::types::{FrameTime, ModelInfo, ShaderCompiledCallback, ShaderInfo, TextureInfo};
use super::{LifecycleError, ModuleError, OperationError, SessionContext};

/// A call into the module.
pub(crate) enum Operation {
    UpdateModels(Vec<ModelInfo>),
    UpdateShader(ShaderInfo),
    RemoveShader(String),
    UpdateTexture(TextureInfo),
    RemoveTexture(String),
    SetOnShaderCompiled(Option<ShaderCompiledCallback>),
    SetThresholdFactor(f32),
    SetHotValue(f32),
    FocusOn([f32; 3]),
    GetFrameTime,
}

impl Operation {
    async fn apply<B: ModuleBinding>(self, binding: &mut B) -> Result<Reply, ModuleError> {
        match self {
            Self::UpdateModels(models) => binding.update_models(models).await.map(Reply::unit),
            Self::UpdateShader(shader) => binding.update_shader(shader).await.map(Reply::unit),
            Self::RemoveShader(id) => binding.remove_shader(id).await.map(Reply::unit),
            Self::UpdateTexture(texture) => binding.update_texture(texture).await.map(Reply::unit),
            Self::RemoveTexture(id) => binding.remove_texture(id).await.map(Reply::unit),
            Self::SetOnShaderCompiled(callback) => binding
                .set_on_shader_compiled(callback)
                .await
                .map(Reply::unit),
            Self::SetThresholdFactor(factor) => {
                binding.set_threshold_factor(factor).await.map(Reply::unit)
            }
            Self::SetHotValue(value) => binding.set_hot_value(value).await.map(Reply::unit),
            Self::FocusOn(position) => binding.focus_on(position).await.map(Reply::unit),
            Self::GetFrameTime => binding.get_frame_time().await.map(Reply::FrameTime),
        }
    }
}

pub(crate) enum Reply {
    Unit,
    FrameTime(FrameTime),
}

impl Reply {
    const fn unit((): ()) -> Self {
        Self::Unit
    }

    pub(crate) fn into_frame_time(self) -> Result<FrameTime, OperationError> {
        match self {
            Self::FrameTime(time) => Ok(time),
            Self::Unit => Err(OperationError::UnexpectedReply("get_frame_time")),
        }
    }
}

type ReplySlot = oneshot::Sender<Result<Reply, OperationError>>;

pub(crate) enum Command {
    Op(Operation, ReplySlot),
    Swap {
        generation: u64,
        artifacts: Vec<PathBuf>,
        done: oneshot::Sender<Result<(), LifecycleError>>,
    },
    Shutdown(oneshot::Sender<()>),
}

/// Cloneable handle to the session's module.
///
/// Dropping every handle shuts the worker down and releases the instance.
#[derive(Clone)]
pub struct CommandQueue {
    tx: mpsc::UnboundedSender<Command>,
    session: Arc<SessionContext>,
}

impl CommandQueue {
    /// Spawn the worker owning `slot`. Must be called inside a tokio runtime.
    pub(crate) fn spawn<F: ModuleFactory>(
        lifecycle: ModuleLifecycle<F>,
        slot: InstanceSlot<F::Binding>,
    ) -> Self {
        let session = Arc::clone(lifecycle.session());
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(run_worker(lifecycle, slot, rx));
        Self { tx, session }
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    pub fn update_models(
        &self,
        models: Vec<ModelInfo>,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::UpdateModels(models)))
    }

    pub fn update_shader(
        &self,
        shader: ShaderInfo,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::UpdateShader(shader)))
    }

    pub fn remove_shader(
        &self,
        id: impl Into<String>,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::RemoveShader(id.into())))
    }

    pub fn update_texture(
        &self,
        texture: TextureInfo,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::UpdateTexture(texture)))
    }

    pub fn remove_texture(
        &self,
        id: impl Into<String>,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::RemoveTexture(id.into())))
    }

    /// Register (or clear) the shader diagnostics callback.
    pub fn set_on_shader_compiled(
        &self,
        callback: Option<ShaderCompiledCallback>,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::SetOnShaderCompiled(callback)))
    }

    pub fn set_threshold_factor(
        &self,
        factor: f32,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::SetThresholdFactor(factor)))
    }

    pub fn set_hot_value(
        &self,
        value: f32,
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::SetHotValue(value)))
    }

    pub fn focus_on(
        &self,
        position: [f32; 3],
    ) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
        unit(self.submit(Operation::FocusOn(position)))
    }

    pub fn get_frame_time(
        &self,
    ) -> impl Future<Output = Result<FrameTime, OperationError>> + Send + 'static {
        let reply = self.submit(Operation::GetFrameTime);
        async move { receive(reply).await?.into_frame_time() }
    }

    /// Queue a swap to `generation`, ordered after every call made so far.
    pub fn swap(
        &self,
        generation: u64,
        artifacts: Vec<PathBuf>,
    ) -> impl Future<Output = Result<(), LifecycleError>> + Send + 'static {
        let (done, rx) = oneshot::channel();
        let _ = self.tx.send(Command::Swap {
            generation,
            artifacts,
            done,
        });
        async move { rx.await.unwrap_or(Err(LifecycleError::Closed)) }
    }

    /// Apply reload events as they arrive: live swaps go through the queue,
    /// full reloads go to the session's restart hook.
    pub fn follow(&self, mut events: broadcast::Receiver<ReloadEvent>) -> tokio::task::JoinHandle<()> {
        let queue = self.clone();
        tokio::spawn(async move {
            loop {
                match events.recv().await {
                    Ok(ReloadEvent::LiveSwap {
                        generation,
                        artifacts,
                    }) => {
                        if let Err(e) = queue.swap(generation, artifacts).await {
                            crate::log!("module"; "live swap failed: {}", e);
                            if e == LifecycleError::Closed {
                                break;
                            }
                        }
                    }
                    Ok(ReloadEvent::FullReload { reason }) => queue.session.request_restart(&reason),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        crate::debug!("module"; "skipped {} reload events", skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// Release the live instance after all previously queued calls ran.
    pub async fn shutdown(&self) {
        let (done, rx) = oneshot::channel();
        if self.tx.send(Command::Shutdown(done)).is_ok() {
            let _ = rx.await;
        }
    }

    fn submit(&self, op: Operation) -> oneshot::Receiver<Result<Reply, OperationError>> {
        let (reply, rx) = oneshot::channel();
        // A closed queue drops `reply`, which the receiver reports
        let _ = self.tx.send(Command::Op(op, reply));
        rx
    }
}

async fn receive(
    rx: oneshot::Receiver<Result<Reply, OperationError>>,
) -> Result<Reply, OperationError> {
    rx.await.unwrap_or(Err(OperationError::QueueClosed))
}

fn unit(
    rx: oneshot::Receiver<Result<Reply, OperationError>>,
) -> impl Future<Output = Result<(), OperationError>> + Send + 'static {
    async move { receive(rx).await.map(|_| ()) }
}

async fn run_worker<F: ModuleFactory>(
    mut lifecycle: ModuleLifecycle<F>,
    mut slot: InstanceSlot<F::Binding>,
    mut rx: mpsc::UnboundedReceiver<Command>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            Command::Op(op, reply) => {
                let result = match &mut slot {
                    InstanceSlot::Live(instance) => op
                        .apply(&mut instance.binding)
                        .await
                        .map_err(OperationError::Rejected),
                    InstanceSlot::Vacant(_) => Err(OperationError::NoInstance),
                };
                let _ = reply.send(result);
            }
            Command::Swap {
                generation,
                artifacts,
                done,
            } => {
                let (next, result) = lifecycle.swap(slot, &artifacts, generation).await;
                slot = next;
                let _ = done.send(result);
            }
            Command::Shutdown(done) => {
                release(&mut lifecycle, slot).await;
                let _ = done.send(());
                return;
            }
        }
    }

    // Every handle dropped
    release(&mut lifecycle, slot).await;
}

async fn release<F: ModuleFactory>(lifecycle: &mut ModuleLifecycle<F>, slot: InstanceSlot<F::Binding>) {
    if let InstanceSlot::Live(instance) = slot {
        lifecycle.release_instance(instance).await;
    }
}
