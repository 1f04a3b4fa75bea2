use std::any::type_name;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::oneshot;
pub use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

#[cfg(feature = "derive")]
pub use actlet_derive::Message;

pub mod prelude {
    pub use crate::Action;
    pub use crate::Actor;
    pub use crate::Address;
    pub use crate::Call;
    pub use crate::Caller;
    pub use crate::Context;
    pub use crate::Emit;
    pub use crate::Emitter;
    pub use crate::EmitterFactory;
    pub use crate::EmitterRegistry;
    pub use crate::Handler;
    pub use crate::Message;
    pub use crate::Signal;
    pub use crate::Spawn;
    pub use crate::Spawner;
    pub use crate::Stop;
    pub use crate::System;
    pub use crate::Trigger;
    pub use crate::TriggerFactory;
    pub use async_trait::async_trait;
}

/// Errors that may happen in communication with an actor.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to send a message")]
    Send,
    #[error("Failed to receive a reply")]
    Recv,
}

pub type Result<T> = std::result::Result<T, Error>;

/// An actor system.
///
/// Every actor and task spawned through the system, or through a context of
/// an actor living in the system, is tracked so that `shutdown()` can wait for
/// all of them.
pub struct System {
    spawner: Spawner,
}

impl System {
    /// Create an actor system.
    pub fn new() -> Self {
        System {
            spawner: Spawner::new(),
        }
    }

    /// Returns a spawner which can be passed to components spawning actors
    /// lazily.
    pub fn spawner(&self) -> Spawner {
        self.spawner.clone()
    }

    /// Stops all actors and tasks, and waits for them to finish.
    pub async fn shutdown(self) {
        self.spawner.stop_token.cancel();
        self.spawner.tracker.close();
        self.spawner.tracker.wait().await;
        tracing::debug!("Shutdown");
    }
}

impl Default for System {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Spawn for System {
    async fn spawn_actor<A>(&self, actor: A) -> Address<A>
    where
        A: Actor,
    {
        self.spawner.spawn_actor(actor).await
    }

    fn spawn_task<F>(&self, fut: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawner.spawn_task(fut)
    }
}

/// A handle to spawn actors and tasks in an actor system.
#[derive(Clone)]
pub struct Spawner {
    tracker: TaskTracker,
    stop_token: CancellationToken,
}

impl Spawner {
    fn new() -> Self {
        Spawner {
            tracker: TaskTracker::new(),
            stop_token: CancellationToken::new(),
        }
    }

    fn spawn_cancellable<F>(&self, token: CancellationToken, fut: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let cloned = token.clone();
        self.tracker.spawn(async move {
            tokio::select! {
                _ = fut => (),
                _ = cloned.cancelled() => (),
            }
        });
        token
    }

    fn start<A>(&self, actor: A) -> (Address<A>, oneshot::Receiver<()>)
    where
        A: Actor,
    {
        let (addr, receiver) = Address::pair();
        let context = Context {
            own_addr: addr.clone(),
            spawner: self.clone(),
            stop_token: self.stop_token.child_token(),
        };
        let (started_tx, started_rx) = oneshot::channel();
        self.tracker
            .spawn(MessageLoop::new(actor, receiver, context).run(started_tx));
        (addr, started_rx)
    }
}

#[async_trait]
impl Spawn for Spawner {
    async fn spawn_actor<A>(&self, actor: A) -> Address<A>
    where
        A: Actor,
    {
        let (addr, started) = self.start(actor);
        // The address is returned after `Actor::started()` finishes so that
        // messages sent by the caller always see an initialized actor.
        let _ = started.await;
        addr
    }

    fn spawn_task<F>(&self, fut: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_cancellable(self.stop_token.child_token(), fut)
    }
}

/// An actor execution context.
pub struct Context<A> {
    own_addr: Address<A>,
    spawner: Spawner,
    stop_token: CancellationToken,
}

impl<A> Context<A> {
    /// Returns the address of the actor.
    pub fn address(&self) -> &Address<A> {
        &self.own_addr
    }

    /// Stops the actor.
    ///
    /// Tasks spawned with `Context::spawn_task()` are cancelled.
    pub fn stop(&mut self) {
        self.stop_token.cancel();
    }
}

#[async_trait]
impl<A> Spawn for Context<A>
where
    A: Actor,
{
    // Child actors are owned by the system, not by this actor.
    async fn spawn_actor<B>(&self, actor: B) -> Address<B>
    where
        B: Actor,
    {
        self.spawner.spawn_actor(actor).await
    }

    // Tasks are owned by this actor and cancelled when it stops.
    fn spawn_task<F>(&self, fut: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawner
            .spawn_cancellable(self.stop_token.child_token(), fut)
    }
}

impl<A, M> EmitterFactory<M> for Context<A>
where
    A: Handler<M>,
    M: Signal + 'static,
{
    fn emitter(&self) -> Emitter<M> {
        self.own_addr.emitter()
    }
}

/// An address of an actor.
pub struct Address<A> {
    sender: mpsc::Sender<Box<dyn Dispatch<A> + Send>>,
}

impl<A> Address<A> {
    const MAX_MESSAGES: usize = 256;

    fn pair() -> (Self, mpsc::Receiver<Box<dyn Dispatch<A> + Send>>) {
        let (sender, receiver) = mpsc::channel(Self::MAX_MESSAGES);
        (Address { sender }, receiver)
    }

    /// Returns `true` if the actor has stopped.
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl<A> Clone for Address<A> {
    fn clone(&self) -> Self {
        Address {
            sender: self.sender.clone(),
        }
    }
}

impl<A, M> From<Address<A>> for Caller<M>
where
    A: Handler<M>,
    M: Action + 'static,
{
    fn from(addr: Address<A>) -> Self {
        Caller::new(addr)
    }
}

impl<A, M> From<Address<A>> for Emitter<M>
where
    A: Handler<M>,
    M: Signal + 'static,
{
    fn from(addr: Address<A>) -> Self {
        Emitter::new(addr)
    }
}

impl<A, M> EmitterFactory<M> for Address<A>
where
    A: Handler<M>,
    M: Signal + 'static,
{
    fn emitter(&self) -> Emitter<M> {
        Emitter::new(self.clone())
    }
}

impl<A, M> TriggerFactory<M> for Address<A>
where
    A: Handler<M>,
    M: Signal + 'static,
{
    fn trigger(&self, msg: M) -> Trigger<M> {
        Trigger::new(self.emitter(), msg)
    }
}

#[async_trait]
impl<A, M> Call<M> for Address<A>
where
    A: Handler<M>,
    // A message will be converted into `Box<dyn Dispatch>`.
    M: Action + 'static,
{
    async fn call(&self, msg: M) -> Result<M::Reply> {
        let (sender, receiver) = oneshot::channel::<M::Reply>();
        let dispatcher = Box::new(ActionDispatcher {
            message: msg,
            sender,
        });
        if self.sender.send(dispatcher).await.is_err() {
            tracing::error!("{} stopped", type_name::<A>());
            return Err(Error::Send);
        }
        receiver.await.map_err(|_| {
            tracing::error!("{} stopped", type_name::<A>());
            Error::Recv
        })
    }
}

#[async_trait]
impl<A, M> Emit<M> for Address<A>
where
    A: Handler<M>,
    // A message will be converted into `Box<dyn Dispatch>`.
    M: Signal + 'static,
{
    async fn emit(&self, msg: M) {
        let dispatcher = Box::new(SignalDispatcher { message: msg });
        if self.sender.send(dispatcher).await.is_err() {
            tracing::warn!("{} stopped", type_name::<A>());
        }
    }

    fn fire(&self, msg: M) {
        use mpsc::error::TrySendError;

        let dispatcher = Box::new(SignalDispatcher { message: msg });
        match self.sender.try_send(dispatcher) {
            Ok(_) => {
                // Sent synchronously.
            }
            Err(TrySendError::Full(dispatcher)) => {
                let sender = self.sender.clone();
                tokio::spawn(async move {
                    if sender.send(dispatcher).await.is_err() {
                        tracing::warn!("{} stopped", type_name::<A>());
                    }
                });
            }
            Err(TrySendError::Closed(_)) => {
                tracing::warn!("{} stopped", type_name::<A>());
            }
        }
    }
}

/// A type that implements [`Call<M>`] for a particular message.
pub struct Caller<M> {
    inner: Arc<dyn Call<M> + Send + Sync>,
}

impl<M> Caller<M>
where
    M: Action,
{
    pub fn new<T>(inner: T) -> Self
    where
        T: Call<M> + Send + Sync + 'static,
    {
        Caller {
            inner: Arc::new(inner),
        }
    }
}

impl<M> Clone for Caller<M> {
    fn clone(&self) -> Self {
        Caller {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl<M> Call<M> for Caller<M>
where
    M: Action + 'static,
{
    async fn call(&self, msg: M) -> Result<M::Reply> {
        self.inner.call(msg).await
    }
}

/// A type that implements [`Emit<M>`] for a particular message.
pub struct Emitter<M> {
    inner: Arc<dyn Emit<M> + Send + Sync>,
}

impl<M> Emitter<M>
where
    M: Signal,
{
    pub fn new<T>(inner: T) -> Self
    where
        T: Emit<M> + Send + Sync + 'static,
    {
        Emitter {
            inner: Arc::new(inner),
        }
    }
}

impl<M> Clone for Emitter<M> {
    fn clone(&self) -> Self {
        Emitter {
            inner: self.inner.clone(),
        }
    }
}

#[async_trait]
impl<M> Emit<M> for Emitter<M>
where
    M: Signal + 'static,
{
    async fn emit(&self, msg: M) {
        self.inner.emit(msg).await
    }

    fn fire(&self, msg: M) {
        self.inner.fire(msg);
    }
}

/// Emits a message when dropped.
///
/// Useful for tying the lifetime of a registration or an actor to a value
/// owned by someone else.
pub struct Trigger<M>
where
    M: Signal + 'static,
{
    emitter: Emitter<M>,
    msg: Option<M>,
}

impl<M> Trigger<M>
where
    M: Signal + 'static,
{
    pub fn new(emitter: Emitter<M>, msg: M) -> Self {
        Trigger {
            emitter,
            msg: Some(msg),
        }
    }

    /// Consumes the trigger without emitting the message.
    pub fn disarm(mut self) {
        self.msg = None;
    }
}

impl<M> Drop for Trigger<M>
where
    M: Signal + 'static,
{
    fn drop(&mut self) {
        if let Some(msg) = self.msg.take() {
            self.emitter.fire(msg);
        }
    }
}

/// A list of emitters of the same message.
pub struct EmitterRegistry<M> {
    emitters: Vec<(usize, Emitter<M>)>,
    next_id: usize,
}

impl<M> EmitterRegistry<M>
where
    M: Signal + Clone + 'static,
{
    /// Registers an emitter and returns an ID for unregistering it.
    ///
    /// IDs start from 1.
    pub fn register(&mut self, emitter: Emitter<M>) -> usize {
        self.next_id += 1;
        let id = self.next_id;
        self.emitters.push((id, emitter));
        id
    }

    pub fn unregister(&mut self, id: usize) -> bool {
        let len = self.emitters.len();
        self.emitters.retain(|(emitter_id, _)| *emitter_id != id);
        self.emitters.len() != len
    }

    pub fn is_empty(&self) -> bool {
        self.emitters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.emitters.len()
    }

    pub async fn emit(&self, msg: M) {
        for (_, emitter) in self.emitters.iter() {
            emitter.emit(msg.clone()).await;
        }
    }
}

impl<M> Default for EmitterRegistry<M> {
    fn default() -> Self {
        EmitterRegistry {
            emitters: vec![],
            next_id: 0,
        }
    }
}

/// A message to stop an actor.
pub struct Stop;
impl Message for Stop {
    type Reply = ();
}
impl Signal for Stop {}

#[async_trait]
impl<A: Actor> Handler<Stop> for A {
    async fn handle(&mut self, _msg: Stop, ctx: &mut Context<Self>) {
        ctx.stop();
    }
}

// traits

/// A trait that every actor must implement.
#[async_trait]
pub trait Actor
where
    Self: Send + Sized,
    // An actor will be moved to a dedicated task created by `tokio::spawn()`.
    Self: 'static,
{
    /// Called when the actor gets started running on a dedicated task.
    #[allow(unused_variables)]
    async fn started(&mut self, ctx: &mut Context<Self>) {}

    /// Called when the actor is stopping.
    ///
    /// Messages remaining in the mailbox are processed after this call.
    #[allow(unused_variables)]
    async fn stopping(&mut self, ctx: &mut Context<Self>) {}

    /// Called when the actor stopped.
    #[allow(unused_variables)]
    async fn stopped(&mut self, ctx: &mut Context<Self>) {}
}

/// A trait to spawn a new asynchronous task.
#[async_trait]
pub trait Spawn: Sized {
    /// Spawns a new asynchronous task dedicated for an actor.
    async fn spawn_actor<A>(&self, actor: A) -> Address<A>
    where
        A: Actor;

    /// Spawns a new asynchronous task dedicated for a `Future`.
    ///
    /// The task can be cancelled with the returned token.
    fn spawn_task<F>(&self, fut: F) -> CancellationToken
    where
        F: Future<Output = ()> + Send + 'static;
}

/// A trait that every message must implement.
pub trait Message: Send {
    /// The type of reply for this message.
    type Reply: Send;
}

/// A trait that every message sent by [`Call<M>`] must implement.
pub trait Action: Message {}

/// A trait to send a message and wait for its reply.
#[async_trait]
pub trait Call<M: Action> {
    /// Sends a message and waits for its reply.
    ///
    /// The `msg` will be lost if the actor has already stopped.
    async fn call(&self, msg: M) -> Result<M::Reply>;
}

/// A trait that every message sent by [`Emit<M>`] must implement.
pub trait Signal: Message<Reply = ()> {}

/// A trait to send a message without waiting for its reply.
#[async_trait]
pub trait Emit<M: Signal> {
    /// Sends a message.
    ///
    /// The `msg` will be lost if the actor has already stopped.
    async fn emit(&self, msg: M);

    /// Sends a message synchronously if possible.
    ///
    /// This function is useful when a message has to be sent outside `async fn`
    /// and `async` blocks such as `Drop::drop()`.
    #[allow(unused_variables)]
    fn fire(&self, msg: M) {
        unimplemented!("Emit::fire");
    }
}

/// A trait to create an [`Emitter<M>`].
pub trait EmitterFactory<M: Signal> {
    fn emitter(&self) -> Emitter<M>;
}

/// A trait to create a [`Trigger<M>`].
pub trait TriggerFactory<M: Signal> {
    fn trigger(&self, msg: M) -> Trigger<M>;
}

/// A trait to handle a message.
#[async_trait]
pub trait Handler<M>
where
    Self: Actor,
    M: Message,
{
    /// Performs a computation specified by a message and optionally returns a
    /// result of the computation.
    async fn handle(&mut self, msg: M, ctx: &mut Context<Self>) -> M::Reply;
}

// private types

struct MessageLoop<A> {
    actor: A,
    receiver: mpsc::Receiver<Box<dyn Dispatch<A> + Send>>,
    context: Context<A>,
}

impl<A: Actor> MessageLoop<A> {
    fn new(
        actor: A,
        receiver: mpsc::Receiver<Box<dyn Dispatch<A> + Send>>,
        context: Context<A>,
    ) -> Self {
        MessageLoop {
            actor,
            receiver,
            context,
        }
    }

    async fn run(mut self, started: oneshot::Sender<()>) {
        self.actor.started(&mut self.context).await;
        let _ = started.send(());
        let stop_token = self.context.stop_token.clone();
        loop {
            tokio::select! {
                Some(dispatch) = self.receiver.recv() => {
                    dispatch.dispatch(&mut self.actor, &mut self.context).await;
                }
                _ = stop_token.cancelled() => {
                    break;
                }
                else => break,
            }
        }
        self.actor.stopping(&mut self.context).await;
        self.receiver.close();
        // Process the remaining messages so that callers waiting for replies
        // are not left hanging.
        while let Some(dispatch) = self.receiver.recv().await {
            dispatch.dispatch(&mut self.actor, &mut self.context).await;
        }
        self.actor.stopped(&mut self.context).await;
    }
}

#[async_trait]
trait Dispatch<A> {
    async fn dispatch(self: Box<Self>, actor: &mut A, ctx: &mut Context<A>);
}

struct ActionDispatcher<M>
where
    M: Action,
{
    message: M,
    sender: oneshot::Sender<M::Reply>,
}

#[async_trait]
impl<A, M> Dispatch<A> for ActionDispatcher<M>
where
    A: Handler<M>,
    M: Action,
{
    async fn dispatch(self: Box<Self>, actor: &mut A, ctx: &mut Context<A>) {
        let ActionDispatcher { message, sender } = *self;
        let reply = actor.handle(message, ctx).await;
        if sender.send(reply).is_err() {
            tracing::error!("Failed to send a reply from {}", type_name::<A>());
        }
    }
}

struct SignalDispatcher<M>
where
    M: Signal,
{
    message: M,
}

#[async_trait]
impl<A, M> Dispatch<A> for SignalDispatcher<M>
where
    A: Handler<M>,
    M: Signal,
{
    async fn dispatch(self: Box<Self>, actor: &mut A, ctx: &mut Context<A>) {
        actor.handle(self.message, ctx).await;
    }
}

// </coverage:exclude>
