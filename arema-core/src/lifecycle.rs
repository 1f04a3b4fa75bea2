use std::time::Duration;

use actlet::prelude::*;

use crate::clock::WallClock;
use crate::models::Program;
use crate::models::ProgramId;
use crate::store::QueryContiguousSuccessor;
use crate::timer::TimerId;
use crate::timer::Timers;
use crate::timetable::BroadcastState;

/// Drives a program page through upcoming, live and archived.
///
/// A single one-shot timer is armed at a time:
///
/// * Upcoming: fires at `start_at` and moves to live
/// * Live: fires at `end_at`, then navigates to the contiguous successor on
///   the same channel if there is one, or moves to archived otherwise
/// * Archived: no timer
///
/// `ChangeProgram` re-arms the timer from the new program and the current
/// time.  Stopping the actor cancels the timer.
pub struct ProgramLifecycle<S, W> {
    store: S,
    clock: W,
    navigator: Emitter<NavigateToProgram>,
    program: Program,
    state: BroadcastState,
    timers: Timers<()>,
    emitters: EmitterRegistry<LifecycleStateChanged>,
}

impl<S, W> ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    pub fn new(store: S, clock: W, navigator: Emitter<NavigateToProgram>, program: Program) -> Self {
        ProgramLifecycle {
            store,
            clock,
            navigator,
            program,
            state: BroadcastState::Upcoming,
            timers: Timers::new(),
            emitters: Default::default(),
        }
    }

    async fn mount(&mut self, ctx: &Context<Self>) {
        self.timers.cancel_all();
        let state = BroadcastState::classify(&self.program, self.clock.now_ms());
        tracing::debug!(program.id = %self.program.id, %state, "Mount");
        self.set_state(state).await;
        self.arm(ctx);
    }

    fn arm(&mut self, ctx: &Context<Self>) {
        let target_ms = match self.state {
            BroadcastState::Upcoming => self.program.start_at_ms(),
            BroadcastState::Live => self.program.end_at_ms(),
            BroadcastState::Archived => return,
        };
        let delay = Duration::from_millis((target_ms - self.clock.now_ms()).max(0) as u64);
        let addr = ctx.address().clone();
        let timer_id = self.timers.arm(ctx, (), delay, move |timer_id| async move {
            addr.emit(TimerExpired { timer_id }).await;
        });
        tracing::debug!(program.id = %self.program.id, state = %self.state, %timer_id, ?delay, "Armed");
    }

    async fn set_state(&mut self, state: BroadcastState) {
        self.state = state;
        self.emitters
            .emit(LifecycleStateChanged(self.snapshot()))
            .await;
    }

    fn snapshot(&self) -> LifecycleState {
        LifecycleState {
            program_id: self.program.id.clone(),
            state: self.state,
        }
    }

    async fn on_end(&mut self) {
        let msg = QueryContiguousSuccessor {
            channel_id: self.program.channel_id.clone(),
            end_at: self.program.end_at,
        };
        match self.store.call(msg).await {
            Ok(Some(next)) => {
                tracing::info!(program.id = %self.program.id, next.id = %next.id, "Navigate to the next program");
                self.navigator
                    .emit(NavigateToProgram {
                        program_id: next.id,
                        replace: true,
                        preserve_scroll: true,
                    })
                    .await;
            }
            Ok(None) => {
                tracing::info!(program.id = %self.program.id, "Ended");
                self.set_state(BroadcastState::Archived).await;
            }
            Err(err) => {
                tracing::error!(program.id = %self.program.id, %err, "Failed to look up the next program");
                self.set_state(BroadcastState::Archived).await;
            }
        }
    }
}

#[async_trait]
impl<S, W> Actor for ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    async fn started(&mut self, ctx: &mut Context<Self>) {
        tracing::debug!(program.id = %self.program.id, "Started");
        self.mount(ctx).await;
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        self.timers.cancel_all();
        tracing::debug!(program.id = %self.program.id, "Stopped");
    }
}

// change program

#[derive(Message)]
pub struct ChangeProgram(pub Program);

#[async_trait]
impl<S, W> Handler<ChangeProgram> for ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    async fn handle(&mut self, msg: ChangeProgram, ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "ChangeProgram", program.id = %msg.0.id);
        self.program = msg.0;
        self.mount(ctx).await;
    }
}

// query lifecycle state

#[derive(Message)]
#[reply(LifecycleState)]
pub struct QueryLifecycleState;

#[async_trait]
impl<S, W> Handler<QueryLifecycleState> for ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    async fn handle(&mut self, _msg: QueryLifecycleState, _ctx: &mut Context<Self>) -> LifecycleState {
        tracing::debug!(msg.name = "QueryLifecycleState");
        self.snapshot()
    }
}

// register emitter

#[derive(Message)]
#[reply(usize)]
pub struct RegisterEmitter(pub Emitter<LifecycleStateChanged>);

#[async_trait]
impl<S, W> Handler<RegisterEmitter> for ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    async fn handle(&mut self, msg: RegisterEmitter, _ctx: &mut Context<Self>) -> usize {
        tracing::debug!(msg.name = "RegisterEmitter");
        self.emitters.register(msg.0)
    }
}

// unregister emitter

#[derive(Message)]
pub struct UnregisterEmitter(pub usize);

#[async_trait]
impl<S, W> Handler<UnregisterEmitter> for ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    async fn handle(&mut self, msg: UnregisterEmitter, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "UnregisterEmitter", id = msg.0);
        self.emitters.unregister(msg.0);
    }
}

// timer expired

#[derive(Message)]
struct TimerExpired {
    timer_id: TimerId,
}

#[async_trait]
impl<S, W> Handler<TimerExpired> for ProgramLifecycle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    async fn handle(&mut self, msg: TimerExpired, ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "TimerExpired", %msg.timer_id);
        if !self.timers.expire(&(), msg.timer_id) {
            tracing::debug!(%msg.timer_id, "Superseded");
            return;
        }
        match self.state {
            BroadcastState::Upcoming => {
                tracing::info!(program.id = %self.program.id, "Started broadcasting");
                self.set_state(BroadcastState::Live).await;
                self.arm(ctx);
            }
            BroadcastState::Live => self.on_end().await,
            BroadcastState::Archived => (),
        }
    }
}

// models

#[derive(Clone, Debug, PartialEq)]
pub struct LifecycleState {
    pub program_id: ProgramId,
    pub state: BroadcastState,
}

#[derive(Clone, Debug, Message)]
pub struct LifecycleStateChanged(pub LifecycleState);

/// Asks the owner of the page to show another program.
#[derive(Clone, Debug, Message, PartialEq)]
pub struct NavigateToProgram {
    pub program_id: ProgramId,
    /// Replace the current history entry.
    pub replace: bool,
    /// Keep the scroll position.
    pub preserve_scroll: bool,
}

/// Owns a `ProgramLifecycle`.
///
/// The actor stops when the handle is dropped.
pub struct LifecycleHandle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    addr: Address<ProgramLifecycle<S, W>>,
    _stop_trigger: Trigger<Stop>,
}

impl<S, W> LifecycleHandle<S, W>
where
    S: Send + Sync + 'static,
    S: Call<QueryContiguousSuccessor>,
    W: WallClock,
{
    pub async fn spawn<T>(spawner: &T, lifecycle: ProgramLifecycle<S, W>) -> Self
    where
        T: Spawn,
    {
        let addr = spawner.spawn_actor(lifecycle).await;
        let stop_trigger = addr.trigger(Stop);
        LifecycleHandle {
            addr,
            _stop_trigger: stop_trigger,
        }
    }

    pub fn address(&self) -> &Address<ProgramLifecycle<S, W>> {
        &self.addr
    }

    pub async fn change_program(&self, program: Program) {
        self.addr.emit(ChangeProgram(program)).await;
    }

    pub async fn state(&self) -> Result<LifecycleState, actlet::Error> {
        self.addr.call(QueryLifecycleState).await
    }
}

// </coverage:exclude>
