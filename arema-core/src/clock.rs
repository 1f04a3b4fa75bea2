use std::sync::Arc;
use std::time::Duration;

use actlet::prelude::*;
use chrono_jst::Jst;

use crate::config::Config;
use crate::timer::TimerId;
use crate::timer::Timers;

/// A source of the current time.
pub trait WallClock: Send + Sync + 'static {
    /// Returns the current UNIX time in milliseconds.
    fn now_ms(&self) -> i64;
}

#[derive(Clone)]
pub struct SystemClock;

impl WallClock for SystemClock {
    fn now_ms(&self) -> i64 {
        Jst::now().timestamp_millis()
    }
}

impl<T> WallClock for Arc<T>
where
    T: WallClock + ?Sized,
{
    fn now_ms(&self) -> i64 {
        (**self).now_ms()
    }
}

/// Holds the shared `CurrentUnixtimeMs`.
///
/// Refresh requests are debounced on the trailing edge: the value is updated
/// once, `clock.debounce` after the last request.
pub struct ClockTicker<W> {
    clock: W,
    debounce: Duration,
    current_unixtime_ms: i64,
    timers: Timers<()>,
    emitters: EmitterRegistry<CurrentUnixtimeChanged>,
}

impl<W> ClockTicker<W>
where
    W: WallClock,
{
    pub fn new(config: Arc<Config>, clock: W) -> Self {
        ClockTicker {
            clock,
            debounce: config.clock.debounce,
            current_unixtime_ms: 0,
            timers: Timers::new(),
            emitters: Default::default(),
        }
    }
}

#[async_trait]
impl<W> Actor for ClockTicker<W>
where
    W: WallClock,
{
    async fn started(&mut self, _ctx: &mut Context<Self>) {
        tracing::debug!("Started");
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        self.timers.cancel_all();
        tracing::debug!("Stopped");
    }
}

// refresh current unixtime

#[derive(Message)]
pub struct RefreshCurrentUnixtime;

#[async_trait]
impl<W> Handler<RefreshCurrentUnixtime> for ClockTicker<W>
where
    W: WallClock,
{
    async fn handle(&mut self, _msg: RefreshCurrentUnixtime, ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "RefreshCurrentUnixtime");
        let addr = ctx.address().clone();
        self.timers.arm(&*ctx, (), self.debounce, move |timer_id| async move {
            addr.emit(DebounceExpired { timer_id }).await;
        });
    }
}

// query current unixtime

#[derive(Message)]
#[reply(i64)]
pub struct QueryCurrentUnixtime;

#[async_trait]
impl<W> Handler<QueryCurrentUnixtime> for ClockTicker<W>
where
    W: WallClock,
{
    async fn handle(&mut self, _msg: QueryCurrentUnixtime, _ctx: &mut Context<Self>) -> i64 {
        tracing::debug!(msg.name = "QueryCurrentUnixtime");
        self.current_unixtime_ms
    }
}

// register emitter

#[derive(Message)]
#[reply(usize)]
pub struct RegisterEmitter(pub Emitter<CurrentUnixtimeChanged>);

#[async_trait]
impl<W> Handler<RegisterEmitter> for ClockTicker<W>
where
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
impl<W> Handler<UnregisterEmitter> for ClockTicker<W>
where
    W: WallClock,
{
    async fn handle(&mut self, msg: UnregisterEmitter, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "UnregisterEmitter", id = msg.0);
        self.emitters.unregister(msg.0);
    }
}

// notifications

#[derive(Clone, Debug, Message)]
pub struct CurrentUnixtimeChanged {
    pub unixtime_ms: i64,
}

// debounce expired

#[derive(Message)]
struct DebounceExpired {
    timer_id: TimerId,
}

#[async_trait]
impl<W> Handler<DebounceExpired> for ClockTicker<W>
where
    W: WallClock,
{
    async fn handle(&mut self, msg: DebounceExpired, _ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "DebounceExpired", %msg.timer_id);
        if !self.timers.expire(&(), msg.timer_id) {
            tracing::debug!(%msg.timer_id, "Superseded");
            return;
        }
        self.current_unixtime_ms = self.clock.now_ms();
        tracing::trace!(unixtime_ms = self.current_unixtime_ms, "Updated");
        self.emitters
            .emit(CurrentUnixtimeChanged {
                unixtime_ms: self.current_unixtime_ms,
            })
            .await;
    }
}


#[cfg(test)]
pub(crate) mod stub {
    use super::*;
    use tokio::time::Instant;

    /// A wall clock driven by tokio's clock.
    ///
    /// Use it with `start_paused = true` so that the time advances only with
    /// `tokio::time::sleep()` and `tokio::time::advance()`.
    #[derive(Clone)]
    pub(crate) struct PausedClock {
        origin: Instant,
        base_ms: i64,
    }

    impl PausedClock {
        pub(crate) fn new(base_ms: i64) -> Self {
            PausedClock {
                origin: Instant::now(),
                base_ms,
            }
        }
    }

    impl WallClock for PausedClock {
        fn now_ms(&self) -> i64 {
            self.base_ms + self.origin.elapsed().as_millis() as i64
        }
    }
}
// </coverage:exclude>
