use std::sync::Arc;
use std::time::Duration;

use actlet::prelude::*;
use clap::Args;
use tokio::signal::unix::SignalKind;
use tokio::signal::unix::signal;
use tokio::sync::oneshot;

use arema_core::api::ApiClient;
use arema_core::api::HttpApiClient;
use arema_core::batcher::ProgramBatcher;
use arema_core::clock;
use arema_core::clock::ClockTicker;
use arema_core::clock::CurrentUnixtimeChanged;
use arema_core::clock::RefreshCurrentUnixtime;
use arema_core::clock::SystemClock;
use arema_core::clock::WallClock;
use arema_core::config::Config;
use arema_core::error::Error;
use arema_core::lifecycle;
use arema_core::lifecycle::LifecycleHandle;
use arema_core::lifecycle::LifecycleStateChanged;
use arema_core::lifecycle::NavigateToProgram;
use arema_core::lifecycle::ProgramLifecycle;
use arema_core::loader::PageLoader;
use arema_core::loader::ProgramPage;
use arema_core::models::Program;
use arema_core::models::ProgramId;
use arema_core::services::Services;
use arema_core::store::ProgramStore;
use arema_core::timetable::BroadcastState;
use arema_core::timetable::format_japanese_datetime;

const REFRESH_INTERVAL: Duration = Duration::from_secs(1);

/// Watch a program.
///
/// Transitions of the program are logged.  When the program ends, the next
/// program on the same channel is followed if there is one.  Otherwise, the
/// command exits.
#[derive(Args)]
#[clap(verbatim_doc_comment)]
pub struct CommandLine {
    /// ID of the program.
    program_id: String,
}

pub async fn main(config: Arc<Config>, cl: &CommandLine) -> Result<(), Error> {
    let system = System::new();

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let result = tokio::select! {
        result = watch(config, cl, &system) => result,
        _ = sigint.recv() => {
            tracing::info!("SIGINT received");
            Ok(())
        }
        _ = sigterm.recv() => {
            tracing::info!("SIGTERM received");
            Ok(())
        }
    };

    tracing::info!("Stopping...");
    system.shutdown().await;
    result
}

async fn watch(config: Arc<Config>, cl: &CommandLine, system: &System) -> Result<(), Error> {
    let api = HttpApiClient::new(&config);
    let program_id = ProgramId::from(cl.program_id.as_str());
    let program = follow(config, system, api, SystemClock, program_id).await?;
    tracing::info!(program.id = %program.id, "Done");
    Ok(())
}

/// Follows programs from `program_id` until one is archived without a next
/// program, and returns the last one.
async fn follow<A, W>(
    config: Arc<Config>,
    system: &System,
    api: A,
    wall_clock: W,
    program_id: ProgramId,
) -> Result<Program, Error>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    let batcher = system
        .spawn_actor(ProgramBatcher::new(config.clone(), api.clone()))
        .await;
    let store = system.spawn_actor(ProgramStore::new()).await;
    let clock = system
        .spawn_actor(ClockTicker::new(config.clone(), wall_clock.clone()))
        .await;
    let loader = PageLoader::new(Services::new(api, batcher), store.clone());

    let page = loader
        .load_program_page(&program_id)
        .await?
        .ok_or(Error::ProgramNotFound)?;
    log_page(&page);

    let (done, finished) = oneshot::channel();
    let _watcher = system
        .spawn_actor(Watcher {
            loader,
            store,
            clock,
            wall_clock,
            program: page.program.clone(),
            lifecycle: None,
            done: Some(done),
        })
        .await;
    Ok(finished.await.unwrap_or(page.program))
}

fn log_page(page: &ProgramPage) {
    let program = &page.program;
    tracing::info!(
        program.id = %program.id,
        program.title = %program.title,
        program.start_at = %format_japanese_datetime(&program.start_at),
        program.end_at = %format_japanese_datetime(&program.end_at),
        module.title = page.module.as_ref().map(|module| module.title.as_str()),
        "Loaded"
    );
}

type Loader<A> = PageLoader<A, Address<ProgramBatcher<A>>, Address<ProgramStore>>;

struct Watcher<A, W>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    loader: Loader<A>,
    store: Address<ProgramStore>,
    clock: Address<ClockTicker<W>>,
    wall_clock: W,
    program: Program,
    lifecycle: Option<LifecycleHandle<Address<ProgramStore>, W>>,
    done: Option<oneshot::Sender<Program>>,
}

impl<A, W> Watcher<A, W>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    fn finish(&mut self, ctx: &mut Context<Self>) {
        if let Some(done) = self.done.take() {
            let _ = done.send(self.program.clone());
        }
        ctx.stop();
    }
}

#[async_trait]
impl<A, W> Actor for Watcher<A, W>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    async fn started(&mut self, ctx: &mut Context<Self>) {
        tracing::debug!("Started");

        let lifecycle = ProgramLifecycle::new(
            self.store.clone(),
            self.wall_clock.clone(),
            ctx.emitter(),
            self.program.clone(),
        );
        let handle = LifecycleHandle::spawn(&*ctx, lifecycle).await;
        let msg = lifecycle::RegisterEmitter(ctx.emitter());
        if let Err(err) = handle.address().call(msg).await {
            tracing::error!(%err, "Failed to register an emitter");
        }
        match handle.state().await {
            Ok(snapshot) => {
                tracing::info!(program.id = %snapshot.program_id, state = %snapshot.state, "Mounted");
                if snapshot.state == BroadcastState::Archived {
                    self.finish(ctx);
                    return;
                }
            }
            Err(err) => tracing::error!(%err, "Failed to query the lifecycle state"),
        }
        self.lifecycle = Some(handle);

        let msg = clock::RegisterEmitter(ctx.emitter());
        if let Err(err) = self.clock.call(msg).await {
            tracing::error!(%err, "Failed to register an emitter");
        }
        let clock = self.clock.clone();
        ctx.spawn_task(async move {
            let mut interval = tokio::time::interval(REFRESH_INTERVAL);
            loop {
                interval.tick().await;
                clock.emit(RefreshCurrentUnixtime).await;
            }
        });
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        // Stops the lifecycle.
        self.lifecycle = None;
        tracing::debug!("Stopped");
    }
}

#[async_trait]
impl<A, W> Handler<NavigateToProgram> for Watcher<A, W>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    async fn handle(&mut self, msg: NavigateToProgram, ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "NavigateToProgram", %msg.program_id);
        match self.loader.load_program_page(&msg.program_id).await {
            Ok(Some(page)) => {
                log_page(&page);
                self.program = page.program.clone();
                if let Some(ref lifecycle) = self.lifecycle {
                    lifecycle.change_program(page.program).await;
                }
            }
            Ok(None) => {
                tracing::warn!(%msg.program_id, "Next program unavailable");
                self.finish(ctx);
            }
            Err(err) => {
                tracing::error!(%err, %msg.program_id, "Failed to load the next program");
                self.finish(ctx);
            }
        }
    }
}

#[async_trait]
impl<A, W> Handler<LifecycleStateChanged> for Watcher<A, W>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    async fn handle(&mut self, msg: LifecycleStateChanged, ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "LifecycleStateChanged");
        let LifecycleStateChanged(snapshot) = msg;
        tracing::info!(program.id = %snapshot.program_id, state = %snapshot.state, "Transition");
        if snapshot.state == BroadcastState::Archived {
            self.finish(ctx);
        }
    }
}

#[async_trait]
impl<A, W> Handler<CurrentUnixtimeChanged> for Watcher<A, W>
where
    A: ApiClient + Clone,
    W: WallClock + Clone,
{
    async fn handle(&mut self, msg: CurrentUnixtimeChanged, _ctx: &mut Context<Self>) {
        tracing::trace!(msg.name = "CurrentUnixtimeChanged", msg.unixtime_ms);
        let remaining_ms = self.program.end_at_ms() - msg.unixtime_ms;
        if remaining_ms > 0 {
            let remaining = Duration::from_secs(remaining_ms as u64 / 1000);
            tracing::debug!(
                program.id = %self.program.id,
                remaining = %humantime::format_duration(remaining),
                "Remaining"
            );
        }
    }
}

// </coverage:exclude>
