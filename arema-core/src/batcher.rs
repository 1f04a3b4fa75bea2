use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::Poll;
use std::time::Duration;

use actlet::prelude::*;
use indexmap::IndexMap;
use tokio::sync::oneshot;

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::Error;
use crate::models::ProgramDetail;
use crate::models::ProgramId;
use crate::timer::TimerId;
use crate::timer::Timers;

type Reply = Result<ProgramDetail, Error>;

/// Coalesces fetches of programs by ID into bulk requests.
///
/// A window opens with the first fetch and closes when `max-batch-size`
/// distinct IDs have been enqueued or `window` has elapsed, whichever comes
/// first.  The IDs in the closed window are fetched with a single
/// `GET /programs?programIds=...`.
pub struct ProgramBatcher<A> {
    api: A,
    max_batch_size: usize,
    window: Duration,
    batch: Option<Batch>,
    next_batch_id: usize,
    timers: Timers<()>,
}

struct Batch {
    id: usize,
    pending: IndexMap<ProgramId, Vec<oneshot::Sender<Reply>>>,
}

impl<A> ProgramBatcher<A>
where
    A: ApiClient + Clone,
{
    pub fn new(config: Arc<Config>, api: A) -> Self {
        ProgramBatcher {
            api,
            max_batch_size: config.batcher.max_batch_size,
            window: config.batcher.window,
            batch: None,
            next_batch_id: 1,
            timers: Timers::new(),
        }
    }

    fn enqueue(
        &mut self,
        program_id: ProgramId,
        ctx: &Context<Self>,
    ) -> oneshot::Receiver<Reply> {
        if self.batch.is_none() {
            let id = self.next_batch_id;
            self.next_batch_id += 1;
            tracing::debug!(batch.id = id, "Open window");
            let addr = ctx.address().clone();
            self.timers.arm(ctx, (), self.window, move |timer_id| async move {
                addr.emit(WindowExpired { timer_id }).await;
            });
            self.batch = Some(Batch {
                id,
                pending: Default::default(),
            });
        }

        let (sender, receiver) = oneshot::channel();
        if let Some(batch) = self.batch.as_mut() {
            batch.pending.entry(program_id).or_default().push(sender);
            if batch.pending.len() >= self.max_batch_size {
                self.flush(ctx);
            }
        }
        receiver
    }

    fn flush(&mut self, ctx: &Context<Self>) {
        self.timers.cancel(&());
        let batch = match self.batch.take() {
            Some(batch) => batch,
            None => return,
        };
        tracing::debug!(batch.id, batch.size = batch.pending.len(), "Dispatch");
        let api = self.api.clone();
        ctx.spawn_task(async move {
            let ids: Vec<ProgramId> = batch.pending.keys().cloned().collect();
            let result = api.fetch_programs(&ids).await;
            batch.resolve(result);
        });
    }
}

impl Batch {
    fn resolve(self, result: Result<Vec<ProgramDetail>, Error>) {
        let mut pending = self.pending;
        match result {
            Ok(details) => {
                // Resolve in the order of the response.
                for detail in details {
                    if let Some(senders) = pending.shift_remove(&detail.program.id) {
                        for sender in senders {
                            let _ = sender.send(Ok(detail.clone()));
                        }
                    }
                }
                for (program_id, senders) in pending {
                    tracing::debug!(batch.id = self.id, %program_id, "Not found");
                    for sender in senders {
                        let _ = sender.send(Err(Error::ProgramNotFound));
                    }
                }
            }
            Err(err) => {
                tracing::error!(batch.id = self.id, %err, "Failed to fetch programs");
                let reason = err.to_string();
                for sender in pending.into_values().flatten() {
                    let _ = sender.send(Err(Error::BatchFailed(reason.clone())));
                }
            }
        }
    }
}

#[async_trait]
impl<A> Actor for ProgramBatcher<A>
where
    A: ApiClient + Clone,
{
    async fn started(&mut self, _ctx: &mut Context<Self>) {
        tracing::debug!("Started");
    }

    async fn stopped(&mut self, _ctx: &mut Context<Self>) {
        // Pending callers observe `Error::BatchCancelled`.
        self.batch = None;
        tracing::debug!("Stopped");
    }
}

// fetch program

#[derive(Message)]
#[reply(PendingProgram)]
pub struct FetchProgram {
    pub program_id: ProgramId,
}

#[async_trait]
impl<A> Handler<FetchProgram> for ProgramBatcher<A>
where
    A: ApiClient + Clone,
{
    async fn handle(&mut self, msg: FetchProgram, ctx: &mut Context<Self>) -> PendingProgram {
        tracing::debug!(msg.name = "FetchProgram", %msg.program_id);
        PendingProgram(self.enqueue(msg.program_id, ctx))
    }
}

/// A program which will be available when the batch completes.
pub struct PendingProgram(oneshot::Receiver<Reply>);

impl Future for PendingProgram {
    type Output = Reply;

    fn poll(mut self: Pin<&mut Self>, cx: &mut std::task::Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.0)
            .poll(cx)
            .map(|result| result.unwrap_or(Err(Error::BatchCancelled)))
    }
}

// window expired

#[derive(Message)]
struct WindowExpired {
    timer_id: TimerId,
}

#[async_trait]
impl<A> Handler<WindowExpired> for ProgramBatcher<A>
where
    A: ApiClient + Clone,
{
    async fn handle(&mut self, msg: WindowExpired, ctx: &mut Context<Self>) {
        tracing::debug!(msg.name = "WindowExpired", %msg.timer_id);
        if self.timers.expire(&(), msg.timer_id) {
            self.flush(ctx);
        }
    }
}

// </coverage:exclude>
