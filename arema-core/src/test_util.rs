use actlet::prelude::*;
use tokio::sync::mpsc;

/// An emitter which forwards messages to a channel.
///
/// Unlike a mock, it can be moved into an actor and still be inspected from
/// the test body after the actor stopped.
pub(crate) struct ChannelEmitter<M>(mpsc::UnboundedSender<M>);

pub(crate) fn channel_emitter<M>() -> (Emitter<M>, mpsc::UnboundedReceiver<M>)
where
    M: Signal + 'static,
{
    let (sender, receiver) = mpsc::unbounded_channel();
    (Emitter::new(ChannelEmitter(sender)), receiver)
}

#[async_trait]
impl<M> Emit<M> for ChannelEmitter<M>
where
    M: Signal + 'static,
{
    async fn emit(&self, msg: M) {
        let _ = self.0.send(msg);
    }

    fn fire(&self, msg: M) {
        let _ = self.0.send(msg);
    }
}
