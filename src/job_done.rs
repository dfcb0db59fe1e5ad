use futures_channel::oneshot::{Canceled, Receiver};
use futures_lite::FutureExt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

/// A future that resolves once a job passed to
/// [`Dispatcher::run_notify`](crate::Dispatcher::run_notify) has returned.
///
/// Resolves to [`Canceled`] if the job was dropped before it returned,
/// because it panicked or because the dispatcher was torn down.
#[derive(Debug)]
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct JobDone(Inner);

#[derive(Debug)]
enum Inner {
    Settled(Result<(), Canceled>),
    Pending(Receiver<()>),
}

impl JobDone {
    pub(crate) fn ran() -> Self {
        JobDone(Inner::Settled(Ok(())))
    }

    pub(crate) fn pending(receiver: Receiver<()>) -> Self {
        JobDone(Inner::Pending(receiver))
    }

    /// Whether the job has already returned (or was dropped),
    /// i.e. polling would not return [`Poll::Pending`].
    pub fn is_ready(&mut self) -> bool {
        if let Inner::Pending(receiver) = &mut self.0 {
            match receiver.try_recv() {
                Ok(None) => return false,
                Ok(Some(())) => self.0 = Inner::Settled(Ok(())),
                Err(canceled) => self.0 = Inner::Settled(Err(canceled)),
            }
        }
        true
    }
}

impl Future for JobDone {
    type Output = Result<(), Canceled>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();
        match &mut this.0 {
            Inner::Settled(result) => Poll::Ready(*result),
            Inner::Pending(receiver) => {
                let result = std::task::ready!(FutureExt::poll(receiver, cx));
                this.0 = Inner::Settled(result);
                Poll::Ready(result)
            }
        }
    }
}

#[cfg(test)]
static_assertions::assert_impl_all!(JobDone: Send, Unpin);
