//! Async readiness futures.

use core::{
    future::Future,
    pin::Pin,
    task::{Context, Poll, Waker},
};

/// Resolves once `ready` reports true.
///
/// The waker is registered before the second check, so a completion that
/// lands between the two checks is never lost.
#[must_use = "futures do nothing unless you `.await` or poll them"]
pub struct ReadyFuture<G, F> {
    register: G,
    ready: F,
}

impl<G, F> ReadyFuture<G, F>
where
    G: Fn(&Waker) + Unpin,
    F: FnMut() -> bool + Unpin,
{
    /// Create a future from a waker registration hook and a readiness check
    pub const fn new(register: G, ready: F) -> Self {
        Self { register, ready }
    }
}

impl<G, F> Future for ReadyFuture<G, F>
where
    G: Fn(&Waker) + Unpin,
    F: FnMut() -> bool + Unpin,
{
    type Output = ();

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        if (this.ready)() {
            return Poll::Ready(());
        }
        (this.register)(cx.waker());
        if (this.ready)() {
            Poll::Ready(())
        } else {
            Poll::Pending
        }
    }
}
