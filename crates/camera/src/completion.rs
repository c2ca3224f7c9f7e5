use {
    crate::{CameraError, command::Reply},
    std::{
        future::Future,
        pin::Pin,
        task::{Context, Poll},
    },
    tokio::sync::oneshot,
};

/// Outcome of one controller operation.
///
/// The operation is queued when the controller method is called; awaiting
/// the completion only observes the result. Dropping it without awaiting is
/// allowed.
#[must_use = "a completion reports the operation's error, if any"]
pub struct Completion<T> {
    receiver: oneshot::Receiver<Result<T, CameraError>>,
}

impl<T> Completion<T> {
    pub(crate) fn channel() -> (Reply<T>, Self) {
        let (sender, receiver) = oneshot::channel();
        (sender, Self { receiver })
    }

    /// A completion that already holds its result.
    pub(crate) fn ready(result: Result<T, CameraError>) -> Self {
        let (sender, completion) = Self::channel();
        let _ = sender.send(result);
        completion
    }

    /// Block the current thread until the operation finishes.
    ///
    /// Must not be called from within an async runtime.
    pub fn wait(self) -> Result<T, CameraError> {
        self.receiver.blocking_recv().unwrap_or_else(|_| Err(worker_gone()))
    }
}

impl<T> Future for Completion<T> {
    type Output = Result<T, CameraError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.receiver)
            .poll(cx)
            .map(|result| result.unwrap_or_else(|_| Err(worker_gone())))
    }
}

fn worker_gone() -> CameraError {
    CameraError::Channel("camera worker dropped the operation".to_string())
}
