use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use fastrace::Span;
use pin_project_lite::pin_project;

/// An extension trait for [`Future`]s to run them within a tracing span
/// and report the elapsed wall-clock time upon their completion.
/// This is inspired by [`fastrace::future::FutureExt::in_span`].
pub trait TimedFutureExt: Future {
    /// The timer starts when the returned future is first polled,
    /// and the recorder is called exactly once with the output and the elapsed time.
    fn in_span_with_timer<R>(self, span: Span, recorder: R) -> InSpanWithTimer<Self, R>
    where
        Self: Sized,
        R: FnOnce(&Self::Output, Duration);
}

impl<T: Future> TimedFutureExt for T {
    fn in_span_with_timer<R>(self, span: Span, recorder: R) -> InSpanWithTimer<Self, R>
    where
        Self: Sized,
        R: FnOnce(&T::Output, Duration),
    {
        InSpanWithTimer {
            inner: self,
            span: Some(span),
            started: None,
            recorder: Some(recorder),
        }
    }
}

pin_project! {
    pub struct InSpanWithTimer<F, R> {
        #[pin]
        inner: F,
        span: Option<Span>,
        started: Option<Instant>,
        recorder: Option<R>,
    }
}

impl<F, R> Future for InSpanWithTimer<F, R>
where
    F: Future,
    R: FnOnce(&F::Output, Duration),
{
    type Output = F::Output;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.project();
        let started = *this.started.get_or_insert_with(Instant::now);

        let _guard = this.span.as_ref().map(|s| s.set_local_parent());
        let poll = this.inner.poll(cx);

        if let Poll::Ready(ref output) = poll {
            // Dropping the span here ends it together with the inner future.
            let _span = this.span.take();
            if let Some(recorder) = this.recorder.take() {
                recorder(output, started.elapsed());
            }
        }

        poll
    }
}
