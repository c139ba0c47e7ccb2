//! Span instrumentation for programs.

use tracing::Instrument as _;

use super::{OpKind, Program};

impl<R, E, A> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Run this program inside `span`.
    ///
    /// The span is entered every time the program is polled, on every run.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// let order_id = 42;
    /// let program: Program<(), String, i32> = succeed(order_id)
    ///     .instrument(tracing::info_span!("fetch_order", order_id));
    /// assert_eq!(program.run(&()).await, Ok(42));
    /// # });
    /// ```
    pub fn instrument(self, span: tracing::Span) -> Program<R, E, A> {
        Program::suspend(OpKind::Instrument, move |env: R| {
            Box::pin(self.run_owned(env).instrument(span.clone()))
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;
    use crate::program::OpKind;
    use tracing_test::traced_test;

    #[tokio::test]
    async fn test_instrument_preserves_success() {
        let program: Program<(), String, i32> =
            succeed(42).instrument(tracing::info_span!("test_span"));
        assert_eq!(program.run(&()).await, Ok(42));
    }

    #[tokio::test]
    async fn test_instrument_preserves_failure() {
        let program =
            fail::<(), _, i32>("oops".to_string()).instrument(tracing::info_span!("failing"));
        assert_eq!(program.run(&()).await, Err("oops".to_string()));
    }

    #[tokio::test]
    async fn test_nested_spans_compose() {
        let inner: Program<(), String, i32> =
            succeed(1).instrument(tracing::debug_span!("inner_op"));
        let outer = inner
            .map(|x| x * 2)
            .instrument(tracing::debug_span!("step"))
            .flat_map(|x| succeed(x + 10).instrument(tracing::debug_span!("outer_op")));

        assert_eq!(outer.kind(), OpKind::FlatMap);
        assert_eq!(outer.run(&()).await, Ok(12));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_events_inside_span_are_recorded() {
        let program: Program<(), String, ()> = succeed_lazy(|| tracing::info!("inside the span"))
            .instrument(tracing::info_span!("recorded_span"));

        program.run(&()).await.unwrap();

        assert!(logs_contain("recorded_span"));
        assert!(logs_contain("inside the span"));
    }
}
