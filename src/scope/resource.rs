//! Scoped-resource combinators.

use std::future::Future;
use std::sync::Arc;

use super::{CloseOnDrop, HasScope, Scope};
use crate::program::{NeverFails, OpKind, Program};

/// Acquire a resource and register its release on the environment's scope.
///
/// The release is registered as soon as `acquire` succeeds, before anything
/// else runs, so a later failure in the same scope still releases it. If
/// `acquire` fails nothing is registered.
pub fn acquire_release<R, E, A, B, F>(acquire: Program<R, E, A>, release: F) -> Program<R, E, A>
where
    R: HasScope + Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(&A) -> NeverFails<R, B> + Send + Sync + 'static,
{
    acquire_release_with(acquire, release, |env: &R| env.scope().clone())
}

/// Like [`acquire_release`], with the scope projected out of the environment
/// by `get_scope` instead of the [`HasScope`] trait.
///
/// ```rust
/// use slackwater::prelude::*;
/// use slackwater::testing::Counter;
///
/// # tokio_test::block_on(async {
/// #[derive(Clone)]
/// struct Env {
///     scope: Scope,
///     pool_size: usize,
/// }
///
/// let released = Counter::new();
/// let on_release = released.clone();
/// let pool = acquire_release_with(
///     access::<Env, String, _, _>(|env| vec![0u8; env.pool_size]),
///     move |_pool: &Vec<u8>| on_release.increment_program(),
///     |env: &Env| env.scope.clone(),
/// );
///
/// let program = scoped_env(pool.map(|p| p.len()), |size: &usize, scope| Env {
///     scope,
///     pool_size: *size,
/// });
/// assert_eq!(program.run(&4).await, Ok(4));
/// assert_eq!(released.get(), 1);
/// # });
/// ```
pub fn acquire_release_with<R, E, A, B, F, G>(
    acquire: Program<R, E, A>,
    release: F,
    get_scope: G,
) -> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    B: Send + 'static,
    F: Fn(&A) -> NeverFails<R, B> + Send + Sync + 'static,
    G: Fn(&R) -> Scope + Send + Sync + 'static,
{
    let release = Arc::new(release);
    let get_scope = Arc::new(get_scope);
    Program::suspend(OpKind::AcquireRelease, move |env: R| {
        let acquired = acquire.run_owned(env.clone());
        let release = Arc::clone(&release);
        let get_scope = Arc::clone(&get_scope);
        Box::pin(async move {
            let resource = acquired.await?;
            let finalizer = release(&resource).provide(env.clone()).unit();
            get_scope(&env).register(finalizer).await;
            Ok(resource)
        })
    })
}

/// Run `program` in a fresh scope, closing it when the program ends.
///
/// The close runs every registered finalizer, newest first, whether the
/// program succeeds or fails, and the program's own outcome is returned.
///
/// ```rust
/// use slackwater::prelude::*;
/// use slackwater::testing::Journal;
///
/// # tokio_test::block_on(async {
/// let journal = Journal::new();
/// let log = journal.clone();
///
/// let program = environment::<Scope, String>().flat_map(move |scope| {
///     scope
///         .add_finalizer(log.record_program("cleanup"))
///         .flat_map(|_| fail::<Scope, _, ()>("boom".to_string()))
/// });
///
/// assert_eq!(scoped(program).run(&()).await, Err("boom".to_string()));
/// assert_eq!(journal.entries(), vec!["cleanup"]);
/// # });
/// ```
pub fn scoped<E, A>(program: Program<Scope, E, A>) -> Program<(), E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    scoped_env(program, |_: &(), scope| scope)
}

/// Run the program built by `f` from a fresh scope, closing the scope when it
/// ends.
///
/// The built program runs in the caller's environment, so it can read its
/// configuration and register finalizers on the scope it was handed.
///
/// ```rust
/// use slackwater::prelude::*;
/// use slackwater::testing::Journal;
///
/// # tokio_test::block_on(async {
/// let journal = Journal::new();
/// let log = journal.clone();
///
/// let program = scoped_with(move |scope: Scope| {
///     let log = log.clone();
///     access(|name: &String| name.clone()).flat_map(move |name| {
///         scope
///             .add_finalizer(log.record_program(format!("close {name}")))
///             .as_value(name)
///     })
/// });
///
/// let result: Result<String, String> = program.run(&"db".to_string()).await;
/// assert_eq!(result, Ok("db".to_string()));
/// assert_eq!(journal.entries(), vec!["close db"]);
/// # });
/// ```
pub fn scoped_with<R, E, A, F>(f: F) -> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(Scope) -> Program<R, E, A> + Send + Sync + 'static,
{
    let f = Arc::new(f);
    Program::suspend(OpKind::Scoped, move |env: R| {
        let f = Arc::clone(&f);
        Box::pin(in_fresh_scope(move |scope| f(scope).run_owned(env)))
    })
}

/// Run `program` in a fresh scope, building its environment from the caller's
/// environment and the scope with `combine`.
pub fn scoped_env<RO, RI, E, A, F>(program: Program<RI, E, A>, combine: F) -> Program<RO, E, A>
where
    RO: Clone + Send + Sync + 'static,
    RI: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
    F: Fn(&RO, Scope) -> RI + Send + Sync + 'static,
{
    let combine = Arc::new(combine);
    Program::suspend(OpKind::Scoped, move |outer: RO| {
        let program = program.clone();
        let combine = Arc::clone(&combine);
        Box::pin(in_fresh_scope(move |scope| {
            program.run_owned(combine(&outer, scope))
        }))
    })
}

/// Create a scope, run `body` with it and close the scope on every exit path.
async fn in_fresh_scope<T, B, Fut>(body: B) -> T
where
    B: FnOnce(Scope) -> Fut,
    Fut: Future<Output = T>,
{
    let scope = Scope::new();
    let guard = CloseOnDrop::new(scope.clone());
    let result = body(scope).await;
    guard.close().await;
    result
}
