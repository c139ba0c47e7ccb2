//! Deferred, typed programs.
//!
//! A [`Program<R, E, A>`] describes a computation that:
//! - Requires an environment of type `R` (`()` when it needs nothing)
//! - May fail with an error of type `E`
//! - Succeeds with a value of type `A`
//!
//! Building a program never runs anything. Combinators return new programs,
//! and a program can be run any number of times; every run re-executes the
//! whole description, including lazy suppliers.
//!
//! # Representation
//!
//! A program is a tagged node rather than an opaque closure. Primitive nodes
//! (succeed, fail, environment access, attempt) are stored directly and
//! composite nodes carry an [`OpKind`] tag, so the shape of a program can be
//! inspected with [`Program::kind`] without executing it.
//!
//! # Never-failing programs
//!
//! [`NeverFails<R, A>`] is `Program<R, Infallible, A>`. The compiler knows such a
//! program has no failure branch, and [`Program::widen_error`] turns it into a
//! program with any error type.
//!
//! # Example
//!
//! ```rust
//! use slackwater::prelude::*;
//!
//! # tokio_test::block_on(async {
//! let program = environment::<String, String>()
//!     .flat_map(|raw| attempt(move || raw.parse::<i32>().map_err(|e| e.to_string())))
//!     .map(|n| n * 2);
//!
//! assert_eq!(program.run(&"21".to_string()).await, Ok(42));
//! assert!(program.run(&"x".to_string()).await.is_err());
//! # });
//! ```

mod combinators;
mod constructors;
mod environment;
mod repeat;
#[cfg(feature = "tracing")]
mod tracing;
mod widen;


use std::any::Any;
use std::convert::Infallible;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::sync::Arc;

pub use constructors::{
    access, attempt, attempt_catching, empty, environment, fail, fail_lazy, from_async,
    succeed, succeed_lazy,
};

/// A boxed future that is Send
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A program that cannot fail.
pub type NeverFails<R, A> = Program<R, Infallible, A>;

/// A success value with its type erased. Nodes of every success type share
/// one representation so the interpreter can chain them in a loop.
type AnyValue = Box<dyn Any + Send>;

type Thunk<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Reader<R> = Arc<dyn Fn(&R) -> AnyValue + Send + Sync>;
type Step<R, E> = Arc<dyn Fn(R) -> BoxFuture<'static, Result<AnyValue, E>> + Send + Sync>;

/// The kind of operation at the root of a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpKind {
    /// Yields a value.
    Succeed,
    /// Fails with an error.
    Fail,
    /// Reads the environment.
    Environment,
    /// Runs a fallible computation.
    Attempt,
    /// Runs an async computation.
    Async,
    /// Sequences two programs.
    FlatMap,
    /// Transforms the success value.
    Map,
    /// Swaps the success and failure channels.
    Flip,
    /// Recovers from failure.
    CatchAll,
    /// Runs two programs and pairs their results.
    Zip,
    /// Supplies or projects the environment.
    Provide,
    /// Acquires a resource and registers its release.
    AcquireRelease,
    /// Registers a finalizer on a scope.
    AddFinalizer,
    /// Closes a scope.
    CloseScope,
    /// Runs a program inside a fresh scope.
    Scoped,
    /// Re-runs a program on success, driven by a schedule.
    Repeat,
    /// Re-runs a program on failure, driven by a schedule.
    Retry,
    /// Runs a program inside a tracing span.
    Instrument,
}

/// What happens to the value of a chained source.
enum Continuation<R, E> {
    Map(Arc<dyn Fn(AnyValue) -> AnyValue + Send + Sync>),
    FlatMap(Arc<dyn Fn(AnyValue) -> Node<R, E> + Send + Sync>),
}

impl<R, E> Clone for Continuation<R, E> {
    fn clone(&self) -> Self {
        match self {
            Continuation::Map(f) => Continuation::Map(Arc::clone(f)),
            Continuation::FlatMap(f) => Continuation::FlatMap(Arc::clone(f)),
        }
    }
}

enum Node<R, E> {
    Succeed(Thunk<AnyValue>),
    Fail(Thunk<E>),
    Access(Reader<R>),
    Attempt(Thunk<Result<AnyValue, E>>),
    Chain {
        kind: OpKind,
        source: Arc<Node<R, E>>,
        then: Continuation<R, E>,
    },
    Suspend {
        kind: OpKind,
        step: Step<R, E>,
    },
}

impl<R, E> Clone for Node<R, E> {
    fn clone(&self) -> Self {
        match self {
            Node::Succeed(thunk) => Node::Succeed(Arc::clone(thunk)),
            Node::Fail(thunk) => Node::Fail(Arc::clone(thunk)),
            Node::Access(read) => Node::Access(Arc::clone(read)),
            Node::Attempt(thunk) => Node::Attempt(Arc::clone(thunk)),
            Node::Chain { kind, source, then } => Node::Chain {
                kind: *kind,
                source: Arc::clone(source),
                then: then.clone(),
            },
            Node::Suspend { kind, step } => Node::Suspend {
                kind: *kind,
                step: Arc::clone(step),
            },
        }
    }
}

impl<R, E> Node<R, E> {
    fn kind(&self) -> OpKind {
        match self {
            Node::Succeed(_) => OpKind::Succeed,
            Node::Fail(_) => OpKind::Fail,
            Node::Access(_) => OpKind::Environment,
            Node::Attempt(_) => OpKind::Attempt,
            Node::Chain { kind, .. } | Node::Suspend { kind, .. } => *kind,
        }
    }
}

fn erase<A: Send + 'static>(value: A) -> AnyValue {
    Box::new(value)
}

fn downcast<A: 'static>(value: AnyValue) -> A {
    match value.downcast::<A>() {
        Ok(value) => *value,
        Err(_) => unreachable!("a node yields the type its program was built with"),
    }
}

/// Run a node to completion.
///
/// Chains are unwound onto an explicit stack of continuations instead of
/// nested futures, so long `flat_map` chains and recursive programs run in
/// constant stack space.
async fn interpret<R, E>(root: Node<R, E>, env: R) -> Result<AnyValue, E>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
{
    let mut stack: Vec<Continuation<R, E>> = Vec::new();
    let mut current = root;
    loop {
        let outcome = match current {
            Node::Chain { source, then, .. } => {
                stack.push(then);
                current = Node::clone(&source);
                continue;
            }
            Node::Succeed(thunk) => Ok(thunk()),
            Node::Fail(thunk) => Err(thunk()),
            Node::Access(read) => Ok(read(&env)),
            Node::Attempt(thunk) => thunk(),
            Node::Suspend { step, .. } => step(env.clone()).await,
        };

        let mut value = outcome?;
        current = loop {
            match stack.pop() {
                None => return Ok(value),
                Some(Continuation::Map(f)) => value = f(value),
                Some(Continuation::FlatMap(f)) => break f(value),
            }
        };
    }
}

/// A deferred computation requiring `R`, failing with `E`, succeeding with `A`.
///
/// Programs are immutable values. Cloning is cheap (reference counted) and a
/// clone describes exactly the same computation.
///
/// # Examples
///
/// ```rust
/// use slackwater::prelude::*;
///
/// # tokio_test::block_on(async {
/// let program: Program<(), String, i32> = succeed(5)
///     .map(|x| x * 2)
///     .flat_map(|x| succeed(x + 10));
///
/// assert_eq!(program.run(&()).await, Ok(20));
/// // Programs can be run again.
/// assert_eq!(program.run(&()).await, Ok(20));
/// # });
/// ```
pub struct Program<R, E, A> {
    node: Node<R, E>,
    _value: PhantomData<fn() -> A>,
}

impl<R, E, A> Clone for Program<R, E, A> {
    fn clone(&self) -> Self {
        Program::from_node(self.node.clone())
    }
}

impl<R, E, A> fmt::Debug for Program<R, E, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Program")
            .field("kind", &self.kind())
            .finish()
    }
}

impl<R, E, A> Program<R, E, A> {
    /// The kind of operation at the root of this program.
    ///
    /// Inspecting a program never runs it.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    /// use slackwater::program::OpKind;
    ///
    /// let program: NeverFails<(), i32> = succeed(1);
    /// assert_eq!(program.kind(), OpKind::Succeed);
    /// assert_eq!(program.clone().map(|x| x + 1).kind(), OpKind::Map);
    /// assert_eq!(program.flat_map(|x| succeed(x + 1)).kind(), OpKind::FlatMap);
    /// ```
    pub fn kind(&self) -> OpKind {
        self.node.kind()
    }

    fn from_node(node: Node<R, E>) -> Self {
        Program {
            node,
            _value: PhantomData,
        }
    }
}

impl<R, E, A> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Build a composite program from a step function.
    ///
    /// The step is called once per run with an owned environment and must
    /// only construct its future; all work happens when the future is polled.
    pub(crate) fn suspend<F>(kind: OpKind, step: F) -> Self
    where
        F: Fn(R) -> BoxFuture<'static, Result<A, E>> + Send + Sync + 'static,
    {
        Program::from_node(Node::Suspend {
            kind,
            step: Arc::new(move |env: R| -> BoxFuture<'static, Result<AnyValue, E>> {
                let run = step(env);
                Box::pin(async move { run.await.map(erase) })
            }),
        })
    }

    /// Chain a continuation onto this program without nesting futures.
    fn chain<B>(self, kind: OpKind, then: Continuation<R, E>) -> Program<R, E, B> {
        Program::from_node(Node::Chain {
            kind,
            source: Arc::new(self.node),
            then,
        })
    }

    /// Run this program against an environment.
    ///
    /// The environment is cloned into the returned future, which is `'static`
    /// and can be spawned. Nothing happens until the future is polled.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// #[derive(Clone)]
    /// struct Env {
    ///     multiplier: i32,
    /// }
    ///
    /// let program: Program<Env, String, i32> = access(|env: &Env| env.multiplier * 2);
    /// assert_eq!(program.run(&Env { multiplier: 21 }).await, Ok(42));
    /// # });
    /// ```
    pub fn run(&self, env: &R) -> BoxFuture<'static, Result<A, E>> {
        self.run_owned(env.clone())
    }

    pub(crate) fn run_owned(&self, env: R) -> BoxFuture<'static, Result<A, E>> {
        let node = self.node.clone();
        Box::pin(async move { interpret(node, env).await.map(downcast::<A>) })
    }
}
