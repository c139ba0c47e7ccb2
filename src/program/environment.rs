//! Supplying and reshaping the environment.
//!
//! There is no intersection type in Rust, so "a program that needs both a
//! `Database` and a `Clock`" is spelled one of two ways:
//!
//! - a generic environment bounded by capability traits
//!   (`R: HasDatabase + HasClock`), or
//! - a concrete bundle struct that other programs are projected into with
//!   [`Program::provide_from`].
//!
//! ```rust
//! use slackwater::prelude::*;
//!
//! trait HasName {
//!     fn name(&self) -> &str;
//! }
//! trait HasPort {
//!     fn port(&self) -> u16;
//! }
//!
//! #[derive(Clone)]
//! struct Services {
//!     name: String,
//!     port: u16,
//! }
//! impl HasName for Services {
//!     fn name(&self) -> &str { &self.name }
//! }
//! impl HasPort for Services {
//!     fn port(&self) -> u16 { self.port }
//! }
//!
//! fn address<R>() -> NeverFails<R, String>
//! where
//!     R: HasName + HasPort + Clone + Send + Sync + 'static,
//! {
//!     access(|env: &R| format!("{}:{}", env.name(), env.port()))
//! }
//!
//! # tokio_test::block_on(async {
//! let closed = address().provide(Services { name: "localhost".into(), port: 8080 });
//! assert_eq!(closed.run(&()).await, Ok("localhost:8080".to_string()));
//! # });
//! ```

use std::sync::Arc;

use super::{OpKind, Program};

impl<R, E, A> Program<R, E, A>
where
    R: Clone + Send + Sync + 'static,
    E: Send + 'static,
    A: Send + 'static,
{
    /// Supply the environment, producing a program that requires nothing.
    ///
    /// The value is captured and cloned into every run. Calling `provide`
    /// several times on the same program gives independent closed programs.
    pub fn provide(self, env: R) -> Program<(), E, A> {
        Program::suspend(OpKind::Provide, move |()| self.run_owned(env.clone()))
    }

    /// Derive the required environment from a different one with a pure function.
    ///
    /// ```rust
    /// use slackwater::prelude::*;
    ///
    /// # tokio_test::block_on(async {
    /// #[derive(Clone)]
    /// struct Config {
    ///     raw_port: String,
    /// }
    ///
    /// let parse = environment::<String, String>()
    ///     .flat_map(|s| attempt(move || s.parse::<u16>().map_err(|e| e.to_string())));
    /// let program = parse.provide_from(|config: &Config| config.raw_port.clone());
    ///
    /// let config = Config { raw_port: "8080".to_string() };
    /// assert_eq!(program.run(&config).await, Ok(8080));
    /// # });
    /// ```
    pub fn provide_from<R1, F>(self, f: F) -> Program<R1, E, A>
    where
        R1: Clone + Send + Sync + 'static,
        F: Fn(&R1) -> R + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Program::suspend(OpKind::Provide, move |outer: R1| {
            let this = self.clone();
            let f = Arc::clone(&f);
            Box::pin(async move { this.run_owned(f(&outer)).await })
        })
    }

    /// Derive the required environment by running another program.
    ///
    /// `source` runs first against the outer environment; its value becomes
    /// this program's environment. A failure of `source` is this program's
    /// failure.
    pub fn provide_from_program<R1>(self, source: Program<R1, E, R>) -> Program<R1, E, A>
    where
        R1: Clone + Send + Sync + 'static,
    {
        Program::suspend(OpKind::Provide, move |outer: R1| {
            let env = source.run_owned(outer);
            let this = self.clone();
            Box::pin(async move {
                let env = env.await?;
                this.run_owned(env).await
            })
        })
    }
}

impl<E, A> Program<(), E, A>
where
    E: Send + 'static,
    A: Send + 'static,
{
    /// Treat a closed program as one that runs in any environment.
    ///
    /// The environment it is given is ignored.
    pub fn widen_env<R>(self) -> Program<R, E, A>
    where
        R: Clone + Send + Sync + 'static,
    {
        Program::suspend(OpKind::Provide, move |_: R| self.run_owned(()))
    }
}
