use super::*;
use crate::prelude::*;
use crate::testing::{Counter, Journal};

fn note(journal: &Journal, entry: &str) -> NeverFails<(), ()> {
    journal.record_program(entry.to_string())
}

#[tokio::test]
async fn test_make_yields_open_empty_scope() {
    let scope = Scope::make::<(), String>().run(&()).await.unwrap();
    assert!(!scope.is_closed());
    assert_eq!(scope.finalizer_count(), 0);
}

#[tokio::test]
async fn test_make_yields_fresh_scope_per_run() {
    let make = Scope::make::<(), String>();
    let first = make.run(&()).await.unwrap();
    let second = make.run(&()).await.unwrap();

    first.close::<(), String>().run(&()).await.unwrap();

    assert!(first.is_closed());
    assert!(!second.is_closed());
}

#[tokio::test]
async fn test_add_finalizer_is_deferred() {
    let scope = Scope::new();
    let journal = Journal::new();
    let register = scope.add_finalizer::<(), String>(note(&journal, "f"));

    assert_eq!(scope.finalizer_count(), 0);
    register.run(&()).await.unwrap();
    assert_eq!(scope.finalizer_count(), 1);
    register.run(&()).await.unwrap();
    assert_eq!(scope.finalizer_count(), 2);
    assert!(journal.is_empty());
}

#[tokio::test]
async fn test_finalizers_run_in_reverse_order() {
    let scope = Scope::new();
    let journal = Journal::new();

    let program = scope
        .add_finalizer::<(), String>(note(&journal, "F1"))
        .flat_map({
            let scope = scope.clone();
            let journal = journal.clone();
            move |_| scope.add_finalizer(note(&journal, "F2"))
        })
        .flat_map({
            let scope = scope.clone();
            let journal = journal.clone();
            move |_| scope.add_finalizer(note(&journal, "F3"))
        })
        .flat_map({
            let scope = scope.clone();
            move |_| scope.close()
        });

    program.run(&()).await.unwrap();

    assert_eq!(journal.entries(), vec!["F3", "F2", "F1"]);
    assert!(scope.is_closed());
    assert_eq!(scope.finalizer_count(), 0);
}

#[tokio::test]
async fn test_close_is_idempotent() {
    let scope = Scope::new();
    let counter = Counter::new();
    scope.register(counter.increment_program().unit()).await;

    scope.close_now().await;
    scope.close_now().await;
    scope.close::<(), String>().run(&()).await.unwrap();

    assert_eq!(counter.get(), 1);
}

#[tokio::test]
async fn test_late_registration_runs_immediately() {
    let scope = Scope::new();
    let counter = Counter::new();
    scope.close_now().await;

    scope
        .add_finalizer::<(), String>(counter.increment_program().unit())
        .run(&())
        .await
        .unwrap();

    assert_eq!(counter.get(), 1);
    assert_eq!(scope.finalizer_count(), 0);
}

#[cfg(feature = "tracing")]
#[tokio::test]
#[tracing_test::traced_test]
async fn test_late_registration_is_logged() {
    let scope = Scope::new();
    scope.close_now().await;

    scope.register(empty()).await;

    assert!(logs_contain("finalizer registered on a closed scope"));
}

#[tokio::test]
async fn test_panicking_finalizer_does_not_stop_the_rest() {
    let scope = Scope::new();
    let journal = Journal::new();

    scope.register(note(&journal, "first")).await;
    scope
        .register(succeed_lazy(|| panic!("finalizer exploded")))
        .await;
    scope.register(note(&journal, "last")).await;

    scope.close_now().await;

    assert_eq!(journal.entries(), vec!["last", "first"]);
}

#[tokio::test]
async fn test_debug_shows_state() {
    let scope = Scope::new();
    scope.register(empty()).await;
    assert_eq!(format!("{scope:?}"), "Scope { closed: false, finalizers: 1 }");
}

// acquire_release and scoped

fn resource(
    journal: &Journal,
    name: &'static str,
) -> Program<Scope, String, &'static str> {
    let on_release = journal.clone();
    acquire_release(
        journal
            .record_program(format!("acquire {name}"))
            .as_value(name),
        move |name: &&'static str| on_release.record_program(format!("release {name}")),
    )
}

#[tokio::test]
async fn test_acquire_release_releases_after_body() {
    let journal = Journal::new();
    let log = journal.clone();

    let program = resource(&journal, "conn")
        .flat_map(move |conn| log.record_program(format!("use {conn}")));

    assert_eq!(scoped(program).run(&()).await, Ok(()));
    assert_eq!(
        journal.entries(),
        vec!["acquire conn", "use conn", "release conn"]
    );
}

#[tokio::test]
async fn test_release_runs_once_when_body_fails() {
    let journal = Journal::new();

    let program =
        resource(&journal, "conn").flat_map(|_| fail::<Scope, _, ()>("query failed".to_string()));

    assert_eq!(
        scoped(program).run(&()).await,
        Err("query failed".to_string())
    );
    assert_eq!(journal.entries(), vec!["acquire conn", "release conn"]);
}

#[tokio::test]
async fn test_failed_acquire_registers_nothing() {
    let released = Counter::new();
    let on_release = released.clone();

    let program = acquire_release(
        fail::<Scope, _, i32>("cannot connect".to_string()),
        move |_: &i32| on_release.increment_program(),
    );

    assert_eq!(
        scoped(program).run(&()).await,
        Err("cannot connect".to_string())
    );
    assert_eq!(released.get(), 0);
}

#[tokio::test]
async fn test_registration_precedes_later_failure() {
    let journal = Journal::new();

    let program = resource(&journal, "a")
        .zip(resource(&journal, "b"))
        .zip(fail::<Scope, _, ()>("b broke".to_string()))
        .zip(resource(&journal, "never"));

    assert!(scoped(program).run(&()).await.is_err());
    assert_eq!(
        journal.entries(),
        vec!["acquire a", "acquire b", "release b", "release a"]
    );
}

#[tokio::test]
async fn test_scoped_uses_fresh_scope_per_run() {
    let journal = Journal::new();
    let program = scoped(resource(&journal, "r"));

    program.run(&()).await.unwrap();
    program.run(&()).await.unwrap();

    assert_eq!(
        journal.entries(),
        vec!["acquire r", "release r", "acquire r", "release r"]
    );
}

#[tokio::test]
async fn test_scoped_with_passes_scope() {
    let journal = Journal::new();
    let log = journal.clone();

    let program = scoped_with(move |scope: Scope| {
        let log = log.clone();
        scope
            .add_finalizer::<(), String>(log.record_program("cleanup"))
            .flat_map(move |_| log.record_program("body"))
    });

    assert_eq!(program.run(&()).await, Ok(()));
    assert_eq!(journal.entries(), vec!["body", "cleanup"]);
}

#[tokio::test]
async fn test_scoped_with_reads_outer_environment() {
    #[derive(Clone)]
    struct Config {
        name: String,
        retries: u32,
    }

    let journal = Journal::new();
    let log = journal.clone();

    let program = scoped_with(move |scope: Scope| {
        let log = log.clone();
        access(|config: &Config| config.name.clone()).flat_map(move |name| {
            scope
                .add_finalizer(log.record_program(format!("release {name}")))
                .flat_map(|_| access(|config: &Config| config.retries))
        })
    });

    let config = Config {
        name: "pool".to_string(),
        retries: 3,
    };
    let result: Result<u32, String> = program.run(&config).await;

    assert_eq!(result, Ok(3));
    assert_eq!(journal.entries(), vec!["release pool"]);
}

#[tokio::test]
async fn test_scoped_env_combines_environment() {
    #[derive(Clone)]
    struct Env {
        scope: Scope,
        label: String,
    }

    impl HasScope for Env {
        fn scope(&self) -> &Scope {
            &self.scope
        }
    }

    let journal = Journal::new();
    let on_release = journal.clone();
    let labelled = acquire_release(
        access::<Env, String, _, _>(|env| env.label.clone()),
        move |label: &String| on_release.record_program(format!("drop {label}")),
    );

    let program = scoped_env(labelled, |label: &String, scope| Env {
        scope,
        label: label.clone(),
    });

    assert_eq!(
        program.run(&"socket".to_string()).await,
        Ok("socket".to_string())
    );
    assert_eq!(journal.entries(), vec!["drop socket"]);
}

#[tokio::test]
async fn test_scope_closes_when_program_panics() {
    let journal = Journal::new();
    let program = resource(&journal, "file")
        .flat_map(|_| succeed_lazy(|| -> () { panic!("body panicked") }));

    let handle = tokio::spawn(scoped(program).run(&()));

    assert!(handle.await.unwrap_err().is_panic());
    assert_eq!(journal.entries(), vec!["acquire file", "release file"]);
}

#[tokio::test]
async fn test_scope_closes_when_dropped_mid_flight() {
    let journal = Journal::new();
    let program = resource(&journal, "lock").flat_map(|_| {
        from_async(|_: &Scope| async {
            futures::future::pending::<()>().await;
            Ok::<(), String>(())
        })
    });

    let handle = tokio::spawn(scoped(program).run(&()));
    tokio::task::yield_now().await;
    while journal.is_empty() {
        tokio::task::yield_now().await;
    }
    handle.abort();

    assert!(handle.await.unwrap_err().is_cancelled());
    assert_eq!(journal.entries(), vec!["acquire lock", "release lock"]);
}

#[tokio::test]
async fn test_interrupted_close_resumes_running_finalizer() {
    use futures::FutureExt;

    let journal = Journal::new();
    let done = journal.clone();
    let scope = Scope::new();
    let suspending: NeverFails<(), ()> = journal
        .record_program("start")
        .flat_map(|_| {
            from_async(|_: &()| async {
                tokio::task::yield_now().await;
                Ok::<_, std::convert::Infallible>(())
            })
        })
        .flat_map(move |_| done.record_program("end"));

    scope.register(note(&journal, "earlier")).await;
    scope.register(suspending).await;

    // One poll starts the newest finalizer, which then yields.
    assert!(scope.close_now().now_or_never().is_none());
    assert_eq!(journal.entries(), vec!["start"]);
    assert!(scope.has_pending_work());

    scope.close_now().await;

    assert_eq!(journal.entries(), vec!["start", "end", "earlier"]);
    assert!(!scope.has_pending_work());
}
