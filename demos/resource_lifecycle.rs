//! Resource Lifecycle Example
//!
//! Demonstrates scoped resources: acquisition registers the release, and the
//! scope runs every release in reverse order when the program ends, whether
//! it succeeded or failed.
//!
//! Run with: cargo run --example resource_lifecycle

use slackwater::prelude::*;
use slackwater::runtime::RuntimeConfig;

#[derive(Debug, Clone)]
struct Connection {
    id: u32,
}

#[derive(Clone)]
struct Services {
    scope: Scope,
    database_url: String,
}

impl HasScope for Services {
    fn scope(&self) -> &Scope {
        &self.scope
    }
}

fn connect(id: u32) -> Program<Services, String, Connection> {
    acquire_release(
        access(move |services: &Services| {
            println!("  open connection {id} to {}", services.database_url);
            Connection { id }
        }),
        |conn: &Connection| {
            let id = conn.id;
            succeed_lazy(move || println!("  close connection {id}"))
        },
    )
}

fn query(conn: Connection, sql: &'static str) -> Program<Services, String, usize> {
    attempt(move || {
        println!("  [{}] {sql}", conn.id);
        if sql.contains("DROP") {
            Err(format!("refusing to run {sql:?}"))
        } else {
            Ok(sql.len())
        }
    })
}

fn in_services<A>(program: Program<Services, String, A>) -> Program<String, String, A>
where
    A: Send + 'static,
{
    scoped_env(program, |url: &String, scope| Services {
        scope,
        database_url: url.clone(),
    })
}

fn main() {
    let runtime = match RuntimeConfig::current_thread().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("could not start runtime: {e}");
            return;
        }
    };

    println!("\n=== Two connections, success ===");
    let report = connect(1)
        .zip(connect(2))
        .flat_map(|(a, b)| query(a, "SELECT 1").zip_with(query(b, "SELECT 2"), |x, y| x + y));
    let program = in_services(report).provide("postgres://localhost".to_string());
    println!("  result: {:?}", runtime.block_on(program));

    println!("\n=== Failure after acquisition ===");
    let failing = connect(3).flat_map(|conn| query(conn, "DROP TABLE users"));
    let program = in_services(failing).provide("postgres://localhost".to_string());
    println!("  result: {:?}", runtime.block_on(program));

    println!("\n=== Manual scope ===");
    let manual = Scope::make::<(), String>().flat_map(|scope| {
        scope
            .add_finalizer(succeed_lazy(|| println!("  finalizer A")))
            .flat_map({
                let scope = scope.clone();
                move |_| scope.add_finalizer(succeed_lazy(|| println!("  finalizer B")))
            })
            .flat_map(move |_| scope.close())
    });
    println!("  result: {:?}", runtime.block_on(manual));

    runtime.shutdown();
}
