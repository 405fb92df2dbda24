//! A small application wired with the global catalog.
//!
//! Run with `RUST_LOG=khazna_container=debug cargo run -p khazna --example app`.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use khazna::prelude::*;
use khazna::async_trait;
use tracing_subscriber::EnvFilter;

// === users module ===

struct UserRepository {
    deps: Resolver,
    next_id: AtomicU64,
}

#[async_trait]
impl Provider for UserRepository {
    fn construct(deps: Resolver) -> Self {
        Self {
            deps,
            next_id: AtomicU64::new(1),
        }
    }

    async fn on_init(&self) -> HookResult {
        let url: Arc<String> = self.deps.get("databaseUrl").ok_or("databaseUrl is not injected")?;
        tracing::info!(url = %url, "Connected to database");
        Ok(())
    }

    async fn shutdown(&self) -> HookResult {
        tracing::info!("Closing database connections");
        Ok(())
    }
}

impl UserRepository {
    fn create(&self, name: &str) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        tracing::info!(id, user = name, "User created");
        id
    }
}

struct UserService {
    deps: Resolver,
}

impl Provider for UserService {
    fn construct(deps: Resolver) -> Self {
        Self { deps }
    }
}

impl UserService {
    fn hello(&self, name: &str) -> String {
        let id = self
            .deps
            .get::<UserRepository>("userRepository")
            .map(|repo| repo.create(name))
            .unwrap_or_default();
        format!("Hello, {name} (#{id})")
    }
}

struct UserContainer;

// === main module ===

struct MainService {
    deps: Resolver,
}

#[async_trait]
impl Provider for MainService {
    fn construct(deps: Resolver) -> Self {
        Self { deps }
    }

    async fn on_init(&self) -> HookResult {
        tracing::info!("Main service starting");
        Ok(())
    }

    async fn shutdown(&self) -> HookResult {
        Err("main service was already stopped".into())
    }
}

impl MainService {
    fn greet(&self) -> Option<String> {
        let users: Arc<UserService> = self.deps.get("userService")?;
        Some(users.hello("ada"))
    }
}

struct AppContainer;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("khazna_container=info,app=info")),
        )
        .init();

    declare_provider::<UserRepository>()?;
    declare_provider::<UserService>()?;
    declare_provider::<MainService>()?;

    declare_container::<UserContainer>(
        ContainerParams::new()
            .provider::<UserRepository>()
            .provider::<UserService>()
            .value("databaseUrl", String::from("postgres://localhost/app")),
    )?;

    let app = declare_container::<AppContainer>(
        ContainerParams::new()
            .container::<UserContainer>()
            .provider::<MainService>(),
    )?;
    println!("{app:?}");

    register_container::<AppContainer>().await?;

    if let Some(main_service) = resolve_provider::<AppContainer, MainService>() {
        println!("{}", main_service.greet().unwrap_or_else(|| "nobody home".into()));
    }

    // The shutdown error of MainService is logged; teardown still completes.
    shutdown_container::<AppContainer>().await?;
    Ok(())
}
