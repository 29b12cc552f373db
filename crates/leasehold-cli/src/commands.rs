//! Command implementations
//!
//! Each command opens its own connection, runs one ledger operation, and
//! prints its result to stdout.

use std::sync::Arc;

use anyhow::Context as _;
use sea_orm::DatabaseConnection;
use serde_json::json;

use leasehold_common::LockSettings;
use leasehold_core::{
    FanoutEventSink, LockHandle, LockService, MetricsEventSink, TracingEventSink,
    TransactionalLockService,
};
use leasehold_persistence::{connect, create_ledger_table, store_now};

/// How a command ended, mapped to the process exit code by `main`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Done,
    Contended,
}

/// Connection and service shared by the commands of one invocation
pub struct Context {
    settings: LockSettings,
    db: DatabaseConnection,
    service: Arc<dyn LockService>,
}

impl Context {
    pub async fn open(settings: LockSettings) -> anyhow::Result<Self> {
        let db = connect(&settings.db)
            .await
            .with_context(|| format!("failed to connect to {}", settings.db.url))?;

        let events = FanoutEventSink::default()
            .with(Arc::new(TracingEventSink))
            .with(Arc::new(MetricsEventSink));
        tracing::debug!(url = %settings.db.url, identity = %settings.identity(), "Lock ledger opened");

        let service: Arc<dyn LockService> = Arc::new(TransactionalLockService::from_connection(
            db.clone(),
            settings.db.isolation,
            Arc::new(events),
        ));

        Ok(Self {
            settings,
            db,
            service,
        })
    }

    fn handle(&self, name: &str) -> anyhow::Result<LockHandle> {
        let handle = LockHandle::new(name, self.settings.identity(), self.settings.lock.lease)?;
        Ok(handle)
    }
}

pub async fn init(ctx: &Context) -> anyhow::Result<Outcome> {
    create_ledger_table(&ctx.db)
        .await
        .context("failed to create the lock ledger table")?;
    println!("lock ledger ready");
    Ok(Outcome::Done)
}

pub async fn acquire(ctx: &Context, name: &str) -> anyhow::Result<Outcome> {
    let handle = ctx.handle(name)?;

    if ctx.service.acquire(&handle).await? {
        println!("acquired {} as {}", name, handle.identity());
        return Ok(Outcome::Done);
    }

    match ctx.service.owner(name).await? {
        Some(owner) => println!("{} is held by {}", name, owner),
        None => println!("{} is held by another owner", name),
    }
    Ok(Outcome::Contended)
}

pub async fn release(ctx: &Context, name: &str) -> anyhow::Result<Outcome> {
    let handle = ctx.handle(name)?;
    ctx.service.release(&handle).await?;
    println!("released {}", name);
    Ok(Outcome::Done)
}

pub async fn owner(ctx: &Context, name: &str) -> anyhow::Result<Outcome> {
    match ctx.service.owner(name).await? {
        Some(owner) => println!("{}", owner),
        None => println!("-"),
    }
    Ok(Outcome::Done)
}

pub async fn status(ctx: &Context, name: &str) -> anyhow::Result<Outcome> {
    let now = store_now(&ctx.db).await?;

    let status = match ctx.service.entry(name).await? {
        Some(entry) => json!({
            "name": entry.name,
            "owner": entry.owner,
            "expires_at": entry.expires_at,
            "state": entry.state_at(now),
            "remaining_ms": entry.remaining_at(now).map(|d| d.as_millis() as u64),
            "store_now": now,
        }),
        None => json!({
            "name": name,
            "owner": null,
            "expires_at": null,
            "state": leasehold_core::LockState::Unlocked,
            "remaining_ms": null,
            "store_now": now,
        }),
    };

    println!("{}", serde_json::to_string_pretty(&status)?);
    Ok(Outcome::Done)
}
