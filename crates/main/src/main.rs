//! 主应用程序入口
//!
//! 加载配置，连接数据库并执行迁移，启动 REST 与 RPC 两个监听器以及过期消息清理任务。

use std::{sync::Arc, time::Duration};

use anyhow::Context;
use application::{
    Clock, CredentialService, CredentialSettings, ExpiredMessageSweeper, MessageService,
    MessageServiceDependencies, PasswordHasher, ProfileService, ProfileServiceDependencies,
    RoomService, RoomServiceDependencies, SystemClock,
};
use config::AppConfig;
use infrastructure::{create_pg_pool, BcryptPasswordHasher, PgStorage, MIGRATOR};
use tokio::{net::TcpListener, signal, sync::watch};
use tracing_subscriber::EnvFilter;
use web_api::{router, rpc_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("failed to load configuration")?;

    // RUST_LOG 优先于配置文件中的过滤规则
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log.filter))
        .context("invalid log filter")?;
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        database = %config.database.url.rsplit('@').next().unwrap_or("unknown"),
        "connecting to database"
    );
    let pool = create_pg_pool(&config.database)
        .await
        .context("failed to connect to database")?;
    MIGRATOR
        .run(&pool)
        .await
        .context("failed to run migrations")?;

    let storage = PgStorage::new(pool);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(
        BcryptPasswordHasher::new(config.server.bcrypt_cost).context("invalid bcrypt cost")?,
    );
    let credentials = Arc::new(CredentialService::new(
        CredentialSettings::from_config(&config.jwt),
        clock.clone(),
    ));

    let profiles = Arc::new(ProfileService::new(ProfileServiceDependencies {
        user_repository: storage.user_repository.clone(),
        password_hasher,
        credentials: credentials.clone(),
        clock: clock.clone(),
    }));
    let rooms = Arc::new(RoomService::new(RoomServiceDependencies {
        room_repository: storage.room_repository.clone(),
        user_repository: storage.user_repository.clone(),
        clock: clock.clone(),
    }));
    let messages = Arc::new(MessageService::new(MessageServiceDependencies {
        message_repository: storage.message_repository.clone(),
        room_repository: storage.room_repository.clone(),
        clock,
    }));

    let sweeper = ExpiredMessageSweeper::new(
        messages.clone(),
        Duration::from_secs(config.messages.purge_interval_secs),
    );
    sweeper.start().await;

    let state = AppState::new(
        profiles,
        rooms,
        messages,
        credentials,
        Duration::from_secs(config.server.request_timeout_secs),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        wait_for_signal().await;
        let _ = shutdown_tx.send(true);
    });

    let http_listener = TcpListener::bind(config.http_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.http_addr()))?;
    let rpc_listener = TcpListener::bind(config.rpc_addr())
        .await
        .with_context(|| format!("failed to bind {}", config.rpc_addr()))?;
    tracing::info!(http = %config.http_addr(), rpc = %config.rpc_addr(), "travel-chat listening");

    let http = axum::serve(http_listener, router(state.clone()))
        .with_graceful_shutdown(shutdown_requested(shutdown_rx.clone()));
    let rpc = axum::serve(rpc_listener, rpc_router(state))
        .with_graceful_shutdown(shutdown_requested(shutdown_rx));

    let served = tokio::try_join!(
        async { http.await.context("http server failed") },
        async { rpc.await.context("rpc server failed") },
    );

    sweeper.stop().await;
    served?;
    tracing::info!("travel-chat stopped");
    Ok(())
}

async fn shutdown_requested(mut rx: watch::Receiver<bool>) {
    // 发送端被丢弃同样视为停机
    let _ = rx.wait_for(|stop| *stop).await;
}

async fn wait_for_signal() {
    #[cfg(unix)]
    {
        let mut sig_term = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(sig_term) => sig_term,
            Err(err) => {
                tracing::warn!(error = %err, "failed to install SIGTERM handler");
                if let Err(err) = signal::ctrl_c().await {
                    tracing::error!(error = %err, "failed to listen for ctrl-c");
                }
                return;
            }
        };
        tokio::select! {
            _ = signal::ctrl_c() => tracing::info!("received ctrl-c, shutting down"),
            _ = sig_term.recv() => tracing::info!("received SIGTERM, shutting down"),
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for ctrl-c");
        }
        tracing::info!("received ctrl-c, shutting down");
    }
}
