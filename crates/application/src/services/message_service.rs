use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use domain::{
    Message, MessageContent, MessageType, NewMessage, RoomId, Timestamp, UserId,
};
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;
use validator::Validate;

use crate::{
    clock::Clock,
    dto::PostMessageRequest,
    error::ApplicationError,
    repository::{ChatRoomRepository, MessageRepository},
};

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const MAX_MESSAGE_LIMIT: i64 = 100;

pub struct MessageServiceDependencies {
    pub message_repository: Arc<dyn MessageRepository>,
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 消息的创建、读取与过期清理
pub struct MessageService {
    deps: MessageServiceDependencies,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self { deps }
    }

    /// 按原样保存，过期时间必须已由调用方确定
    pub async fn create(&self, message: NewMessage) -> Result<Message, ApplicationError> {
        Ok(self.deps.message_repository.create(message).await?)
    }

    /// 发到聊天室，过期时间由聊天室类别决定
    pub async fn post_message(
        &self,
        author: UserId,
        room_id: RoomId,
        content: &str,
        message_type: MessageType,
    ) -> Result<Message, ApplicationError> {
        let content = MessageContent::new(content)?;
        let room = self
            .deps
            .room_repository
            .find_by_id(room_id)
            .await?
            .ok_or(ApplicationError::NotFound("room"))?;

        let draft = NewMessage::for_room(&room, author, content, message_type, self.deps.clock.now());
        let message = self.create(draft).await?;
        tracing::debug!(
            message_id = %message.id,
            room_id = %room.id,
            expires_at = ?message.expires_at,
            "message stored"
        );
        Ok(message)
    }

    /// 传输层入口：先校验请求结构，未指定类型时按文本处理
    pub async fn post_request(
        &self,
        author: UserId,
        room_id: RoomId,
        request: PostMessageRequest,
    ) -> Result<Message, ApplicationError> {
        request.validate()?;
        let message_type = request.message_type.unwrap_or(MessageType::Text);
        self.post_message(author, room_id, &request.content, message_type)
            .await
    }

    /// 最新的在前；已过期但尚未清理的消息仍会返回
    pub async fn list_messages(
        &self,
        room_id: RoomId,
        limit: Option<i64>,
    ) -> Result<Vec<Message>, ApplicationError> {
        let limit = limit
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
            .min(MAX_MESSAGE_LIMIT);
        if self.deps.room_repository.find_by_id(room_id).await?.is_none() {
            return Err(ApplicationError::NotFound("room"));
        }
        Ok(self
            .deps
            .message_repository
            .list_by_room(room_id, limit)
            .await?)
    }

    pub fn is_expired(message: &Message, now: Timestamp) -> bool {
        message.is_expired(now)
    }

    /// 软删除所有过期时间早于 `before` 的消息
    pub async fn purge_expired(&self, before: Timestamp) -> Result<u64, ApplicationError> {
        Ok(self.deps.message_repository.purge_expired(before).await?)
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.deps.clock
    }
}

/// 周期性清理过期消息的后台任务
pub struct ExpiredMessageSweeper {
    service: Arc<MessageService>,
    interval: Duration,
    shutdown_signal: Arc<AtomicBool>,
    wakeup: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl ExpiredMessageSweeper {
    pub fn new(service: Arc<MessageService>, interval: Duration) -> Self {
        Self {
            service,
            interval,
            shutdown_signal: Arc::new(AtomicBool::new(false)),
            wakeup: Arc::new(Notify::new()),
            handle: Mutex::new(None),
        }
    }

    /// 执行一轮清理，返回清理的条数
    pub async fn run_once(&self) -> Result<u64, ApplicationError> {
        Self::sweep(&self.service).await
    }

    pub async fn start(&self) {
        let mut handle = self.handle.lock().await;
        if handle.is_some() {
            return;
        }
        self.shutdown_signal.store(false, Ordering::SeqCst);

        let service = Arc::clone(&self.service);
        let shutdown_signal = Arc::clone(&self.shutdown_signal);
        let wakeup = Arc::clone(&self.wakeup);
        let period = self.interval;

        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            while !shutdown_signal.load(Ordering::SeqCst) {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = wakeup.notified() => continue,
                }
                // 单轮失败只记录，下一轮照常执行
                if let Err(err) = Self::sweep(&service).await {
                    tracing::error!(error = %err, "expired message sweep failed");
                }
            }

            tracing::info!("expired message sweeper stopped");
        }));

        tracing::info!(interval_secs = period.as_secs(), "expired message sweeper started");
    }

    pub async fn stop(&self) {
        self.shutdown_signal.store(true, Ordering::SeqCst);
        self.wakeup.notify_one();
        if let Some(handle) = self.handle.lock().await.take() {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "sweeper task ended abnormally");
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    async fn sweep(service: &MessageService) -> Result<u64, ApplicationError> {
        let now = service.clock().now();
        let purged = service.purge_expired(now).await?;
        if purged > 0 {
            tracing::info!(purged, "purged expired messages");
        }
        Ok(purged)
    }
}
