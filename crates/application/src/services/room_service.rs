use std::sync::Arc;

use domain::{
    ChatRoom, Destination, DestinationKey, DomainError, NewChatRoom, RepositoryError, RoomId,
    UserId,
};

use crate::{
    clock::Clock,
    error::ApplicationError,
    repository::{ChatRoomRepository, UserRepository},
};

pub struct RoomServiceDependencies {
    pub room_repository: Arc<dyn ChatRoomRepository>,
    pub user_repository: Arc<dyn UserRepository>,
    pub clock: Arc<dyn Clock>,
}

/// 目的地公共聊天室的解析与私聊室的创建
pub struct RoomService {
    deps: RoomServiceDependencies,
}

impl RoomService {
    pub fn new(deps: RoomServiceDependencies) -> Self {
        Self { deps }
    }

    /// 返回目的地的公共聊天室，不存在时创建。
    ///
    /// 并发首次访问时只有一个插入能成功，其余调用方收到 `Conflict` 后重新查询，
    /// 所有调用方得到同一个聊天室。
    pub async fn get_or_create_public_room(
        &self,
        country: &str,
        city: &str,
    ) -> Result<ChatRoom, ApplicationError> {
        let destination = Destination::new(country, city)?;

        if let Some(room) = self
            .deps
            .room_repository
            .find_public(destination.clone())
            .await?
        {
            return Ok(room);
        }

        let draft = NewChatRoom::public(&destination, self.deps.clock.now());
        match self.deps.room_repository.create(draft).await {
            Ok(room) => {
                tracing::info!(room_id = %room.id, destination = %destination.key(), "public room created");
                Ok(room)
            }
            Err(RepositoryError::Conflict) => {
                tracing::debug!(destination = %destination.key(), "lost public room creation race, refetching");
                self.deps
                    .room_repository
                    .find_public(destination)
                    .await?
                    .ok_or(ApplicationError::Storage(RepositoryError::Conflict))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// 总是新建私聊室，同一对用户可以有多个
    pub async fn create_private_room(
        &self,
        country: &str,
        city: &str,
        first_name: &str,
        second_name: &str,
    ) -> Result<ChatRoom, ApplicationError> {
        let destination = Destination::new(country, city)?;
        let draft = NewChatRoom::private(&destination, first_name, second_name, self.deps.clock.now());
        let room = self.deps.room_repository.create(draft).await?;
        tracing::info!(room_id = %room.id, name = %room.name, "private room created");
        Ok(room)
    }

    /// 以发起者的目的地为两名旅行者创建私聊室
    pub async fn pair_travelers(
        &self,
        initiator: UserId,
        peer: UserId,
    ) -> Result<ChatRoom, ApplicationError> {
        if initiator == peer {
            return Err(DomainError::invalid_argument("peer_id", "cannot pair with yourself").into());
        }
        let first = self
            .deps
            .user_repository
            .find_by_id(initiator)
            .await?
            .ok_or(ApplicationError::NotFound("user"))?;
        let second = self
            .deps
            .user_repository
            .find_by_id(peer)
            .await?
            .ok_or(ApplicationError::NotFound("user"))?;

        self.create_private_room(&first.country, &first.city, &first.name, &second.name)
            .await
    }

    pub async fn find_room(&self, id: RoomId) -> Result<ChatRoom, ApplicationError> {
        self.deps
            .room_repository
            .find_by_id(id)
            .await?
            .ok_or(ApplicationError::NotFound("room"))
    }

    pub fn room_key(room: &ChatRoom) -> DestinationKey {
        room.room_key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::memory::InMemoryUserRepository;
    use crate::repository::MockChatRoomRepository;
    use chrono::Utc;
    use domain::RoomType;

    fn paris_room(id: i64) -> ChatRoom {
        let paris = Destination::new("France", "Paris").unwrap();
        NewChatRoom::public(&paris, Utc::now()).into_room(RoomId(id))
    }

    fn service(rooms: MockChatRoomRepository) -> RoomService {
        RoomService::new(RoomServiceDependencies {
            room_repository: Arc::new(rooms),
            user_repository: Arc::new(InMemoryUserRepository::new()),
            clock: Arc::new(SystemClock),
        })
    }

    #[tokio::test]
    async fn existing_public_room_is_returned_without_insert() {
        let mut rooms = MockChatRoomRepository::new();
        rooms
            .expect_find_public()
            .times(1)
            .returning(|_| Ok(Some(paris_room(5))));
        rooms.expect_create().never();

        let room = service(rooms)
            .get_or_create_public_room("France", "Paris")
            .await
            .unwrap();
        assert_eq!(room.id, RoomId(5));
    }

    #[tokio::test]
    async fn conflict_on_insert_falls_back_to_lookup() {
        let mut rooms = MockChatRoomRepository::new();
        let mut lookups = 0;
        rooms.expect_find_public().times(2).returning(move |_| {
            lookups += 1;
            if lookups == 1 {
                Ok(None)
            } else {
                Ok(Some(paris_room(11)))
            }
        });
        rooms
            .expect_create()
            .times(1)
            .returning(|_| Err(RepositoryError::Conflict));

        let room = service(rooms)
            .get_or_create_public_room(" France ", "Paris")
            .await
            .unwrap();
        assert_eq!(room.id, RoomId(11));
        assert_eq!(room.room_type, RoomType::Public);
    }

    #[tokio::test]
    async fn storage_errors_propagate_unchanged() {
        let mut rooms = MockChatRoomRepository::new();
        rooms.expect_find_public().returning(|_| Ok(None));
        rooms
            .expect_create()
            .returning(|_| Err(RepositoryError::Timeout));

        let err = service(rooms)
            .get_or_create_public_room("France", "Paris")
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Storage(RepositoryError::Timeout)));
    }

    #[tokio::test]
    async fn blank_destination_is_rejected() {
        let mut rooms = MockChatRoomRepository::new();
        rooms.expect_find_public().never();
        let err = service(rooms)
            .get_or_create_public_room("", "Paris")
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ApplicationError::Validation(DomainError::InvalidDestination)
        ));
    }
}
