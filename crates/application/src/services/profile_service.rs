use std::sync::Arc;

use domain::{
    Destination, DomainError, NewUser, PasswordHash, TravelPlan, User, UserEmail, UserId,
};
use tokio::sync::OnceCell;
use validator::Validate;

use crate::{
    clock::Clock,
    credential::{CredentialService, Identity},
    dto::{
        total_pages, FieldUpdate, ListUsersQuery, LoginRequest, LoginResponse, RefreshRequest,
        RegisterRequest, TokenResponse, UpdateProfileRequest, UserPage, UserProfile,
        TOKEN_TYPE_BEARER,
    },
    error::ApplicationError,
    password::{PasswordHasher, PasswordHasherError},
    repository::UserRepository,
};

pub struct ProfileServiceDependencies {
    pub user_repository: Arc<dyn UserRepository>,
    pub password_hasher: Arc<dyn PasswordHasher>,
    pub credentials: Arc<CredentialService>,
    pub clock: Arc<dyn Clock>,
}

const DECOY_PASSWORD: &str = "travel-chat-decoy-password";

pub struct ProfileService {
    deps: ProfileServiceDependencies,
    decoy_hash: OnceCell<PasswordHash>,
}

impl ProfileService {
    pub fn new(deps: ProfileServiceDependencies) -> Self {
        Self {
            deps,
            decoy_hash: OnceCell::new(),
        }
    }

    /// 注册新用户，不签发令牌
    pub async fn register(&self, request: RegisterRequest) -> Result<UserProfile, ApplicationError> {
        request.validate()?;
        User::check_password_strength(&request.password)?;

        let now = self.deps.clock.now();
        let travel_plan = TravelPlan::validate(request.travel_start, request.travel_end, now)?;
        let destination = Destination::new(&request.country, &request.city)?;
        let email = UserEmail::parse(request.email)?;

        if self
            .deps
            .user_repository
            .find_by_email(email.clone())
            .await?
            .is_some()
        {
            return Err(ApplicationError::EmailAlreadyExists);
        }

        let password = self.deps.password_hasher.hash(&request.password).await?;

        let draft = NewUser {
            email,
            password,
            name: User::validate_name(&request.name)?,
            age: User::validate_age(request.age)?,
            gender: request.gender,
            profile_pic: request.profile_pic.unwrap_or_default(),
            country: destination.country().to_owned(),
            city: destination.city().to_owned(),
            travel_plan,
            bio: User::validate_bio(&request.bio)?,
            travel_purpose: request.travel_purpose,
            travel_budget: User::validate_budget(request.travel_budget)?,
            travel_style: request.travel_style,
            created_at: now,
        };

        // 并发注册时由存储层的唯一约束兜底
        let user = match self.deps.user_repository.create(draft).await {
            Ok(user) => user,
            Err(domain::RepositoryError::Conflict) => {
                return Err(ApplicationError::EmailAlreadyExists)
            }
            Err(err) => return Err(err.into()),
        };

        tracing::info!(user_id = %user.id, destination = %user.destination(), "user registered");
        Ok(UserProfile::from_user(&user, now))
    }

    /// 登录；邮箱不存在和密码错误返回同一种错误
    pub async fn login(&self, request: LoginRequest) -> Result<LoginResponse, ApplicationError> {
        let email =
            UserEmail::parse(request.email).map_err(|_| ApplicationError::InvalidCredentials)?;

        let Some(mut user) = self.deps.user_repository.find_by_email(email).await? else {
            self.verify_decoy(&request.password).await;
            tracing::debug!("login rejected: unknown email");
            return Err(ApplicationError::InvalidCredentials);
        };

        let password_ok = match self
            .deps
            .password_hasher
            .verify(&request.password, &user.password)
            .await
        {
            Ok(ok) => ok,
            Err(PasswordHasherError::Verify(reason)) => {
                tracing::warn!(user_id = %user.id, reason = %reason, "stored password hash unusable");
                false
            }
            Err(err) => return Err(err.into()),
        };
        if !password_ok {
            tracing::debug!(user_id = %user.id, "login rejected: password mismatch");
            return Err(ApplicationError::InvalidCredentials);
        }

        let now = self.deps.clock.now();
        self.deps
            .user_repository
            .touch_last_active(user.id, now)
            .await?;
        user.touch(now);

        let pair = self
            .deps
            .credentials
            .issue_pair(user.id, user.email.as_str())?;

        tracing::info!(user_id = %user.id, "user logged in");
        Ok(LoginResponse {
            user: UserProfile::from_user(&user, now),
            access_token: pair.access_token,
            refresh_token: pair.refresh_token,
            token_type: TOKEN_TYPE_BEARER,
            expires_in: pair.expires_in,
        })
    }

    pub async fn refresh_session(
        &self,
        request: RefreshRequest,
    ) -> Result<TokenResponse, ApplicationError> {
        let pair = self
            .deps
            .credentials
            .rotate(&request.refresh_token)
            .map_err(|_| ApplicationError::InvalidCredentials)?;
        Ok(pair.into())
    }

    pub async fn get_profile(&self, id: UserId) -> Result<UserProfile, ApplicationError> {
        let user = self.load(id).await?;
        Ok(UserProfile::from_user(&user, self.deps.clock.now()))
    }

    pub async fn get_me(&self, identity: &Identity) -> Result<UserProfile, ApplicationError> {
        self.get_profile(identity.user_id).await
    }

    /// 同时给出国家和城市时按目的地过滤，否则列出全部用户
    pub async fn list_users(&self, query: ListUsersQuery) -> Result<UserPage, ApplicationError> {
        let (page, limit) = query.normalized();
        // 超大页码饱和到末尾，得到空页
        let offset = (page - 1).saturating_mul(limit);
        let now = self.deps.clock.now();

        let filter = match (query.country.as_deref(), query.city.as_deref()) {
            (Some(country), Some(city)) if !country.is_empty() && !city.is_empty() => {
                Some(Destination::new(country, city)?)
            }
            _ => None,
        };

        let (users, total_count) = match filter {
            Some(destination) => {
                let all = self
                    .deps
                    .user_repository
                    .list_by_destination(destination)
                    .await?;
                let total = all.len() as i64;
                let page_users = all
                    .into_iter()
                    .skip(offset as usize)
                    .take(limit as usize)
                    .collect::<Vec<_>>();
                (page_users, total)
            }
            None => {
                let total = self.deps.user_repository.count().await?;
                let users = self.deps.user_repository.list(offset, limit).await?;
                (users, total)
            }
        };

        Ok(UserPage {
            users: users
                .iter()
                .map(|user| UserProfile::from_user(user, now))
                .collect(),
            page,
            limit,
            total_count,
            total_pages: total_pages(total_count, limit),
        })
    }

    pub async fn users_by_destination(
        &self,
        country: &str,
        city: &str,
    ) -> Result<Vec<UserProfile>, ApplicationError> {
        let destination = Destination::new(country, city)?;
        let now = self.deps.clock.now();
        let users = self
            .deps
            .user_repository
            .list_by_destination(destination)
            .await?;
        Ok(users
            .iter()
            .map(|user| UserProfile::from_user(user, now))
            .collect())
    }

    /// 只允许用户修改自己的资料；应用修改后重新校验出行日期
    pub async fn update_profile(
        &self,
        actor: UserId,
        id: UserId,
        patch: UpdateProfileRequest,
    ) -> Result<UserProfile, ApplicationError> {
        ensure_self(actor, id)?;
        let mut user = self.load(id).await?;
        let now = self.deps.clock.now();

        apply_patch(&mut user, patch)?;
        TravelPlan::validate(user.travel_start, user.travel_end, now)?;
        user.updated_at = now;

        let user = self.deps.user_repository.update(user).await?;
        tracing::info!(user_id = %user.id, "profile updated");
        Ok(UserProfile::from_user(&user, now))
    }

    pub async fn touch_last_active(
        &self,
        actor: UserId,
        id: UserId,
    ) -> Result<(), ApplicationError> {
        ensure_self(actor, id)?;
        let now = self.deps.clock.now();
        self.deps
            .user_repository
            .touch_last_active(id, now)
            .await
            .map_err(not_found_as("user"))
    }

    pub async fn delete_user(&self, actor: UserId, id: UserId) -> Result<(), ApplicationError> {
        ensure_self(actor, id)?;
        let now = self.deps.clock.now();
        self.deps
            .user_repository
            .delete(id, now)
            .await
            .map_err(not_found_as("user"))?;
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    /// 邮箱不存在时同样做一次哈希比较，两种失败耗时一致
    async fn verify_decoy(&self, plaintext: &str) {
        let decoy = self
            .decoy_hash
            .get_or_try_init(|| self.deps.password_hasher.hash(DECOY_PASSWORD))
            .await;
        match decoy {
            Ok(decoy) => {
                let _ = self.deps.password_hasher.verify(plaintext, decoy).await;
            }
            Err(err) => tracing::warn!(error = %err, "failed to prepare decoy password hash"),
        }
    }

    async fn load(&self, id: UserId) -> Result<User, ApplicationError> {
        self.deps
            .user_repository
            .find_by_id(id)
            .await?
            .ok_or(ApplicationError::NotFound("user"))
    }
}

fn ensure_self(actor: UserId, target: UserId) -> Result<(), ApplicationError> {
    if actor != target {
        tracing::debug!(actor = %actor, target = %target, "cross-user modification denied");
        return Err(ApplicationError::Forbidden);
    }
    Ok(())
}

fn not_found_as(
    entity: &'static str,
) -> impl Fn(domain::RepositoryError) -> ApplicationError {
    move |err| match err {
        domain::RepositoryError::NotFound => ApplicationError::NotFound(entity),
        other => ApplicationError::Storage(other),
    }
}

fn required<T>(field: &str, update: FieldUpdate<T>) -> Result<Option<T>, DomainError> {
    match update {
        FieldUpdate::Unchanged => Ok(None),
        FieldUpdate::Set(value) => Ok(Some(value)),
        FieldUpdate::Clear => Err(DomainError::invalid_argument(field, "cannot be cleared")),
    }
}

fn apply_patch(user: &mut User, patch: UpdateProfileRequest) -> Result<(), DomainError> {
    if let Some(name) = required("name", patch.name)? {
        user.name = User::validate_name(&name)?;
    }
    if let Some(age) = required("age", patch.age)? {
        user.age = User::validate_age(age)?;
    }
    if let Some(gender) = required("gender", patch.gender)? {
        user.gender = gender;
    }
    match patch.profile_pic {
        FieldUpdate::Unchanged => {}
        FieldUpdate::Set(pic) => user.profile_pic = pic,
        FieldUpdate::Clear => user.profile_pic.clear(),
    }
    if let Some(country) = required("country", patch.country)? {
        user.country = User::validate_place("country", &country)?;
    }
    if let Some(city) = required("city", patch.city)? {
        user.city = User::validate_place("city", &city)?;
    }
    if let Some(start) = required("travel_start", patch.travel_start)? {
        user.travel_start = start;
    }
    if let Some(end) = required("travel_end", patch.travel_end)? {
        user.travel_end = end;
    }
    match patch.bio {
        FieldUpdate::Unchanged => {}
        FieldUpdate::Set(bio) => user.bio = User::validate_bio(&bio)?,
        FieldUpdate::Clear => user.bio.clear(),
    }
    if let Some(purpose) = required("travel_purpose", patch.travel_purpose)? {
        user.travel_purpose = purpose;
    }
    if let Some(budget) = required("travel_budget", patch.travel_budget)? {
        user.travel_budget = User::validate_budget(budget)?;
    }
    if let Some(style) = required("travel_style", patch.travel_style)? {
        user.travel_style = style;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::credential::CredentialSettings;
    use crate::password::MockPasswordHasher;
    use crate::repository::MockUserRepository;
    use chrono::{Duration, Utc};
    use domain::{Gender, NewUser, PasswordHash, RepositoryError, TravelPurpose, TravelStyle};

    fn credentials() -> Arc<CredentialService> {
        Arc::new(CredentialService::new(
            CredentialSettings {
                secret: "unit-test-secret-that-is-long-enough-ok".to_string(),
                issuer: "travel-chat".to_string(),
                access_ttl: Duration::hours(24),
                refresh_ttl: Duration::days(7),
            },
            Arc::new(SystemClock),
        ))
    }

    fn stored_user() -> User {
        let now = Utc::now();
        NewUser {
            email: UserEmail::parse("mina@example.com").unwrap(),
            password: PasswordHash::new("$2b$04$stored").unwrap(),
            name: "Mina".to_string(),
            age: 30,
            gender: Gender::Female,
            profile_pic: String::new(),
            country: "Japan".to_string(),
            city: "Tokyo".to_string(),
            travel_plan: TravelPlan::validate(now, now + Duration::days(3), now).unwrap(),
            bio: String::new(),
            travel_purpose: TravelPurpose::Culture,
            travel_budget: 0,
            travel_style: TravelStyle::Planned,
            created_at: now,
        }
        .into_user(UserId(1))
    }

    fn service(users: MockUserRepository, hasher: MockPasswordHasher) -> ProfileService {
        ProfileService::new(ProfileServiceDependencies {
            user_repository: Arc::new(users),
            password_hasher: Arc::new(hasher),
            credentials: credentials(),
            clock: Arc::new(SystemClock),
        })
    }

    fn login_request() -> LoginRequest {
        LoginRequest {
            email: "mina@example.com".to_string(),
            password: "secret-pass".to_string(),
        }
    }

    #[tokio::test]
    async fn login_storage_failure_is_not_masked() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Err(RepositoryError::Timeout));
        let err = service(users, MockPasswordHasher::new())
            .login(login_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::Storage(RepositoryError::Timeout)));
    }

    #[tokio::test]
    async fn unusable_stored_hash_reads_as_bad_credentials() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(stored_user())));
        users.expect_touch_last_active().never();
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_verify()
            .returning(|_, _| Err(PasswordHasherError::verify_error("invalid hash")));

        let err = service(users, hasher).login(login_request()).await.unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidCredentials));
    }

    #[tokio::test]
    async fn malformed_email_reads_as_bad_credentials() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().never();
        let err = service(users, MockPasswordHasher::new())
            .login(LoginRequest {
                email: "not-an-email".to_string(),
                password: "x".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ApplicationError::InvalidCredentials));
    }

    #[tokio::test]
    async fn successful_login_touches_last_active() {
        let mut users = MockUserRepository::new();
        users
            .expect_find_by_email()
            .returning(|_| Ok(Some(stored_user())));
        users
            .expect_touch_last_active()
            .times(1)
            .returning(|_, _| Ok(()));
        let mut hasher = MockPasswordHasher::new();
        hasher.expect_verify().returning(|_, _| Ok(true));

        let response = service(users, hasher).login(login_request()).await.unwrap();
        assert_eq!(response.user.id, UserId(1));
        assert!(!response.access_token.is_empty());
    }

    #[tokio::test]
    async fn unknown_email_still_runs_one_verify() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_email().times(2).returning(|_| Ok(None));
        let mut hasher = MockPasswordHasher::new();
        hasher
            .expect_hash()
            .times(1)
            .returning(|_| Ok(PasswordHash::new("$2b$04$decoy").unwrap()));
        hasher.expect_verify().times(2).returning(|_, _| Ok(false));

        let service = service(users, hasher);
        for _ in 0..2 {
            let err = service.login(login_request()).await.unwrap_err();
            assert!(matches!(err, ApplicationError::InvalidCredentials));
        }
    }

    #[tokio::test]
    async fn huge_page_number_yields_an_empty_page() {
        let mut users = MockUserRepository::new();
        users.expect_count().returning(|| Ok(3));
        users
            .expect_list()
            .withf(|offset, limit| *offset == i64::MAX && *limit == 10)
            .returning(|_, _| Ok(Vec::new()));

        let page = service(users, MockPasswordHasher::new())
            .list_users(ListUsersQuery {
                page: Some(i64::MAX),
                limit: Some(10),
                ..Default::default()
            })
            .await
            .unwrap();
        assert!(page.users.is_empty());
        assert_eq!(page.page, i64::MAX);
        assert_eq!(page.total_count, 3);
    }
}
