use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::destination::{format_destination, DestinationKey};
use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{PasswordHash, Timestamp, UserEmail, UserId};
use crate::wire::wire_enum;

/// 密码最小长度
pub const MIN_PASSWORD_LENGTH: usize = 6;

const MIN_NAME_LENGTH: usize = 2;
const MAX_BIO_LENGTH: usize = 500;
const MIN_AGE: i32 = 18;
const MAX_AGE: i32 = 100;

wire_enum! {
    /// 性别
    pub enum Gender: "gender" {
        Male => "male",
        Female => "female",
        Other => "other",
    }
}

wire_enum! {
    /// 出行目的
    pub enum TravelPurpose: "travel_purpose" {
        Tourism => "tourism",
        Business => "business",
        Backpacking => "backpacking",
        FoodTour => "food_tour",
        Culture => "culture",
        Activity => "activity",
        Relaxation => "relaxation",
    }
}

wire_enum! {
    /// 出行风格
    pub enum TravelStyle: "travel_style" {
        Planned => "planned",
        Spontaneous => "spontaneous",
        Luxury => "luxury",
        Budget => "budget",
        Adventure => "adventure",
        Leisurely => "leisurely",
    }
}

wire_enum! {
    /// 根据最后活跃时间推导出的活跃状态
    pub enum ActivityStatus: "activity_status" {
        /// 10 分钟内
        Online => "online",
        /// 1 小时内
        ActiveRecently => "active_recently",
        /// 24 小时内
        ActiveToday => "active_today",
        /// 7 天内
        ActiveThisWeek => "active_this_week",
        Inactive => "inactive",
    }
}

impl ActivityStatus {
    pub fn since(last_active: Timestamp, now: Timestamp) -> Self {
        let idle = now - last_active;
        if idle < Duration::minutes(10) {
            Self::Online
        } else if idle < Duration::hours(1) {
            Self::ActiveRecently
        } else if idle < Duration::hours(24) {
            Self::ActiveToday
        } else if idle < Duration::days(7) {
            Self::ActiveThisWeek
        } else {
            Self::Inactive
        }
    }
}

/// 出行计划日期
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TravelPlan {
    pub start: Timestamp,
    pub end: Timestamp,
}

impl TravelPlan {
    /// 开始日期不能早于今天零点（UTC），且必须早于结束日期
    pub fn validate(start: Timestamp, end: Timestamp, now: Timestamp) -> DomainResult<Self> {
        let today = now.date_naive().and_time(NaiveTime::MIN).and_utc();
        if start < today {
            return Err(DomainError::PastTravelDate);
        }
        if start >= end {
            return Err(DomainError::InvalidTravelDates);
        }
        Ok(Self { start, end })
    }
}

/// 已持久化的用户
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    pub id: UserId,
    pub email: UserEmail,
    pub password: PasswordHash,
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub profile_pic: String,
    pub country: String,
    pub city: String,
    pub travel_start: Timestamp,
    pub travel_end: Timestamp,
    pub bio: String,
    pub travel_purpose: TravelPurpose,
    pub travel_budget: i32,
    pub travel_style: TravelStyle,
    pub last_active: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl User {
    /// 公共聊天室查找键
    pub fn destination(&self) -> DestinationKey {
        format_destination(&self.country, &self.city)
    }

    pub fn activity_status(&self, now: Timestamp) -> ActivityStatus {
        ActivityStatus::since(self.last_active, now)
    }

    pub fn touch(&mut self, now: Timestamp) {
        self.last_active = now;
        self.updated_at = now;
    }

    pub fn check_password_strength(password: &str) -> DomainResult<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(DomainError::WeakPassword {
                min_length: MIN_PASSWORD_LENGTH,
            });
        }
        Ok(())
    }

    pub fn validate_name(name: &str) -> DomainResult<String> {
        let trimmed = name.trim();
        if trimmed.chars().count() < MIN_NAME_LENGTH {
            return Err(DomainError::invalid_argument(
                "name",
                format!("must be at least {MIN_NAME_LENGTH} characters"),
            ));
        }
        Ok(trimmed.to_owned())
    }

    pub fn validate_age(age: i32) -> DomainResult<i32> {
        if !(MIN_AGE..=MAX_AGE).contains(&age) {
            return Err(DomainError::invalid_argument(
                "age",
                format!("must be between {MIN_AGE} and {MAX_AGE}"),
            ));
        }
        Ok(age)
    }

    pub fn validate_bio(bio: &str) -> DomainResult<String> {
        if bio.chars().count() > MAX_BIO_LENGTH {
            return Err(DomainError::invalid_argument(
                "bio",
                format!("must be at most {MAX_BIO_LENGTH} characters"),
            ));
        }
        Ok(bio.to_owned())
    }

    pub fn validate_budget(budget: i32) -> DomainResult<i32> {
        if budget < 0 {
            return Err(DomainError::invalid_argument("travel_budget", "cannot be negative"));
        }
        Ok(budget)
    }

    pub fn validate_place(field: &str, value: &str) -> DomainResult<String> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(DomainError::invalid_argument(field, "cannot be empty"));
        }
        Ok(trimmed.to_owned())
    }
}

/// 待插入的用户记录，id 由存储层分配
#[derive(Debug, Clone, PartialEq)]
pub struct NewUser {
    pub email: UserEmail,
    pub password: PasswordHash,
    pub name: String,
    pub age: i32,
    pub gender: Gender,
    pub profile_pic: String,
    pub country: String,
    pub city: String,
    pub travel_plan: TravelPlan,
    pub bio: String,
    pub travel_purpose: TravelPurpose,
    pub travel_budget: i32,
    pub travel_style: TravelStyle,
    pub created_at: Timestamp,
}

impl NewUser {
    /// 赋予存储层分配的 id，生成完整实体
    pub fn into_user(self, id: UserId) -> User {
        User {
            id,
            email: self.email,
            password: self.password,
            name: self.name,
            age: self.age,
            gender: self.gender,
            profile_pic: self.profile_pic,
            country: self.country,
            city: self.city,
            travel_start: self.travel_plan.start,
            travel_end: self.travel_plan.end,
            bio: self.bio,
            travel_purpose: self.travel_purpose,
            travel_budget: self.travel_budget,
            travel_style: self.travel_style,
            last_active: self.created_at,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}
