//! 目的地键
//!
//! 把自由输入的 (国家, 城市) 规范化为唯一的查找键 `"<国家>-<城市>"`，并能反向解析。
//! 国家或城市本身包含分隔符时无法无损往返，解析会拒绝这类键而不是猜测拆分位置。

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// 国家与城市之间的分隔符
pub const DESTINATION_DELIMITER: char = '-';

/// 目的地查找键。空键表示"未设置"，永远不是合法目的地。
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DestinationKey(String);

impl DestinationKey {
    pub fn empty() -> Self {
        Self(String::new())
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// 拆回 (国家, 城市)；空键或格式不符时返回 `None`
    pub fn split(&self) -> Option<(String, String)> {
        parse_destination(&self.0)
    }
}

impl fmt::Display for DestinationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 生成目的地键；任一字段去空白后为空时返回空键
pub fn format_destination(country: &str, city: &str) -> DestinationKey {
    let (country, city) = normalize_destination(country, city);
    if country.is_empty() || city.is_empty() {
        return DestinationKey::empty();
    }
    DestinationKey(format!("{country}{DESTINATION_DELIMITER}{city}"))
}

/// 解析目的地键，必须恰好拆成两段非空字段
pub fn parse_destination(key: &str) -> Option<(String, String)> {
    if key.is_empty() {
        return None;
    }
    let parts: Vec<&str> = key.split(DESTINATION_DELIMITER).collect();
    let [country, city] = parts.as_slice() else {
        return None;
    };
    let (country, city) = normalize_destination(country, city);
    if country.is_empty() || city.is_empty() {
        return None;
    }
    Some((country.to_owned(), city.to_owned()))
}

pub fn validate_destination(country: &str, city: &str) -> bool {
    !country.trim().is_empty() && !city.trim().is_empty()
}

pub fn normalize_destination<'a>(country: &'a str, city: &'a str) -> (&'a str, &'a str) {
    (country.trim(), city.trim())
}

/// 已校验的目的地，国家和城市均已去除首尾空白且非空
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Destination {
    country: String,
    city: String,
}

impl Destination {
    pub fn new(country: &str, city: &str) -> Result<Self, DomainError> {
        if !validate_destination(country, city) {
            return Err(DomainError::InvalidDestination);
        }
        let (country, city) = normalize_destination(country, city);
        Ok(Self {
            country: country.to_owned(),
            city: city.to_owned(),
        })
    }

    pub fn country(&self) -> &str {
        &self.country
    }

    pub fn city(&self) -> &str {
        &self.city
    }

    pub fn key(&self) -> DestinationKey {
        format_destination(&self.country, &self.city)
    }
}
