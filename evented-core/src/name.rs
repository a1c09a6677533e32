//! 名称值对象
//!
//! 事件名与订阅者名都是“符号式”标识：创建后不可变、以值相等为准。
//! 两者均可由 `&str`/`String` 直接转换，便于在 API 中传入字面量。
//!
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use uuid::Uuid;

/// 事件名
///
/// # 示例
///
/// ```
/// use evented_core::name::EventName;
///
/// let name = EventName::from("Bar");
/// assert_eq!(name.as_str(), "Bar");
/// assert_eq!(name, EventName::from(String::from("Bar")));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EventName(String);

impl EventName {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// 订阅者名（在同一事件内唯一）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriberName(String);

impl SubscriberName {
    /// 以可读前缀加随机 UUID 生成唯一名称，形如 `subscriber-6f1c...`
    ///
    /// ```
    /// use evented_core::name::SubscriberName;
    ///
    /// let a = SubscriberName::generate("audit");
    /// let b = SubscriberName::generate("audit");
    /// assert!(a.as_str().starts_with("audit-"));
    /// assert_ne!(a, b);
    /// ```
    pub fn generate(hint: &str) -> Self {
        let hint = if hint.is_empty() { "subscriber" } else { hint };
        Self(format!("{hint}-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! impl_name_conversions {
    ($ty:ident) => {
        impl From<&str> for $ty {
            fn from(value: &str) -> Self {
                Self(value.to_owned())
            }
        }

        impl From<String> for $ty {
            fn from(value: String) -> Self {
                Self(value)
            }
        }

        impl From<&$ty> for $ty {
            fn from(value: &$ty) -> Self {
                value.clone()
            }
        }

        impl Borrow<str> for $ty {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $ty {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl PartialEq<str> for $ty {
            fn eq(&self, other: &str) -> bool {
                self.0 == other
            }
        }

        impl PartialEq<&str> for $ty {
            fn eq(&self, other: &&str) -> bool {
                self.0 == *other
            }
        }
    };
}

impl_name_conversions!(EventName);
impl_name_conversions!(SubscriberName);
