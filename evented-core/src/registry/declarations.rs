use crate::error::{EventError, EventsResult};
use crate::name::EventName;
use crate::options::EventOptions;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

/// 宿主类型的事件声明表
///
/// - 同名事件以相同选项重复声明为空操作；
/// - 以不同选项重复声明返回 `EventError::Redefinition`，已有声明保持不变。
pub struct EventDeclarations {
    type_name: String,
    table: DashMap<EventName, EventOptions>,
}

impl EventDeclarations {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            table: DashMap::new(),
        }
    }

    /// 以类型名（去掉模块路径）作为宿主类型标识
    pub fn for_type<T: ?Sized>() -> Self {
        let full = std::any::type_name::<T>();
        let short = full.rsplit("::").next().unwrap_or(full);
        Self::new(short)
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// 声明事件，返回规范化后的事件名
    pub fn declare(
        &self,
        name: impl Into<EventName>,
        options: EventOptions,
    ) -> EventsResult<EventName> {
        let name = name.into();

        match self.table.entry(name.clone()) {
            Entry::Occupied(existing) => {
                if *existing.get() != options {
                    return Err(EventError::Redefinition {
                        event: name.to_string(),
                        options: options.to_string(),
                        declared: existing.get().to_string(),
                    }
                    .into());
                }
            }
            Entry::Vacant(slot) => {
                debug!(host_type = %self.type_name, event = %name, options = %options, "event declared");
                slot.insert(options);
            }
        }
        Ok(name)
    }

    pub fn options(&self, name: &str) -> Option<EventOptions> {
        self.table.get(name).map(|o| o.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table.contains_key(name)
    }

    /// 已声明的事件名（已排序）
    pub fn names(&self) -> Vec<EventName> {
        let mut names: Vec<EventName> = self.table.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

impl Default for EventDeclarations {
    fn default() -> Self {
        Self::new("host")
    }
}
