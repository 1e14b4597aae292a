//! 用户内存存储
//!
//! 每个 worker 进程持有一个独立的 `UserStore`，进程之间不共享任何数据。
//! 锁只在同步方法内部持有，不会跨越 `.await`。

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use uuid::Uuid;

use super::model::User;

#[derive(Debug, Default)]
pub struct UserStore {
    users: Mutex<HashMap<Uuid, User>>,
}

impl UserStore {
    pub fn new() -> Self {
        Self::default()
    }

    // 持锁期间不会 panic，中毒时直接取回内部数据
    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, User>> {
        self.users.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn list(&self) -> Vec<User> {
        self.lock().values().cloned().collect()
    }

    pub fn get(&self, id: &Uuid) -> Option<User> {
        self.lock().get(id).cloned()
    }

    pub fn contains(&self, id: &Uuid) -> bool {
        self.lock().contains_key(id)
    }

    /// 插入或覆盖
    pub fn put(&self, id: Uuid, user: User) {
        self.lock().insert(id, user);
    }

    /// 删除成功返回 true
    pub fn delete(&self, id: &Uuid) -> bool {
        self.lock().remove(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: Uuid, name: &str) -> User {
        User {
            id,
            username: name.to_string(),
            age: 20.into(),
            hobbies: vec!["chess".to_string()],
        }
    }

    #[test]
    fn test_put_get_delete() {
        let store = UserStore::new();
        assert!(store.list().is_empty());

        let id = Uuid::new_v4();
        store.put(id, sample(id, "alice"));
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get(&id).unwrap().username, "alice");

        // 覆盖
        store.put(id, sample(id, "bob"));
        assert_eq!(store.list().len(), 1);
        assert_eq!(store.get(&id).unwrap().username, "bob");

        assert!(store.delete(&id));
        assert!(!store.delete(&id));
        assert!(store.get(&id).is_none());
        assert!(!store.contains(&id));
    }

    #[test]
    fn test_stores_are_isolated() {
        let a = UserStore::new();
        let b = UserStore::new();

        let id = Uuid::new_v4();
        a.put(id, sample(id, "alice"));

        assert!(a.contains(&id));
        assert!(!b.contains(&id));
    }
}
