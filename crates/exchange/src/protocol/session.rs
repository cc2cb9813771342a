//! Login sessions shared between exchanges.

use std::sync::Arc;
use std::time::SystemTime;

use arc_swap::ArcSwapOption;

/// A session outlives the requests that use it, so requests hold it behind
/// an `Arc`. The user name is swapped atomically, any request can update it
/// through a shared reference.
#[derive(Debug)]
pub struct Session {
    id: String,
    created: SystemTime,
    user: ArcSwapOption<String>,
}

impl Session {
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self { id: id.into(), created: SystemTime::now(), user: ArcSwapOption::empty() }
    }

    pub fn shared<S: Into<String>>(id: S) -> Arc<Self> {
        Arc::new(Self::new(id))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn created(&self) -> SystemTime {
        self.created
    }

    pub fn has_user(&self) -> bool {
        self.user.load().as_ref().is_some_and(|user| !user.is_empty())
    }

    pub fn user(&self) -> Option<Arc<String>> {
        self.user.load_full()
    }

    pub fn set_user<S: Into<String>>(&self, user: S) {
        self.user.store(Some(Arc::new(user.into())));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_is_shared_across_handles() {
        let session = Session::shared("s1");
        let other = Arc::clone(&session);
        assert!(!session.has_user());

        other.set_user("alice");
        assert!(session.has_user());
        assert_eq!(session.user().as_deref().map(String::as_str), Some("alice"));
        assert_eq!(session.id(), "s1");
    }
}
