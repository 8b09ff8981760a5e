//! 基于登录用户的访问控制
//!
//! `SecurityManager` 在当前线程上保存登录用户，
//! `SecurityInterceptor` 作为环绕通知在调用目标方法前检查该用户。

use crate::advice::MethodInterceptor;
use crate::error::Exception;
use crate::joinpoint::Invocation;
use crate::properties::AopProperties;
use crate::value::Value;
use std::cell::RefCell;
use std::collections::HashSet;

/// 登录用户
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    name: String,
    password: String,
}

impl User {
    pub fn new(name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            password: password.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

thread_local! {
    static LOGGED_ON_USER: RefCell<Option<User>> = const { RefCell::new(None) };
}

/// 线程级的登录状态
///
/// 不同线程之间互不可见
#[derive(Debug, Default, Clone, Copy)]
pub struct SecurityManager;

impl SecurityManager {
    pub fn new() -> Self {
        Self
    }

    pub fn login(&self, name: impl Into<String>, password: impl Into<String>) {
        let user = User::new(name, password);
        tracing::debug!("User '{}' logged on", user.name());
        LOGGED_ON_USER.with(|slot| *slot.borrow_mut() = Some(user));
    }

    pub fn logout(&self) {
        LOGGED_ON_USER.with(|slot| {
            if let Some(user) = slot.borrow_mut().take() {
                tracing::debug!("User '{}' logged off", user.name());
            }
        });
    }

    pub fn logged_on_user(&self) -> Option<User> {
        LOGGED_ON_USER.with(|slot| slot.borrow().clone())
    }
}

/// 访问控制环绕通知
///
/// 未登录或用户不在允许列表中时抛出 `SecurityDenied`（属于 `IllegalState`）
#[derive(Debug, Clone)]
pub struct SecurityInterceptor {
    security_manager: SecurityManager,
    allowed_users: HashSet<String>,
}

impl SecurityInterceptor {
    pub fn new<I, S>(allowed_users: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            security_manager: SecurityManager::new(),
            allowed_users: allowed_users.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_properties(properties: &AopProperties) -> Self {
        Self::new(properties.allowed_users.iter().cloned())
    }

    pub fn is_allowed(&self, name: &str) -> bool {
        self.allowed_users.contains(name)
    }
}

impl Default for SecurityInterceptor {
    fn default() -> Self {
        Self::from_properties(&AopProperties::default())
    }
}

impl MethodInterceptor for SecurityInterceptor {
    fn invoke(&self, invocation: &mut Invocation<'_>) -> Result<Value, Exception> {
        let Some(user) = self.security_manager.logged_on_user() else {
            tracing::info!("Rejected call to {}: not authenticated", invocation.method());
            return Err(Exception::security_denied("not authenticated"));
        };

        if self.is_allowed(user.name()) {
            tracing::info!("User '{}' authenticated for {}", user.name(), invocation.method());
            return invocation.proceed();
        }

        tracing::info!(
            "User '{}' has no access to {}",
            user.name(),
            invocation.method()
        );
        Err(Exception::security_denied(format!(
            "user '{}' has no access to {}",
            user.name(),
            invocation.method()
        )))
    }
}
