//! AOP 配置属性
//!
//! 从 `aspectra_core::Environment` 绑定 `aop.*` 配置键

use aspectra_core::{ApplicationError, ApplicationResult, Environment};

pub const PROXY_TARGET_CLASS: &str = "aop.proxy-target-class";
pub const CACHE_STATIC_MATCHES: &str = "aop.cache-static-matches";
pub const SECURITY_ALLOWED_USERS: &str = "aop.security.allowed-users";
pub const PERFORMANCE_THRESHOLD_MS: &str = "aop.performance.threshold-ms";

/// AOP 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AopProperties {
    /// 强制使用基于子类的代理
    pub proxy_target_class: bool,
    /// 缓存每个方法的静态匹配结果
    pub cache_static_matches: bool,
    /// `SecurityInterceptor` 放行的用户
    pub allowed_users: Vec<String>,
    /// `PerformanceInterceptor` 的告警阈值
    pub performance_threshold_ms: u64,
}

impl Default for AopProperties {
    fn default() -> Self {
        Self {
            proxy_target_class: false,
            cache_static_matches: true,
            allowed_users: vec!["gugu".to_string()],
            performance_threshold_ms: 100,
        }
    }
}

impl AopProperties {
    /// 缺失的键使用默认值；存在但格式错误的键返回 `InvalidConfigValue`
    pub fn from_environment(env: &Environment) -> ApplicationResult<Self> {
        let defaults = Self::default();

        let threshold = env.require_i64_or(
            PERFORMANCE_THRESHOLD_MS,
            defaults.performance_threshold_ms as i64,
        )?;
        let performance_threshold_ms =
            u64::try_from(threshold).map_err(|_| ApplicationError::InvalidConfigValue {
                key: PERFORMANCE_THRESHOLD_MS.to_string(),
                message: format!("threshold must not be negative, found {}", threshold),
            })?;

        let properties = Self {
            proxy_target_class: env
                .require_bool_or(PROXY_TARGET_CLASS, defaults.proxy_target_class)?,
            cache_static_matches: env
                .require_bool_or(CACHE_STATIC_MATCHES, defaults.cache_static_matches)?,
            allowed_users: env
                .get_string_array(SECURITY_ALLOWED_USERS)
                .unwrap_or(defaults.allowed_users),
            performance_threshold_ms,
        };

        tracing::debug!("Loaded AOP properties: {:?}", properties);
        Ok(properties)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aspectra_core::{MapPropertySource, TomlPropertySource};

    #[test]
    fn test_defaults_when_missing() {
        let env = Environment::new();
        assert_eq!(
            AopProperties::from_environment(&env).unwrap(),
            AopProperties::default()
        );
    }

    #[test]
    fn test_from_toml() {
        let env = Environment::new();
        let source = TomlPropertySource::parse(
            r#"
            [aop]
            proxy-target-class = true
            cache-static-matches = false

            [aop.security]
            allowed-users = ["gugu", "admin"]

            [aop.performance]
            threshold-ms = 250
            "#,
            "application.toml",
        )
        .unwrap();
        env.add_property_source(Box::new(source));

        let properties = AopProperties::from_environment(&env).unwrap();
        assert!(properties.proxy_target_class);
        assert!(!properties.cache_static_matches);
        assert_eq!(properties.allowed_users, vec!["gugu", "admin"]);
        assert_eq!(properties.performance_threshold_ms, 250);
    }

    #[test]
    fn test_invalid_values() {
        let env = Environment::new();
        env.add_property_source(Box::new(
            MapPropertySource::new("overrides").with_property(PERFORMANCE_THRESHOLD_MS, -5i64),
        ));
        assert!(matches!(
            AopProperties::from_environment(&env),
            Err(ApplicationError::InvalidConfigValue { .. })
        ));
    }
}
