//! 切面注册表
//!
//! 显式持有切面；代理工厂通过 `add_aspects` 取用，不会隐式代理任何对象

use crate::advisor::Advisor;
use crate::aspect::{Aspect, AspectAdvisor};
use once_cell::sync::Lazy;
use std::sync::Arc;

/// 全局切面注册表
///
/// 第一次访问时加载所有通过 inventory 注册的切面
static GLOBAL_ASPECT_REGISTRY: Lazy<Arc<AspectRegistry>> = Lazy::new(|| {
    let mut registry = AspectRegistry::new();
    registry.auto_load_aspects();
    Arc::new(registry)
});

/// 获取全局切面注册表
pub fn get_global_registry() -> &'static Arc<AspectRegistry> {
    &GLOBAL_ASPECT_REGISTRY
}

/// 切面注册表
#[derive(Default)]
pub struct AspectRegistry {
    aspects: Vec<Arc<dyn Aspect>>,
}

impl AspectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册切面
    pub fn register(&mut self, aspect: Arc<dyn Aspect>) {
        tracing::debug!(
            "Registering aspect: {} ({})",
            aspect.name(),
            aspect.pointcut()
        );
        self.aspects.push(aspect);
    }

    /// 批量注册切面
    pub fn register_all(&mut self, aspects: impl IntoIterator<Item = Arc<dyn Aspect>>) {
        for aspect in aspects {
            self.register(aspect);
        }
    }

    /// 从 inventory 加载所有 `#[derive(Aspect)]` 注册的切面，返回加载数量
    ///
    /// 已经注册过的同名切面会被跳过，重复调用不会产生重复的通知器
    pub fn auto_load_aspects(&mut self) -> usize {
        let registrations: Vec<_> = crate::aspect::get_all_aspect_registrations().collect();
        tracing::info!("Auto-loading {} aspect(s) from registry", registrations.len());

        let mut loaded = 0;
        for registration in registrations {
            if self.contains(registration.name) {
                tracing::debug!("  ├─ Skipping already registered aspect: {}", registration.name);
                continue;
            }
            tracing::debug!(
                "  ├─ Loading aspect: {} with pointcut: {}",
                registration.name,
                registration.pointcut_expr
            );
            self.register(registration.create_instance());
            loaded += 1;
        }

        tracing::info!("Auto-loaded {} aspect(s)", loaded);
        loaded
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aspects.iter().any(|aspect| aspect.name() == name)
    }

    pub fn aspects(&self) -> &[Arc<dyn Aspect>] {
        &self.aspects
    }

    /// 每个切面一个通知器，顺序与注册顺序一致
    pub fn advisors(&self) -> Vec<Advisor> {
        self.aspects
            .iter()
            .map(|aspect| AspectAdvisor::new(Arc::clone(aspect)).into_advisor())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.aspects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aspects.is_empty()
    }

    pub fn clear(&mut self) {
        self.aspects.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aspect::AspectMetadata;

    struct Named(&'static str);

    impl AspectMetadata for Named {
        fn name(&self) -> &str {
            self.0
        }

        fn pointcut(&self) -> &str {
            "execution(* *(..))"
        }
    }

    impl Aspect for Named {}

    #[test]
    fn test_register_preserves_order() {
        let mut registry = AspectRegistry::new();
        assert!(registry.is_empty());
        registry.register_all([
            Arc::new(Named("first")) as Arc<dyn Aspect>,
            Arc::new(Named("second")) as Arc<dyn Aspect>,
        ]);

        let names: Vec<&str> = registry.aspects().iter().map(|a| a.name()).collect();
        assert_eq!(names, vec!["first", "second"]);
        assert_eq!(registry.advisors().len(), 2);
        assert!(registry.contains("second"));

        registry.clear();
        assert_eq!(registry.len(), 0);
    }
}
