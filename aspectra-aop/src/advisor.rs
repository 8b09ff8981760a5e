//! 通知器（Advisor）：一个切点绑定一个通知

use crate::advice::Advice;
use crate::pointcut::{Pointcut, TruePointcut};
use std::fmt;
use std::sync::Arc;

/// 切点与通知的不可变组合
#[derive(Clone)]
pub struct Advisor {
    pointcut: Arc<dyn Pointcut>,
    advice: Advice,
}

impl Advisor {
    pub fn new(pointcut: impl Pointcut + 'static, advice: Advice) -> Self {
        Self::from_shared(Arc::new(pointcut), advice)
    }

    /// 多个通知器共享同一个切点
    pub fn from_shared(pointcut: Arc<dyn Pointcut>, advice: Advice) -> Self {
        Self { pointcut, advice }
    }

    /// 匹配所有方法的通知器
    pub fn always(advice: Advice) -> Self {
        Self::new(TruePointcut, advice)
    }

    pub fn pointcut(&self) -> &dyn Pointcut {
        self.pointcut.as_ref()
    }

    pub fn advice(&self) -> &Advice {
        &self.advice
    }
}

impl fmt::Debug for Advisor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Advisor")
            .field("pointcut", &self.pointcut.name())
            .field("advice", &self.advice)
            .finish()
    }
}
