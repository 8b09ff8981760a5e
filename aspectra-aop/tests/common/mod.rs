//! 集成测试共用的目标类型
#![allow(dead_code)]

use aspectra_aop::{AopError, ErrorKind, Exception};
use aspectra_aop_macros::{aop_interface, aop_target};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

#[aop_interface]
pub trait MessageSource {
    fn get_message(&self) -> Result<String, AopError>;
}

#[aop_interface]
pub trait SecureBean {
    fn write_secure_message(&self) -> Result<(), AopError>;
}

/// 带消息的问候对象，消息默认为空字符串
#[derive(Default)]
pub struct World {
    message: Mutex<String>,
}

impl World {
    pub fn with_message(message: &str) -> Self {
        Self {
            message: Mutex::new(message.to_string()),
        }
    }
}

#[aop_target(interfaces(MessageSource), facade)]
impl World {
    pub fn get_message(&self) -> String {
        self.message.lock().clone()
    }

    pub fn set_message(&self, message: &str) {
        *self.message.lock() = message.to_string();
    }

    #[sealed]
    pub fn version(&self) -> i64 {
        1
    }

    fn secret(&self) -> String {
        "secret".to_string()
    }

    pub fn describe() -> String {
        "World".to_string()
    }
}

/// 不可继承的类型
#[derive(Default)]
pub struct FinalWorld;

#[aop_target(sealed)]
impl FinalWorld {
    pub fn get_message(&self) -> String {
        "final".to_string()
    }
}

#[derive(Default)]
pub struct SampleBean;

#[aop_target(facade)]
impl SampleBean {
    pub fn dynamic_pointcut(&self, x: i64) -> String {
        format!("Invoked dynamicPointcut({})", x)
    }

    #[marker("CustomAnnotation")]
    pub fn annotation_pointcut(&self) -> String {
        "Invoked annotationPointcut()".to_string()
    }
}

#[derive(Default)]
pub struct ErrorBean;

#[aop_target(facade)]
impl ErrorBean {
    pub fn exception(&self) -> Result<(), Exception> {
        Err(Exception::new(ErrorKind::Exception, ""))
    }

    pub fn illegal_argument_exception(&self) -> Result<(), Exception> {
        Err(Exception::illegal_argument(""))
    }
}

#[derive(Default)]
pub struct SecureBeanTarget {
    written: AtomicUsize,
}

#[aop_target(interfaces(SecureBean), facade)]
impl SecureBeanTarget {
    pub fn write_secure_message(&self) {
        self.written.fetch_add(1, Ordering::SeqCst);
        tracing::info!("Every time I learn something new, it pushes some old stuff out of my brain");
    }

    pub fn written(&self) -> i64 {
        self.written.load(Ordering::SeqCst) as i64
    }
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter("aspectra_aop=debug")
        .try_init();
}
