//! 演示用的目标对象

use aspectra_aop::{AopError, ErrorKind, Exception};
use aspectra_aop_macros::{aop_interface, aop_target};
use parking_lot::Mutex;

#[aop_interface]
pub trait MessageSource {
    fn get_message(&self) -> Result<String, AopError>;
}

#[aop_interface]
pub trait SecureBean {
    fn write_secure_message(&self) -> Result<(), AopError>;
}

#[derive(Default)]
pub struct World {
    message: Mutex<String>,
}

impl World {
    pub fn new(message: &str) -> Self {
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
        Err(Exception::new(ErrorKind::Exception, "generic failure"))
    }

    pub fn illegal_argument_exception(&self) -> Result<(), Exception> {
        Err(Exception::illegal_argument("bad argument"))
    }
}

#[derive(Default)]
pub struct SecureBeanTarget;

#[aop_target(interfaces(SecureBean), facade)]
impl SecureBeanTarget {
    pub fn write_secure_message(&self) {
        tracing::info!("Every time I learn something new, it pushes some old stuff out of my brain");
    }
}

/// 耗时的仓储，用于演示性能拦截器
#[derive(Default)]
pub struct SlowRepository;

#[aop_target(facade)]
impl SlowRepository {
    pub fn find_all(&self, delay_ms: i64) -> Vec<String> {
        std::thread::sleep(std::time::Duration::from_millis(delay_ms.max(0) as u64));
        vec!["alpha".to_string(), "beta".to_string()]
    }
}
