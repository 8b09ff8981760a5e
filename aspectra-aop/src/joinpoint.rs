//! 连接点（JoinPoint）与调用（Invocation）
//!
//! `JoinPoint` 是通知看到的只读调用上下文；
//! `Invocation` 是一次正在进行的调用，持有参数快照和通知链中的位置，
//! 环绕通知通过 `proceed()` 把调用交给链上的下一个环节。

use crate::advice::Advice;
use crate::error::Exception;
use crate::metadata::{MethodSignature, Target, TypeDescriptor};
use crate::value::Value;
use std::fmt;
use std::time::{Duration, Instant};

/// 连接点信息
#[derive(Clone, Copy)]
pub struct JoinPoint<'a> {
    pub method: &'static MethodSignature,
    pub target_type: &'static TypeDescriptor,
    pub args: &'a [Value],
    pub target: &'a dyn Target,
    pub started_at: Instant,
}

impl<'a> JoinPoint<'a> {
    /// 完整的方法签名，例如 `World::get_message`
    pub fn signature(&self) -> String {
        format!("{}::{}", self.target_type.name, self.method.name)
    }

    pub fn method_name(&self) -> &'static str {
        self.method.name
    }

    pub fn target_type_name(&self) -> &'static str {
        self.target_type.name
    }

    pub fn arg(&self, index: usize) -> Option<&'a Value> {
        self.args.get(index)
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl fmt::Debug for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JoinPoint")
            .field("signature", &self.signature())
            .field("args", &self.args)
            .finish()
    }
}

impl fmt::Display for JoinPoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}::{}", self.target_type.name, self.method.name)
    }
}

/// 调用状态
///
/// `NotStarted -> InChain(i) -> Returned | Threw`，不会回退，也不支持取消。
/// `InChain(i)` 中 `i == 通知个数` 表示正在执行目标方法。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationState {
    NotStarted,
    InChain(usize),
    Returned,
    Threw,
}

/// 一次正在进行的方法调用
pub struct Invocation<'a> {
    method: &'static MethodSignature,
    target_type: &'static TypeDescriptor,
    target: &'a dyn Target,
    args: Vec<Value>,
    chain: &'a [Advice],
    position: usize,
    state: InvocationState,
    started_at: Instant,
}

impl<'a> Invocation<'a> {
    pub(crate) fn new(
        target: &'a dyn Target,
        method: &'static MethodSignature,
        args: Vec<Value>,
        chain: &'a [Advice],
    ) -> Self {
        Self {
            method,
            target_type: target.descriptor(),
            target,
            args,
            chain,
            position: 0,
            state: InvocationState::NotStarted,
            started_at: Instant::now(),
        }
    }

    /// 从链头开始执行，并记录最终状态
    pub(crate) fn run(mut self) -> (Result<Value, Exception>, InvocationState) {
        let outcome = self.proceed();
        self.state = if outcome.is_ok() {
            InvocationState::Returned
        } else {
            InvocationState::Threw
        };
        (outcome, self.state)
    }

    /// 执行链上的下一个环节；链走完后调用目标方法
    ///
    /// 环绕通知可以不调用（跳过目标方法），也可以多次调用（每次都会重新执行内层链）
    pub fn proceed(&mut self) -> Result<Value, Exception> {
        let chain = self.chain;
        let position = self.position;
        self.state = InvocationState::InChain(position);

        let outcome = match chain.get(position) {
            Some(advice) => {
                self.position = position + 1;
                advice.apply(self)
            }
            None => {
                tracing::trace!("Invoking target method {}", self.method);
                self.target.invoke(self.method, &self.args)
            }
        };

        self.position = position;
        outcome
    }

    pub fn join_point(&self) -> JoinPoint<'_> {
        JoinPoint {
            method: self.method,
            target_type: self.target_type,
            args: &self.args,
            target: self.target,
            started_at: self.started_at,
        }
    }

    pub fn method(&self) -> &'static MethodSignature {
        self.method
    }

    pub fn args(&self) -> &[Value] {
        &self.args
    }

    /// 环绕通知可以在 `proceed()` 之前修改参数
    pub fn args_mut(&mut self) -> &mut Vec<Value> {
        &mut self.args
    }

    pub fn set_argument(&mut self, index: usize, value: impl Into<Value>) -> Result<(), Exception> {
        match self.args.get_mut(index) {
            Some(slot) => {
                *slot = value.into();
                Ok(())
            }
            None => Err(Exception::illegal_argument(format!(
                "{} has no argument at index {}",
                self.method, index
            ))),
        }
    }

    pub fn state(&self) -> InvocationState {
        self.state
    }

    pub fn chain_len(&self) -> usize {
        self.chain.len()
    }

    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl fmt::Debug for Invocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Invocation")
            .field("method", &self.method.signature())
            .field("args", &self.args)
            .field("position", &self.position)
            .field("chain_len", &self.chain.len())
            .field("state", &self.state)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::check_arity;
    use parking_lot::Mutex;
    use std::sync::Arc;

    static COUNTER: TypeDescriptor = TypeDescriptor {
        name: "Counter",
        interfaces: &[],
        markers: &[],
        sealed: false,
        methods: &[MethodSignature::new("Counter", "add").with_arity(1)],
    };

    #[derive(Default)]
    struct Counter {
        total: Mutex<i64>,
    }

    impl Target for Counter {
        fn descriptor(&self) -> &'static TypeDescriptor {
            &COUNTER
        }

        fn invoke(&self, method: &MethodSignature, args: &[Value]) -> Result<Value, Exception> {
            check_arity(method, args)?;
            let amount = args[0]
                .as_i64()
                .ok_or_else(|| Exception::illegal_argument("amount must be an int"))?;
            let mut total = self.total.lock();
            *total += amount;
            Ok(Value::Int(*total))
        }
    }

    fn add() -> &'static MethodSignature {
        COUNTER.method("add").unwrap()
    }

    #[test]
    fn test_empty_chain_invokes_target() {
        let counter = Counter::default();
        let invocation = Invocation::new(&counter, add(), vec![Value::from(5)], &[]);
        let (outcome, state) = invocation.run();
        assert_eq!(outcome.unwrap(), Value::Int(5));
        assert_eq!(state, InvocationState::Returned);
    }

    #[test]
    fn test_around_can_rewrite_arguments() {
        let counter = Counter::default();
        let chain = vec![Advice::around_fn(|inv| {
            inv.set_argument(0, 10)?;
            inv.proceed()
        })];

        let (outcome, _) = Invocation::new(&counter, add(), vec![Value::from(1)], &chain).run();
        assert_eq!(outcome.unwrap(), Value::Int(10));
    }

    #[test]
    fn test_proceed_twice_reruns_inner_chain() {
        let counter = Counter::default();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let recorder = Arc::clone(&seen);
        let chain = vec![
            Advice::around_fn(|inv| {
                inv.proceed()?;
                inv.proceed()
            }),
            Advice::before_fn(move |jp| {
                recorder.lock().push(jp.signature());
                Ok(())
            }),
        ];

        let (outcome, _) = Invocation::new(&counter, add(), vec![Value::from(2)], &chain).run();
        assert_eq!(outcome.unwrap(), Value::Int(4));
        assert_eq!(seen.lock().len(), 2);
    }

    #[test]
    fn test_state_transitions() {
        let counter = Counter::default();
        let states = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&states);
        let chain = vec![Advice::around_fn(move |inv| {
            log.lock().push(inv.state());
            let result = inv.proceed();
            log.lock().push(inv.state());
            result
        })];

        let (outcome, state) =
            Invocation::new(&counter, add(), vec![Value::from("x")], &chain).run();
        assert!(outcome.is_err());
        assert_eq!(state, InvocationState::Threw);
        assert_eq!(
            *states.lock(),
            vec![InvocationState::InChain(0), InvocationState::InChain(1)]
        );
    }

    #[test]
    fn test_set_argument_out_of_range() {
        let counter = Counter::default();
        let mut invocation = Invocation::new(&counter, add(), vec![Value::from(1)], &[]);
        assert!(invocation.set_argument(3, 1).is_err());
        assert_eq!(invocation.join_point().signature(), "Counter::add");
        assert_eq!(invocation.join_point().arg(0), Some(&Value::Int(1)));
    }
}
