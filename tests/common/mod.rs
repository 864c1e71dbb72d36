// tests/common/mod.rs
#![allow(dead_code)]

use glam::DVec3;
use std::collections::HashMap;
use voxel_turtle::{
    Callable, ChannelTransport, CommandRequest, Message, ScriptError, ScriptHost, ScriptValue,
    Variables,
};

/// A stand-in evaluator: `name arg arg ...`, where `x,y,z` is a vector,
/// numbers are numbers and anything else is a string.
#[derive(Default)]
pub struct TestHost {
    pub funcs: HashMap<String, Callable>,
    pub vars: HashMap<String, ScriptValue>,
}

impl TestHost {
    pub fn call(&self, name: &str, args: &[ScriptValue]) -> Result<ScriptValue, ScriptError> {
        let f = self
            .funcs
            .get(name)
            .cloned()
            .ok_or_else(|| ScriptError::UnknownFunction(name.to_string()))?;
        f(self, args)
    }
}

fn parse_token(token: &str) -> ScriptValue {
    if token.contains(',') {
        let parts: Vec<f64> = token.split(',').filter_map(|p| p.parse().ok()).collect();
        if parts.len() == 3 {
            return ScriptValue::Vector(DVec3::new(parts[0], parts[1], parts[2]));
        }
    }
    if let Ok(i) = token.parse::<i64>() {
        return ScriptValue::Int(i);
    }
    if let Ok(f) = token.parse::<f64>() {
        return ScriptValue::Float(f);
    }
    ScriptValue::Str(token.to_string())
}

impl Variables for TestHost {
    fn var(&self, name: &str) -> Option<ScriptValue> {
        self.vars.get(name).cloned()
    }
}

impl ScriptHost for TestHost {
    fn register(&mut self, name: &str, callable: Callable) {
        self.funcs.insert(name.to_string(), callable);
    }

    fn set_var(&mut self, name: &str, value: ScriptValue) {
        self.vars.insert(name.to_string(), value);
    }

    fn eval(&mut self, source: &str) -> Result<ScriptValue, ScriptError> {
        let mut tokens = source.split_whitespace();
        let name = tokens
            .next()
            .ok_or_else(|| ScriptError::Eval("empty expression".to_string()))?;
        let args: Vec<ScriptValue> = tokens.map(parse_token).collect();
        self.call(name, &args)
    }
}

/// Every command request text the peer has seen so far.
pub fn sent_commands(peer: &ChannelTransport) -> Vec<CommandRequest> {
    peer.drain()
        .into_iter()
        .filter_map(|m| match m {
            Message::CommandRequest(request) => Some(request),
            _ => None,
        })
        .collect()
}

pub fn assert_vec_eq(a: DVec3, b: DVec3) {
    assert!(a.abs_diff_eq(b, 1e-9), "{a} != {b}");
}
