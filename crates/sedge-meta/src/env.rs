//! Lexical environment of a running directive script.
//!
//! Frames live in an arena and point at their parent by index, so nested
//! blocks can shadow without any pointer juggling. A fresh arena is built for
//! each directive; only session globals survive past it.

use std::collections::HashMap;

use crate::value::Value;

/// Index of a frame in the arena.
pub(crate) type FrameId = usize;

#[derive(Debug, Default)]
struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<FrameId>,
}

/// Arena of scope frames, root first.
#[derive(Debug)]
pub(crate) struct Env {
    frames: Vec<Frame>,
}

impl Env {
    pub(crate) fn new() -> Self {
        Env {
            frames: vec![Frame::default()],
        }
    }

    pub(crate) const ROOT: FrameId = 0;

    /// Open a child frame.
    pub(crate) fn push(&mut self, parent: FrameId) -> FrameId {
        self.frames.push(Frame {
            vars: HashMap::new(),
            parent: Some(parent),
        });
        self.frames.len() - 1
    }

    /// Bind a name in `frame`, shadowing any outer binding.
    pub(crate) fn define(&mut self, frame: FrameId, name: &str, value: Value) {
        self.frames[frame].vars.insert(name.to_string(), value);
    }

    /// Resolve a name through the parent chain.
    pub(crate) fn lookup(&self, frame: FrameId, name: &str) -> Option<&Value> {
        let mut at = Some(frame);
        while let Some(id) = at {
            let f = &self.frames[id];
            if let Some(v) = f.vars.get(name) {
                return Some(v);
            }
            at = f.parent;
        }
        None
    }

    /// Update the innermost existing binding. False when no frame binds it.
    pub(crate) fn assign(&mut self, frame: FrameId, name: &str, value: Value) -> bool {
        let mut at = Some(frame);
        while let Some(id) = at {
            if self.frames[id].vars.contains_key(name) {
                self.frames[id].vars.insert(name.to_string(), value);
                return true;
            }
            at = self.frames[id].parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shadowing_and_parent_lookup() {
        let mut env = Env::new();
        env.define(Env::ROOT, "x", Value::Num(1.0));
        let inner = env.push(Env::ROOT);
        assert_eq!(env.lookup(inner, "x"), Some(&Value::Num(1.0)));

        env.define(inner, "x", Value::Num(2.0));
        assert_eq!(env.lookup(inner, "x"), Some(&Value::Num(2.0)));
        assert_eq!(env.lookup(Env::ROOT, "x"), Some(&Value::Num(1.0)));
    }

    #[test]
    fn test_assign_targets_innermost_binding() {
        let mut env = Env::new();
        env.define(Env::ROOT, "x", Value::Num(1.0));
        let inner = env.push(Env::ROOT);
        assert!(env.assign(inner, "x", Value::Num(5.0)));
        assert_eq!(env.lookup(Env::ROOT, "x"), Some(&Value::Num(5.0)));
        assert!(!env.assign(inner, "missing", Value::Nil));
    }
}
