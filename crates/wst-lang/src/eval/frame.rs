//! Runtime activation records.
//!
//! A frame only reaches past its own locals when its function was compiled
//! with `inherit_parent_vars`. Reads follow any parent link; writes follow
//! [`Link::Caller`] links only, so a closure never writes into the frame it
//! captured.
use std::fmt;
use std::sync::{PoisonError, RwLockReadGuard, RwLockWriteGuard};

use rustc_hash::FxHashMap;
use smol_str::SmolStr;

use crate::ast::constants;
use crate::value::Value;
use crate::{Shared, SharedCell};

pub type FrameRef = Shared<SharedCell<Frame>>;

#[derive(Clone)]
pub enum Link {
    /// The frame of the call site.
    Caller(FrameRef),
    /// The frame a closure was built in.
    Captured(FrameRef),
}

impl Link {
    pub fn frame(&self) -> &FrameRef {
        match self {
            Link::Caller(frame) | Link::Captured(frame) => frame,
        }
    }
}

impl fmt::Debug for Link {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Caller(frame) => write!(f, "Caller({})", read_guard(frame).name),
            Link::Captured(frame) => write!(f, "Captured({})", read_guard(frame).name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Frame {
    name: SmolStr,
    locals: FxHashMap<SmolStr, Value>,
    parent: Option<Link>,
    inherit: bool,
}

impl Frame {
    pub fn new(name: impl Into<SmolStr>, inherit: bool, parent: Option<Link>) -> FrameRef {
        let mut locals = FxHashMap::default();
        locals.insert(SmolStr::new(constants::THIS), Value::Null);

        Shared::new(SharedCell::new(Frame {
            name: name.into(),
            locals,
            parent,
            inherit,
        }))
    }

    pub fn name(&self) -> &SmolStr {
        &self.name
    }
}

fn read_guard(frame: &FrameRef) -> RwLockReadGuard<'_, Frame> {
    frame.read().unwrap_or_else(PoisonError::into_inner)
}

fn write_guard(frame: &FrameRef) -> RwLockWriteGuard<'_, Frame> {
    frame.write().unwrap_or_else(PoisonError::into_inner)
}

/// Binds `name` in this frame only.
pub fn define(frame: &FrameRef, name: impl Into<SmolStr>, value: Value) {
    write_guard(frame).locals.insert(name.into(), value);
}

pub fn this(frame: &FrameRef) -> Value {
    read_guard(frame)
        .locals
        .get(constants::THIS)
        .cloned()
        .unwrap_or_default()
}

pub fn read(frame: &FrameRef, name: &str) -> Option<Value> {
    let mut link = {
        let guard = read_guard(frame);
        if let Some(value) = guard.locals.get(name) {
            return Some(value.clone());
        }
        if !guard.inherit || name == constants::THIS {
            return None;
        }
        guard.parent.clone()
    };

    while let Some(current) = link {
        let guard = read_guard(current.frame());
        if let Some(value) = guard.locals.get(name) {
            return Some(value.clone());
        }
        if !guard.inherit {
            return None;
        }
        link = guard.parent.clone();
    }

    None
}

/// Assigns `name`. An inheriting frame updates every frame along its caller
/// chain that already holds the variable; otherwise the binding is local.
pub fn write(frame: &FrameRef, name: &str, value: Value) {
    if name == constants::THIS {
        define(frame, name, value);
        return;
    }

    let mut updated = false;
    let mut current = Some(frame.clone());

    while let Some(target) = current {
        let mut guard = write_guard(&target);
        if let Some(slot) = guard.locals.get_mut(name) {
            *slot = value.clone();
            updated = true;
        }
        current = match (&guard.parent, guard.inherit) {
            (Some(Link::Caller(parent)), true) => Some(parent.clone()),
            _ => None,
        };
    }

    if !updated {
        define(frame, name, value);
    }
}

/// Copies the frame and every ancestor so that work on the copy is invisible
/// through the original chain.
pub fn snapshot(frame: &FrameRef) -> FrameRef {
    let guard = read_guard(frame);
    let parent = guard.parent.as_ref().map(|link| match link {
        Link::Caller(parent) => Link::Caller(snapshot(parent)),
        Link::Captured(parent) => Link::Captured(snapshot(parent)),
    });

    Shared::new(SharedCell::new(Frame {
        name: guard.name.clone(),
        locals: guard.locals.clone(),
        parent,
        inherit: guard.inherit,
    }))
}
