//! Variable references, build-time fixup and the runtime scope stack.
//!
//! A reference starts [`VariableSlot::Unbound`]. [`VariableRef::fixup`]
//! binds it to a global slot or a frame-relative local slot; bound
//! references resolve by index, unbound ones fall back to a by-name scan of
//! the visible bindings. Both paths see the same values.
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Error, ErrorCode, Result};
use crate::names::ExpandedName;
use crate::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VariableSlot {
    Unbound,
    Global(usize),
    /// Index relative to the innermost frame.
    Local(usize),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub name: ExpandedName,
    slot: VariableSlot,
}

impl VariableRef {
    pub fn new(name: impl Into<ExpandedName>) -> Self {
        Self {
            name: name.into(),
            slot: VariableSlot::Unbound,
        }
    }

    pub fn slot(&self) -> VariableSlot {
        self.slot
    }

    pub fn is_bound(&self) -> bool {
        self.slot != VariableSlot::Unbound
    }

    /// Bind against `declared` (globals first, then the locals of the
    /// enclosing frame, in declaration order). The last matching
    /// declaration wins so inner declarations shadow outer ones.
    pub fn fixup(&mut self, declared: &[ExpandedName], globals_boundary: usize) -> Result<()> {
        let Some(pos) = declared.iter().rposition(|n| *n == self.name) else {
            return Err(Error::from_code(
                ErrorCode::Fixup,
                format!("no declaration for variable ${}", self.name),
            ));
        };
        self.slot = if pos < globals_boundary {
            VariableSlot::Global(pos)
        } else {
            VariableSlot::Local(pos - globals_boundary)
        };
        debug!(name = %self.name, slot = ?self.slot, "variable bound");
        Ok(())
    }
}

#[derive(Debug, Clone)]
struct Binding {
    name: ExpandedName,
    value: Option<Value>,
}

/// Runtime storage for one evaluation session.
///
/// Every mutation bumps [`generation`](Self::generation) so caches keyed on
/// variable state can tell when to drop their entries.
#[derive(Debug, Default)]
pub struct VariableStack {
    globals: Vec<Binding>,
    locals: Vec<Binding>,
    // start of each frame inside `locals`
    frames: SmallVec<[usize; 16]>,
    dynamic: Vec<(ExpandedName, Value)>,
    generation: u64,
}

impl VariableStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    fn touch(&mut self) {
        self.generation = self.generation.wrapping_add(1);
    }

    /// Reserve the next global slot; its value is set later with
    /// [`set_global`](Self::set_global).
    pub fn declare_global(&mut self, name: impl Into<ExpandedName>) -> usize {
        self.globals.push(Binding {
            name: name.into(),
            value: None,
        });
        self.touch();
        self.globals.len() - 1
    }

    pub fn set_global(&mut self, index: usize, value: Value) -> Result<()> {
        let value = value.into_stable()?;
        let slot = self
            .globals
            .get_mut(index)
            .ok_or_else(|| unresolved(format!("global slot {index}")))?;
        slot.value = Some(value);
        self.touch();
        Ok(())
    }

    pub fn global_count(&self) -> usize {
        self.globals.len()
    }

    pub fn push_frame(&mut self) {
        self.frames.push(self.locals.len());
        self.touch();
    }

    /// Drop the innermost frame and its locals. No-op without a frame.
    pub fn pop_frame(&mut self) {
        if let Some(base) = self.frames.pop() {
            self.locals.truncate(base);
            self.touch();
        }
    }

    pub fn frame_depth(&self) -> usize {
        self.frames.len()
    }

    fn frame_base(&self) -> usize {
        self.frames.last().copied().unwrap_or(0)
    }

    /// Append a local to the innermost frame; returns its frame-relative
    /// index.
    pub fn declare_local(&mut self, name: impl Into<ExpandedName>, value: Value) -> Result<usize> {
        let value = value.into_stable()?;
        self.locals.push(Binding {
            name: name.into(),
            value: Some(value),
        });
        self.touch();
        Ok(self.locals.len() - 1 - self.frame_base())
    }

    pub fn set_local(&mut self, index: usize, value: Value) -> Result<()> {
        let value = value.into_stable()?;
        let at = self.frame_base() + index;
        let slot = self
            .locals
            .get_mut(at)
            .ok_or_else(|| unresolved(format!("local slot {index}")))?;
        slot.value = Some(value);
        self.touch();
        Ok(())
    }

    /// Binding introduced at run time (extension callbacks, host
    /// parameters). Visible only through by-name resolution and shadows
    /// older bindings of the same name.
    pub fn declare_dynamic(&mut self, name: impl Into<ExpandedName>, value: Value) -> Result<()> {
        let value = value.into_stable()?;
        self.dynamic.push((name.into(), value));
        self.touch();
        Ok(())
    }

    /// Names visible to fixup at the current point: globals, then the
    /// locals of the innermost frame. Pass `global_count()` as the
    /// boundary.
    pub fn declared_names(&self) -> Vec<ExpandedName> {
        self.globals
            .iter()
            .chain(&self.locals[self.frame_base()..])
            .map(|b| b.name.clone())
            .collect()
    }

    pub fn resolve(&self, var: &VariableRef) -> Result<Value> {
        let found = match var.slot {
            VariableSlot::Global(i) => self.globals.get(i).and_then(|b| b.value.as_ref()),
            VariableSlot::Local(i) => self
                .locals
                .get(self.frame_base() + i)
                .and_then(|b| b.value.as_ref()),
            VariableSlot::Unbound => {
                let v = self.lookup(&var.name);
                if v.is_some() {
                    debug!(name = %var.name, "variable resolved by name");
                }
                v
            }
        };
        found
            .cloned()
            .ok_or_else(|| unresolved(format!("variable ${}", var.name)))
    }

    /// By-name scan: dynamic bindings, then the innermost frame, then
    /// globals; newest first in each. Locals declared outside any frame
    /// form the outermost frame.
    pub fn lookup(&self, name: &ExpandedName) -> Option<&Value> {
        if let Some((_, v)) = self.dynamic.iter().rev().find(|(n, _)| n == name) {
            return Some(v);
        }
        self.globals
            .iter()
            .chain(&self.locals[self.frame_base()..])
            .rev()
            .find(|b| b.name == *name && b.value.is_some())
            .and_then(|b| b.value.as_ref())
    }
}

fn unresolved(what: String) -> Error {
    Error::from_code(ErrorCode::UnresolvedVariable, format!("unresolved {what}"))
}
