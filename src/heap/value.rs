/*!
 * Host Values
 * Owned term trees for the runtime boundary
 */

use super::arena::ArenaHeap;
use super::scratch::with_scratch;
use super::types::{HeapError, HeapResult, Term};
use crate::core::types::{Pid, Ref};
use bumpalo::collections::Vec as ScratchVec;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use smartstring::alias::String as AtomText;
use std::fmt;
use thiserror::Error;

/// Owned value tree
///
/// Used wherever data crosses into or out of the runtime: initial process
/// state, host sends, call replies and custom exit reasons.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Atom(AtomText),
    Binary(Vec<u8>),
    Tuple(Vec<Value>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    Pid(Pid),
    Ref(Ref),
}

/// Value codec errors
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Diagnostic)]
pub enum CodecError {
    #[error("Failed to encode value: {0}")]
    #[diagnostic(code(value::encode_failed))]
    Encode(String),

    #[error("Failed to decode value: {0}")]
    #[diagnostic(
        code(value::decode_failed),
        help("The bytes were not produced by Value::encode or are truncated.")
    )]
    Decode(String),
}

impl Value {
    pub fn atom(name: &str) -> Self {
        Value::Atom(name.into())
    }

    pub fn binary(bytes: impl Into<Vec<u8>>) -> Self {
        Value::Binary(bytes.into())
    }

    /// UTF-8 text stored as a binary
    pub fn text(s: &str) -> Self {
        Value::Binary(s.as_bytes().to_vec())
    }

    pub fn tuple(elements: impl Into<Vec<Value>>) -> Self {
        Value::Tuple(elements.into())
    }

    pub fn list(elements: impl Into<Vec<Value>>) -> Self {
        Value::List(elements.into())
    }

    pub fn map(entries: impl Into<Vec<(Value, Value)>>) -> Self {
        Value::Map(entries.into())
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_atom(&self) -> Option<&str> {
        match self {
            Value::Atom(a) => Some(a.as_str()),
            _ => None,
        }
    }

    pub fn as_binary(&self) -> Option<&[u8]> {
        match self {
            Value::Binary(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[Value]> {
        match self {
            Value::Tuple(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    /// Look up a map entry by key
    pub fn get(&self, key: &Value) -> Option<&Value> {
        match self {
            Value::Map(entries) => entries.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Compact binary encoding
    pub fn encode(&self) -> Result<Vec<u8>, CodecError> {
        bincode::serialize(self).map_err(|e| CodecError::Encode(e.to_string()))
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        bincode::deserialize(bytes).map_err(|e| CodecError::Decode(e.to_string()))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn seq(f: &mut fmt::Formatter<'_>, items: &[Value]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{item}")?;
            }
            Ok(())
        }

        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Atom(a) => f.write_str(a),
            Value::Binary(b) => match std::str::from_utf8(b) {
                Ok(s) => write!(f, "{s:?}"),
                Err(_) => write!(f, "<<{} bytes>>", b.len()),
            },
            Value::Tuple(t) => {
                f.write_str("{")?;
                seq(f, t)?;
                f.write_str("}")
            }
            Value::List(l) => {
                f.write_str("[")?;
                seq(f, l)?;
                f.write_str("]")
            }
            Value::Map(m) => {
                f.write_str("#{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{k} => {v}")?;
                }
                f.write_str("}")
            }
            Value::Pid(p) => write!(f, "{p}"),
            Value::Ref(r) => write!(f, "{r}"),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<Pid> for Value {
    fn from(value: Pid) -> Self {
        Value::Pid(value)
    }
}

impl From<Ref> for Value {
    fn from(value: Ref) -> Self {
        Value::Ref(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::text(value)
    }
}

impl ArenaHeap {
    /// Build a value tree inside this heap
    pub fn import(&mut self, value: &Value) -> HeapResult<Term> {
        let term = match value {
            Value::Nil => Term::Nil,
            Value::Bool(b) => Term::Bool(*b),
            Value::Int(i) => Term::Int(*i),
            Value::Float(x) => Term::Float(*x),
            Value::Pid(p) => Term::Pid(*p),
            Value::Ref(r) => Term::Ref(*r),
            Value::Atom(a) => self.alloc_atom(a)?,
            Value::Binary(b) => self.alloc_binary(b)?,
            Value::Tuple(items) => {
                let children = self.import_all(items)?;
                self.alloc_tuple(&children)?
            }
            Value::List(items) => {
                let children = self.import_all(items)?;
                self.alloc_list(&children)?
            }
            Value::Map(entries) => {
                let mut pairs = Vec::with_capacity(entries.len());
                for (k, v) in entries {
                    pairs.push((self.import(k)?, self.import(v)?));
                }
                self.alloc_map(&pairs)?
            }
        };
        Ok(term)
    }

    fn import_all(&mut self, items: &[Value]) -> HeapResult<Vec<Term>> {
        items.iter().map(|item| self.import(item)).collect()
    }

    /// Read a term back out as an owned tree
    pub fn export(&self, term: Term) -> HeapResult<Value> {
        enum Frame {
            Visit(Term),
            Tuple(usize),
            List(usize),
            Map(usize),
        }

        with_scratch(|arena| {
            let mut frames = ScratchVec::new_in(arena);
            let mut built: Vec<Value> = Vec::new();
            frames.push(Frame::Visit(term));

            while let Some(frame) = frames.pop() {
                match frame {
                    Frame::Visit(t) => match t {
                        Term::Nil => built.push(Value::Nil),
                        Term::Bool(b) => built.push(Value::Bool(b)),
                        Term::Int(i) => built.push(Value::Int(i)),
                        Term::Float(x) => built.push(Value::Float(x)),
                        Term::Pid(p) => built.push(Value::Pid(p)),
                        Term::Ref(r) => built.push(Value::Ref(r)),
                        Term::Atom(_) => built.push(Value::Atom(self.atom(t)?.into())),
                        Term::Binary(_) => built.push(Value::Binary(self.binary(t)?.to_vec())),
                        Term::Tuple(b) | Term::List(b) | Term::Map(b) => {
                            let slots = self.word_slice(&b)?;
                            frames.push(match t {
                                Term::Tuple(_) => Frame::Tuple(slots.len()),
                                Term::List(_) => Frame::List(slots.len()),
                                _ => Frame::Map(slots.len()),
                            });
                            // Reversed so children finish in order
                            for slot in slots.iter().rev() {
                                frames.push(Frame::Visit(*slot));
                            }
                        }
                    },
                    Frame::Tuple(n) => {
                        let children = built.split_off(built.len() - n);
                        built.push(Value::Tuple(children));
                    }
                    Frame::List(n) => {
                        let children = built.split_off(built.len() - n);
                        built.push(Value::List(children));
                    }
                    Frame::Map(n) => {
                        let flat = built.split_off(built.len() - n);
                        let mut entries = Vec::with_capacity(n / 2);
                        let mut iter = flat.into_iter();
                        while let (Some(k), Some(v)) = (iter.next(), iter.next()) {
                            entries.push((k, v));
                        }
                        built.push(Value::Map(entries));
                    }
                }
            }

            built.pop().ok_or(HeapError::InvalidTerm {
                segment: 0,
                offset: 0,
                len: 0,
            })
        })
    }
}
