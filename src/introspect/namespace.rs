use std::error::Error;
use std::fmt::{Display, Formatter};

use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};

use super::directory::member_names;
use super::host::{FrameScope, HostContext};

pub const UNKNOWN_MEMBER: &str = "<unknown>";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    EmptyPath,
    InvalidPath { path: String, reason: String },
    UndefinedName(String),
    Lookup { segment: String, message: String },
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyPath => write!(f, "empty object path"),
            Self::InvalidPath { path, reason } => write!(f, "invalid object path '{path}': {reason}"),
            Self::UndefinedName(name) => write!(f, "name '{name}' is not defined"),
            Self::Lookup { segment, message } => write!(f, "{segment}: {message}"),
        }
    }
}

impl Error for ResolutionError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Name(String),
    Attr(String),
    Index(String),
}

impl Display for PathSegment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Attr(name) => write!(f, ".{name}"),
            Self::Index(literal) => write!(f, "[{literal}]"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectPath {
    segments: Vec<PathSegment>,
}

impl ObjectPath {
    pub fn parse(path: &str) -> Result<Self, ResolutionError> {
        let text = path.trim();
        if text.is_empty() {
            return Err(ResolutionError::EmptyPath);
        }

        let invalid = |reason: &str| ResolutionError::InvalidPath {
            path: text.to_string(),
            reason: reason.to_string(),
        };

        let chars: Vec<char> = text.chars().collect();
        let mut pos = 0;
        let mut segments = Vec::new();

        let first = take_identifier(&chars, &mut pos).ok_or_else(|| invalid("expected a name"))?;
        segments.push(PathSegment::Name(first));

        while pos < chars.len() {
            match chars[pos] {
                '.' => {
                    pos += 1;
                    let name = take_identifier(&chars, &mut pos)
                        .ok_or_else(|| invalid("expected a name after '.'"))?;
                    segments.push(PathSegment::Attr(name));
                }
                '[' => {
                    pos += 1;
                    let literal = take_bracketed(&chars, &mut pos)
                        .ok_or_else(|| invalid("unterminated '['"))?;
                    if literal.trim().is_empty() {
                        return Err(invalid("empty index"));
                    }
                    segments.push(PathSegment::Index(literal.trim().to_string()));
                }
                other => return Err(invalid(&format!("unexpected character '{other}'"))),
            }
        }

        Ok(Self { segments })
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    pub fn split_attr(&self) -> Option<(ObjectPath, &str)> {
        match self.segments.last() {
            Some(PathSegment::Attr(name)) => Some((
                ObjectPath {
                    segments: self.segments[..self.segments.len() - 1].to_vec(),
                },
                name.as_str(),
            )),
            _ => None,
        }
    }
}

impl Display for ObjectPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for segment in &self.segments {
            write!(f, "{segment}")?;
        }
        Ok(())
    }
}

fn take_identifier(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    match chars.get(start) {
        Some(ch) if ch.is_alphabetic() || *ch == '_' => {}
        _ => return None,
    }
    while chars
        .get(*pos)
        .is_some_and(|ch| ch.is_alphanumeric() || *ch == '_')
    {
        *pos += 1;
    }
    Some(chars[start..*pos].iter().collect())
}

// Reads up to the matching ']' and leaves `pos` after it. Quotes and nested
// brackets inside the literal are honoured.
fn take_bracketed(chars: &[char], pos: &mut usize) -> Option<String> {
    let start = *pos;
    let mut depth = 0usize;
    let mut quote: Option<char> = None;

    while let Some(&ch) = chars.get(*pos) {
        *pos += 1;
        if let Some(q) = quote {
            if ch == '\\' {
                *pos += 1;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '\'' | '"' => quote = Some(ch),
            '[' | '(' | '{' => depth += 1,
            ']' if depth == 0 => return Some(chars[start..*pos - 1].iter().collect()),
            ']' | ')' | '}' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    None
}

pub struct Namespace<'py> {
    entries: Bound<'py, PyDict>,
}

impl<'py> Namespace<'py> {
    pub fn empty(py: Python<'py>) -> Self {
        Self {
            entries: PyDict::new(py),
        }
    }

    pub fn from_frame(frame: &FrameScope<'py>) -> PyResult<Self> {
        let entries = match &frame.globals {
            Some(globals) => {
                let merged = globals.copy()?;
                merged.update(frame.locals.as_mapping())?;
                merged
            }
            None => frame.locals.copy()?,
        };
        Ok(Self { entries })
    }

    pub fn members_of(value: &Bound<'py, PyAny>) -> PyResult<Self> {
        let py = value.py();
        let entries = PyDict::new(py);

        if let Ok(mapping) = value.cast::<PyDict>() {
            for item in mapping.items().iter() {
                let key = item.get_item(0)?;
                let member = item.get_item(1)?;
                entries.set_item(format!("[{}]", key.repr()?.to_string_lossy()), member)?;
            }
        } else if value.is_instance_of::<PyList>() || value.is_instance_of::<PyTuple>() {
            for (index, item) in value.try_iter()?.enumerate() {
                entries.set_item(format!("[{index}]"), item?)?;
            }
        } else {
            for name in member_names(value) {
                match value.getattr(name.as_str()) {
                    Ok(member) => entries.set_item(name.as_str(), member)?,
                    Err(_) => entries.set_item(name.as_str(), UNKNOWN_MEMBER)?,
                }
            }
        }

        Ok(Self { entries })
    }

    pub fn py(&self) -> Python<'py> {
        self.entries.py()
    }

    pub fn entries(&self) -> &Bound<'py, PyDict> {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn resolve(&self, path: &str) -> Result<Bound<'py, PyAny>, ResolutionError> {
        self.resolve_path(&ObjectPath::parse(path)?)
    }

    pub fn resolve_path(&self, path: &ObjectPath) -> Result<Bound<'py, PyAny>, ResolutionError> {
        let py = self.py();
        let mut current: Option<Bound<'py, PyAny>> = None;

        for segment in path.segments() {
            let lookup_error = |err: PyErr| ResolutionError::Lookup {
                segment: segment.to_string(),
                message: err.value(py).to_string(),
            };

            let next = match (segment, current.as_ref()) {
                (PathSegment::Name(name), None) => self.lookup_name(name)?,
                (PathSegment::Attr(name), Some(value)) => {
                    value.getattr(name.as_str()).map_err(lookup_error)?
                }
                (PathSegment::Index(literal), Some(value)) => {
                    let key = PyModule::import(py, "ast")
                        .and_then(|ast| ast.call_method1("literal_eval", (literal.as_str(),)))
                        .map_err(lookup_error)?;
                    value.get_item(key).map_err(lookup_error)?
                }
                _ => {
                    return Err(ResolutionError::InvalidPath {
                        path: path.to_string(),
                        reason: "path must start with a name".to_string(),
                    });
                }
            };
            current = Some(next);
        }

        current.ok_or(ResolutionError::EmptyPath)
    }

    // Namespace first, then the interpreter's builtins.
    fn lookup_name(&self, name: &str) -> Result<Bound<'py, PyAny>, ResolutionError> {
        let py = self.py();
        let lookup_error = |err: PyErr| ResolutionError::Lookup {
            segment: name.to_string(),
            message: err.value(py).to_string(),
        };

        if let Some(value) = self.entries.get_item(name).map_err(lookup_error)? {
            return Ok(value);
        }

        let builtins = PyModule::import(py, "builtins").map_err(lookup_error)?;
        if builtins.hasattr(name).map_err(lookup_error)? {
            return builtins.getattr(name).map_err(lookup_error);
        }

        Err(ResolutionError::UndefinedName(name.to_string()))
    }
}

pub fn frame_namespace<'py, H: HostContext + ?Sized>(host: &H, py: Python<'py>) -> Namespace<'py> {
    host.frame(py)
        .and_then(|frame| Namespace::from_frame(&frame))
        .unwrap_or_else(|_| Namespace::empty(py))
}

pub fn resolve_namespace<'py, H: HostContext + ?Sized>(
    host: &H,
    py: Python<'py>,
    path: &str,
) -> Namespace<'py> {
    let root = frame_namespace(host, py);
    if path.trim().is_empty() {
        return root;
    }

    root.resolve(path)
        .ok()
        .and_then(|value| Namespace::members_of(&value).ok())
        .unwrap_or_else(|| Namespace::empty(py))
}
