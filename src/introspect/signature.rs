use pyo3::prelude::*;

use super::IntrospectResult;
use super::namespace::Namespace;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallableKind {
    Builtin,
    Function,
    Method,
    Class,
    Callable,
}

impl CallableKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Builtin => "builtin",
            Self::Function => "function",
            Self::Method => "method",
            Self::Class => "class",
            Self::Callable => "callable",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignatureRecord {
    pub text: String,
    pub kind: Option<CallableKind>,
}

impl SignatureRecord {
    pub fn none() -> Self {
        Self::default()
    }

    fn new(text: String, kind: CallableKind) -> Self {
        Self {
            text,
            kind: Some(kind),
        }
    }

    pub fn kind_tag(&self) -> &'static str {
        self.kind.map_or("", CallableKind::tag)
    }

    pub fn is_none(&self) -> bool {
        self.text.is_empty() && self.kind.is_none()
    }
}

pub fn suffix_candidates(object_name: &str) -> Vec<String> {
    let parts: Vec<&str> = object_name.split('.').collect();
    (1..=parts.len())
        .map(|count| parts[parts.len() - count..].join("."))
        .collect()
}

pub fn docstring_signature(first_line: &str, candidates: &[String]) -> Option<String> {
    let mentions_name = candidates
        .iter()
        .any(|name| first_line.contains(&format!("{name}(")));
    let balanced = first_line.matches('(').count() == first_line.matches(')').count();
    (mentions_name && balanced).then(|| first_line.to_string())
}

pub fn resolve_signature(ns: &Namespace<'_>, object_name: &str) -> IntrospectResult<SignatureRecord> {
    let py = ns.py();
    let inspect = PyModule::import(py, "inspect")?;
    let candidates = suffix_candidates(object_name.trim());
    let object = ns.resolve(object_name)?;

    let (target, kind) = if probe(&inspect, "isbuiltin", &object)? {
        (object.clone(), Some(CallableKind::Builtin))
    } else if probe(&inspect, "isfunction", &object)? {
        (object.clone(), Some(CallableKind::Function))
    } else if probe(&inspect, "ismethod", &object)? {
        (object.clone(), Some(CallableKind::Method))
    } else if probe(&inspect, "isclass", &object)? && object.hasattr("__init__")? {
        (object.getattr("__init__")?, Some(CallableKind::Class))
    } else if object.hasattr("__call__")? {
        (object.getattr("__call__")?, Some(CallableKind::Callable))
    } else {
        (object.clone(), None)
    };

    // The docstring always comes from the named object itself.
    let doc = object.getattr("__doc__")?;
    let from_doc = if doc.is_none() {
        None
    } else {
        let text = doc.str()?.to_string_lossy().into_owned();
        let first_line = text.lines().next().unwrap_or("").trim().to_string();
        docstring_signature(&first_line, &candidates)
    };

    let record = match (kind, from_doc) {
        (Some(kind), Some(text)) => SignatureRecord::new(text, kind),
        (Some(kind), None) => {
            let leaf = candidates.first().map_or("", String::as_str);
            match structural_signature(&inspect, &target, leaf, kind == CallableKind::Class) {
                Ok(text) => SignatureRecord::new(text, kind),
                Err(_) => SignatureRecord::none(),
            }
        }
        (None, Some(text)) => SignatureRecord::new(text, CallableKind::Function),
        (None, None) => SignatureRecord::none(),
    };
    Ok(record)
}

fn probe(inspect: &Bound<'_, PyModule>, predicate: &str, value: &Bound<'_, PyAny>) -> PyResult<bool> {
    inspect.call_method1(predicate, (value,))?.is_truthy()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParameterKind {
    PositionalOnly,
    PositionalOrKeyword,
    VarPositional,
    KeywordOnly,
    VarKeyword,
}

impl ParameterKind {
    fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Self::PositionalOnly),
            1 => Some(Self::PositionalOrKeyword),
            2 => Some(Self::VarPositional),
            3 => Some(Self::KeywordOnly),
            4 => Some(Self::VarKeyword),
            _ => None,
        }
    }

    fn is_positional(self) -> bool {
        matches!(self, Self::PositionalOnly | Self::PositionalOrKeyword)
    }
}

fn structural_signature(
    inspect: &Bound<'_, PyModule>,
    target: &Bound<'_, PyAny>,
    name: &str,
    drop_receiver: bool,
) -> PyResult<String> {
    let signature = inspect.call_method1("signature", (target,))?;
    let empty = inspect.getattr("Parameter")?.getattr("empty")?;

    let mut rendered: Vec<String> = Vec::new();
    let mut in_positional_only = false;
    let mut seen_var_positional = false;

    for (index, parameter) in signature
        .getattr("parameters")?
        .call_method0("values")?
        .try_iter()?
        .enumerate()
    {
        let parameter = parameter?;
        let code: u8 = parameter.getattr("kind")?.extract()?;
        let Some(kind) = ParameterKind::from_code(code) else {
            continue;
        };
        if drop_receiver && index == 0 && kind.is_positional() {
            continue;
        }

        if in_positional_only && kind != ParameterKind::PositionalOnly {
            rendered.push("/".to_string());
        }
        in_positional_only = kind == ParameterKind::PositionalOnly;

        let param_name = parameter.getattr("name")?.str()?.to_string_lossy().into_owned();
        match kind {
            ParameterKind::VarPositional => {
                seen_var_positional = true;
                rendered.push(format!("*{param_name}"));
            }
            ParameterKind::VarKeyword => rendered.push(format!("**{param_name}")),
            _ => {
                if kind == ParameterKind::KeywordOnly && !seen_var_positional {
                    rendered.push("*".to_string());
                    seen_var_positional = true;
                }
                let default = parameter.getattr("default")?;
                if default.is(&empty) {
                    rendered.push(param_name);
                } else {
                    let default = default.repr()?.to_string_lossy().into_owned();
                    rendered.push(format!("{param_name}={default}"));
                }
            }
        }
    }
    if in_positional_only {
        rendered.push("/".to_string());
    }

    Ok(format!("{name}({})", rendered.join(", ")))
}
