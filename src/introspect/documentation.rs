use pyo3::prelude::*;

use super::classify::{repr_text, truncate_chars, type_name};
use super::namespace::{Namespace, ObjectPath};
use super::signature::resolve_signature;
use super::{IntrospectError, IntrospectResult};

pub const DOC_REPR_LIMIT: usize = 200;
pub const UNKNOWN_CLASS: &str = "unknown";
pub const NO_HELP: &str = "No help available. ";

const PLAIN_DOC_CLASSES: [&str; 4] = ["type", "module", "builtin_function_or_method", "function"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationRecord {
    pub name: String,
    pub class_name: String,
    pub signature: String,
    pub repr: String,
    pub docstring: String,
}

impl DocumentationRecord {
    pub fn unavailable(name: &str, reason: &str) -> Self {
        Self {
            name: name.to_string(),
            class_name: String::new(),
            signature: String::new(),
            repr: String::new(),
            docstring: format!("{NO_HELP}{reason}"),
        }
    }

    pub fn render(&self) -> String {
        [
            self.name.as_str(),
            self.class_name.as_str(),
            self.signature.as_str(),
            self.repr.as_str(),
            self.docstring.as_str(),
        ]
        .join("\n")
    }
}

pub fn document(ns: &Namespace<'_>, object_name: &str) -> DocumentationRecord {
    match assemble(ns, object_name) {
        Ok(record) => record,
        Err(err) => DocumentationRecord::unavailable(object_name, &describe_error(ns.py(), &err)),
    }
}

fn describe_error(py: Python<'_>, err: &IntrospectError) -> String {
    match err {
        IntrospectError::Python(err) => err.value(py).to_string(),
        IntrospectError::Unresolved(err) => err.to_string(),
    }
}

fn assemble(ns: &Namespace<'_>, object_name: &str) -> IntrospectResult<DocumentationRecord> {
    let path = ObjectPath::parse(object_name)?;
    let object = ns.resolve_path(&path)?;

    let docstring = match class_level_doc(ns, &path, &object) {
        Some(doc) => doc,
        None => doc_text(&object.getattr("__doc__")?)?.unwrap_or_default(),
    };

    let repr = repr_text(&object)?;
    let class_name = type_name(&object).unwrap_or_else(|_| UNKNOWN_CLASS.to_string());
    let signature = resolve_signature(ns, object_name)?.text;

    Ok(DocumentationRecord {
        name: object_name.to_string(),
        class_name,
        signature,
        repr: truncate_chars(&repr, DOC_REPR_LIMIT, DOC_REPR_LIMIT, "...").replace('\n', "\r"),
        docstring,
    })
}

// A property's docstring lives on the owning class, not on the value the
// property returns.
fn class_level_doc(
    ns: &Namespace<'_>,
    path: &ObjectPath,
    object: &Bound<'_, PyAny>,
) -> Option<String> {
    let class_name = type_name(object).ok()?;
    if PLAIN_DOC_CLASSES.contains(&class_name.as_str()) {
        return None;
    }

    let doc = match path.split_attr() {
        Some((parent, attr)) => ns
            .resolve_path(&parent)
            .ok()?
            .get_type()
            .getattr(attr)
            .ok()?
            .getattr("__doc__")
            .ok()?,
        None => object.get_type().getattr("__doc__").ok()?,
    };
    doc_text(&doc).ok().flatten().filter(|text| !text.is_empty())
}

fn doc_text(doc: &Bound<'_, PyAny>) -> PyResult<Option<String>> {
    if doc.is_none() {
        return Ok(None);
    }
    Ok(Some(doc.str()?.to_string_lossy().into_owned()))
}
