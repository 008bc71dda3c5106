use std::collections::BTreeSet;

use pyo3::prelude::*;
use pyo3::types::PyString;

use super::classify::{bounded_repr, classify, type_name};
use super::namespace::Namespace;

pub const PRIVATE_PREFIX: &str = "__";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeEntry {
    pub name: String,
    pub type_name: String,
    pub kind: String,
    pub repr: String,
}

pub fn member_names(value: &Bound<'_, PyAny>) -> BTreeSet<String> {
    let mut names = BTreeSet::new();

    let probes: [fn(&Bound<'_, PyAny>) -> PyResult<Vec<String>>; 3] =
        [class_directory, instance_attributes, own_directory];
    for probe in probes {
        if let Ok(found) = probe(value) {
            names.extend(found);
        }
    }

    names
}

fn class_directory(value: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    strings(value.getattr("__class__")?.dir()?.as_any())
}

fn instance_attributes(value: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    strings(&value.getattr("__dict__")?.call_method0("keys")?)
}

fn own_directory(value: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    strings(value.dir()?.as_any())
}

fn strings(iterable: &Bound<'_, PyAny>) -> PyResult<Vec<String>> {
    iterable
        .try_iter()?
        .map(|item| -> PyResult<String> { Ok(item?.str()?.to_string_lossy().into_owned()) })
        .collect()
}

pub fn list_names(ns: &Namespace<'_>, path: &str) -> Vec<String> {
    match ns.resolve(path) {
        Ok(value) => member_names(&value).into_iter().collect(),
        Err(_) => Vec::new(),
    }
}

pub fn list_detailed(members: &Namespace<'_>) -> Vec<AttributeEntry> {
    let mut entries = Vec::new();

    for item in members.entries().items().iter() {
        let Ok(key) = item.get_item(0) else {
            continue;
        };
        if let Ok(text) = key.cast::<PyString>() {
            if text.to_string_lossy().starts_with(PRIVATE_PREFIX) {
                continue;
            }
        }
        let Ok(value) = item.get_item(1) else {
            continue;
        };
        if let Ok(entry) = describe(&key, &value) {
            entries.push(entry);
        }
    }

    entries
}

fn describe(key: &Bound<'_, PyAny>, value: &Bound<'_, PyAny>) -> PyResult<AttributeEntry> {
    let type_name = type_name(value)?;
    let kind = classify(value, &type_name)?;
    Ok(AttributeEntry {
        name: key.str()?.to_string_lossy().into_owned(),
        kind: kind.label(&type_name),
        repr: bounded_repr(value, kind)?,
        type_name,
    })
}
