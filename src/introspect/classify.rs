use pyo3::prelude::*;
use pyo3::types::{PyDict, PyList, PyTuple};

pub const PREVIEW_LIMIT: usize = 70;
pub const PREVIEW_KEEP: usize = 67;
pub const REPR_LIMIT: usize = 80;
pub const REPR_KEEP: usize = 77;
pub const ELLIPSIS: &str = "…";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayKind {
    Array,
    List,
    Tuple,
    Mapping,
    Other,
}

impl DisplayKind {
    pub fn label(self, type_name: &str) -> String {
        match self {
            Self::Array => "array".to_string(),
            Self::List => "list".to_string(),
            Self::Tuple => "tuple".to_string(),
            Self::Mapping => "dict".to_string(),
            Self::Other => type_name.to_string(),
        }
    }
}

pub fn type_name(value: &Bound<'_, PyAny>) -> PyResult<String> {
    Ok(value.get_type().name()?.to_string_lossy().into_owned())
}

pub fn classify(value: &Bound<'_, PyAny>, type_name: &str) -> PyResult<DisplayKind> {
    if type_name == "type" {
        return Ok(DisplayKind::Other);
    }
    if value.hasattr("__array__")? && value.hasattr("dtype")? && value.hasattr("shape")? {
        return Ok(DisplayKind::Array);
    }
    if value.is_instance_of::<PyList>() {
        return Ok(DisplayKind::List);
    }
    if value.is_instance_of::<PyTuple>() {
        return Ok(DisplayKind::Tuple);
    }
    if type_name == "dict" && value.is_instance_of::<PyDict>() {
        return Ok(DisplayKind::Mapping);
    }
    Ok(DisplayKind::Other)
}

pub fn bounded_repr(value: &Bound<'_, PyAny>, kind: DisplayKind) -> PyResult<String> {
    match kind {
        DisplayKind::Array => array_repr(value),
        DisplayKind::List | DisplayKind::Tuple => {
            let label = if kind == DisplayKind::List { "list" } else { "tuple" };
            let preview = preview(value.try_iter()?.map(|item| repr_text(&item?)))?;
            Ok(format!("<{}-element {label}: {preview}>", value.len()?))
        }
        DisplayKind::Mapping => {
            let items = value.call_method0("items")?;
            let preview = preview(items.try_iter()?.map(|item| -> PyResult<String> {
                let item = item?;
                Ok(format!(
                    "{}: {}",
                    repr_text(&item.get_item(0)?)?,
                    repr_text(&item.get_item(1)?)?
                ))
            }))?;
            Ok(format!("<{}-item dict: {preview}>", value.len()?))
        }
        DisplayKind::Other => Ok(truncate_chars(&repr_text(value)?, REPR_LIMIT, REPR_KEEP, ELLIPSIS)),
    }
}

fn array_repr(value: &Bound<'_, PyAny>) -> PyResult<String> {
    let dtype = value
        .getattr("dtype")?
        .getattr("name")?
        .str()?
        .to_string_lossy()
        .into_owned();
    let dims = value
        .getattr("shape")?
        .try_iter()?
        .map(|dim| -> PyResult<String> { Ok(dim?.str()?.to_string_lossy().into_owned()) })
        .collect::<PyResult<Vec<_>>>()?
        .join("x");

    if !dims.is_empty() {
        let elements = if value.hasattr("flat")? {
            preview(value.getattr("flat")?.try_iter()?.map(|item| repr_text(&item?)))?
        } else {
            String::new()
        };
        return Ok(format!("<array {dims} {dtype}: {elements}>"));
    }

    if value.getattr("size")?.is_truthy()? {
        let converter = if dtype.contains("int") { "int" } else { "float" };
        let number = PyModule::import(value.py(), "builtins")?
            .getattr(converter)?
            .call1((value,))?
            .str()?
            .to_string_lossy()
            .into_owned();
        return Ok(format!("<array scalar {dtype} ({number})>"));
    }

    Ok(format!("<array empty {dtype}>"))
}

pub fn repr_text(value: &Bound<'_, PyAny>) -> PyResult<String> {
    Ok(value.repr()?.to_string_lossy().into_owned())
}

pub fn preview<I>(items: I) -> PyResult<String>
where
    I: Iterator<Item = PyResult<String>>,
{
    let mut text = String::new();
    let mut chars = 0;
    for item in items {
        let item = item?;
        if !text.is_empty() {
            text.push_str(", ");
            chars += 2;
        }
        chars += item.chars().count();
        text.push_str(&item);
        if chars > PREVIEW_LIMIT {
            let head: String = text.chars().take(PREVIEW_KEEP).collect();
            return Ok(format!("{head}, {ELLIPSIS}"));
        }
    }
    Ok(text)
}

pub fn truncate_chars(text: &str, limit: usize, keep: usize, marker: &str) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let head: String = text.chars().take(keep).collect();
    format!("{head}{marker}")
}
