use pyo3::prelude::*;
use pyo3::types::{PyBool, PyDict, PyFloat, PyInt, PyList, PyString, PyTuple};
use serde_json::{Map, Number, Value};

pub const WIRE_MAX_DEPTH: usize = 16;

pub fn to_json(value: &Bound<'_, PyAny>) -> Value {
    convert(value, WIRE_MAX_DEPTH)
}

fn convert(value: &Bound<'_, PyAny>, depth: usize) -> Value {
    structural(value, depth)
        .ok()
        .flatten()
        .unwrap_or_else(|| repr_value(value))
}

fn structural(value: &Bound<'_, PyAny>, depth: usize) -> PyResult<Option<Value>> {
    if value.is_none() {
        return Ok(Some(Value::Null));
    }
    if let Ok(flag) = value.cast::<PyBool>() {
        return Ok(Some(Value::Bool(flag.is_true())));
    }
    if value.is_instance_of::<PyInt>() {
        if let Ok(number) = value.extract::<i64>() {
            return Ok(Some(Value::from(number)));
        }
        if let Ok(number) = value.extract::<u64>() {
            return Ok(Some(Value::from(number)));
        }
        return Ok(None);
    }
    if value.is_instance_of::<PyFloat>() {
        let number: f64 = value.extract()?;
        return Ok(Number::from_f64(number).map(Value::Number));
    }
    if let Ok(text) = value.cast::<PyString>() {
        return Ok(Some(Value::String(text.to_string_lossy().into_owned())));
    }
    if depth == 0 {
        return Ok(None);
    }
    if value.is_instance_of::<PyList>() || value.is_instance_of::<PyTuple>() {
        let items = value
            .try_iter()?
            .map(|item| -> PyResult<Value> { Ok(convert(&item?, depth - 1)) })
            .collect::<PyResult<Vec<_>>>()?;
        return Ok(Some(Value::Array(items)));
    }
    if let Ok(dict) = value.cast::<PyDict>() {
        let mut object = Map::new();
        for (key, item) in dict.copy()?.iter() {
            let Ok(key) = key.cast::<PyString>() else {
                return Ok(None);
            };
            object.insert(key.to_string_lossy().into_owned(), convert(&item, depth - 1));
        }
        return Ok(Some(Value::Object(object)));
    }
    Ok(None)
}

fn repr_value(value: &Bound<'_, PyAny>) -> Value {
    match value.repr() {
        Ok(repr) => Value::String(repr.to_string_lossy().into_owned()),
        Err(err) => Value::String(format!("<unrepresentable: {}>", err.value(value.py()))),
    }
}

#[cfg(test)]
mod tests {
    use std::ffi::CString;

    use pyo3::prelude::*;
    use serde_json::{Value, json};

    use super::to_json;

    fn eval_json(source: &str) -> Value {
        Python::attach(|py| {
            let code = CString::new(source).expect("python code cstring");
            let value = py.eval(code.as_c_str(), None, None).expect("eval");
            to_json(&value)
        })
    }

    #[test]
    fn plain_data_is_structural() {
        assert_eq!(eval_json("None"), Value::Null);
        assert_eq!(eval_json("True"), json!(true));
        assert_eq!(eval_json("-3"), json!(-3));
        assert_eq!(eval_json("2.5"), json!(2.5));
        assert_eq!(eval_json("'hi'"), json!("hi"));
        assert_eq!(
            eval_json("{'a': [1, (2, 'x')], 'b': None}"),
            json!({"a": [1, [2, "x"]], "b": null})
        );
    }

    #[test]
    fn everything_else_is_repr() {
        assert_eq!(eval_json("{1: 'a'}"), json!("{1: 'a'}"));
        assert_eq!(eval_json("2 ** 100"), json!("1267650600228229401496703205376"));
        assert_eq!(eval_json("float('nan')"), json!("nan"));
        assert_eq!(eval_json("{1, 2}"), json!("{1, 2}"));
        assert_eq!(eval_json("[{1: 2}]"), json!(["{1: 2}"]));
    }

    #[test]
    fn deep_nesting_falls_back_to_repr() {
        let value = eval_json("[[[[[[[[[[[[[[[[[[[1]]]]]]]]]]]]]]]]]]]");
        let mut cursor = &value;
        for _ in 0..16 {
            cursor = &cursor[0];
        }
        assert_eq!(cursor, &json!("[[[1]]]"));
    }

    #[test]
    fn self_referencing_list_terminates() {
        let value = Python::attach(|py| {
            let code = CString::new("(lambda x: (x.append(x), x)[1])([])").expect("cstring");
            to_json(&py.eval(code.as_c_str(), None, None).expect("eval"))
        });
        assert!(value.is_array());
    }
}
