use pyo3::prelude::*;
use serde::Deserialize;
use serde_json::{Value, json};

use crate::introspect::{Evaluation, HostContext, Introspector};

use super::wire::to_json;

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub op: String,
    #[serde(default)]
    pub arg: String,
}

pub fn parse_request(line: &str) -> Result<Request, Value> {
    serde_json::from_str(line).map_err(|err| {
        error_response(
            &Value::Null,
            "invalid_request",
            &format!("invalid request: {err}"),
            json!({ "line": line }),
        )
    })
}

pub fn dispatch<H: HostContext>(introspector: &Introspector<H>, request: &Request) -> Value {
    let arg = request.arg.as_str();
    let result = match request.op.as_str() {
        "dir" => json!(introspector.dir(arg)),
        "dir2" => Value::Array(
            introspector
                .dir2(arg)
                .into_iter()
                .map(|entry| json!([entry.name, entry.type_name, entry.kind, entry.repr]))
                .collect(),
        ),
        "signature" => json!(introspector.signature(arg)),
        "doc" => json!(introspector.doc(arg)),
        "eval" => eval_result(introspector.eval(arg)),
        "interrupt" => {
            introspector.interrupt();
            Value::Null
        }
        "terminate" => {
            introspector.terminate();
            Value::Null
        }
        _ => {
            return error_response(
                &request.id,
                "unknown_operation",
                &format!("unknown operation: {}", request.op),
                json!({ "op": request.op }),
            );
        }
    };

    json!({
        "id": request.id,
        "ok": true,
        "result": result,
    })
}

fn eval_result(evaluation: Evaluation) -> Value {
    match evaluation {
        Evaluation::Failed(message) => Value::String(message),
        Evaluation::Value(value) => Python::attach(|py| to_json(value.bind(py))),
    }
}

pub fn error_response(id: &Value, code: &str, message: &str, details: Value) -> Value {
    json!({
        "id": id,
        "ok": false,
        "error": {
            "code": code,
            "message": message,
            "details": details,
        }
    })
}
