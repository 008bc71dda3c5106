mod classify;
mod control;
mod directory;
mod documentation;
mod evaluate;
mod host;
mod namespace;
mod signature;
#[cfg(test)]
pub(crate) mod testing;

use std::error::Error;
use std::fmt::{Display, Formatter};

use pyo3::prelude::*;

pub use classify::DisplayKind;
pub use directory::AttributeEntry;
pub use documentation::DocumentationRecord;
pub use evaluate::{EVAL_ERROR_PREFIX, Evaluation};
pub use host::{FrameScope, HostContext};
pub use namespace::{Namespace, ObjectPath, PathSegment, ResolutionError};
pub use signature::{CallableKind, SignatureRecord};

#[derive(Debug)]
pub enum IntrospectError {
    Unresolved(ResolutionError),
    Python(PyErr),
}

impl Display for IntrospectError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unresolved(err) => write!(f, "{err}"),
            Self::Python(err) => write!(f, "{err}"),
        }
    }
}

impl Error for IntrospectError {}

impl From<ResolutionError> for IntrospectError {
    fn from(err: ResolutionError) -> Self {
        Self::Unresolved(err)
    }
}

impl From<PyErr> for IntrospectError {
    fn from(err: PyErr) -> Self {
        Self::Python(err)
    }
}

pub type IntrospectResult<T> = std::result::Result<T, IntrospectError>;

pub struct Introspector<H> {
    host: H,
}

impl<H: HostContext> Introspector<H> {
    pub fn new(host: H) -> Self {
        Self { host }
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    pub fn dir(&self, path: &str) -> Vec<String> {
        Python::attach(|py| directory::list_names(&namespace::frame_namespace(&self.host, py), path))
    }

    pub fn dir2(&self, path: &str) -> Vec<AttributeEntry> {
        Python::attach(|py| {
            directory::list_detailed(&namespace::resolve_namespace(&self.host, py, path))
        })
    }

    pub fn signature_record(&self, name: &str) -> SignatureRecord {
        Python::attach(|py| {
            signature::resolve_signature(&namespace::frame_namespace(&self.host, py), name)
                .unwrap_or_default()
        })
    }

    pub fn signature(&self, name: &str) -> Option<String> {
        Python::attach(|py| {
            signature::resolve_signature(&namespace::frame_namespace(&self.host, py), name)
                .ok()
                .map(|record| record.text)
        })
    }

    pub fn doc_record(&self, name: &str) -> DocumentationRecord {
        Python::attach(|py| documentation::document(&namespace::frame_namespace(&self.host, py), name))
    }

    pub fn doc(&self, name: &str) -> String {
        self.doc_record(name).render()
    }

    pub fn eval(&self, expression: &str) -> Evaluation {
        Python::attach(|py| {
            match evaluate::evaluate(&namespace::frame_namespace(&self.host, py), expression) {
                Ok(value) => Evaluation::Value(value.unbind()),
                Err(_) => Evaluation::failed(expression),
            }
        })
    }

    pub fn interrupt(&self) {
        control::interrupt(&self.host);
    }

    pub fn terminate(&self) {
        control::terminate(&self.host);
    }
}
