mod dispatch;
mod server;
mod wire;
mod worker;

pub use dispatch::{Request, dispatch, error_response, parse_request};
pub use server::{bind, handle_connection, serve};
pub use wire::to_json;
pub use worker::IntrospectionService;
