//! The JSON-RPC 2.0 surface (C8): routes `initialize`/`tools/list`/
//! `tools/call` to the tool handlers in `gasoline-tools`, over either the
//! stdio transport or a single `POST /mcp` request.

mod dispatcher;
mod stdio;

pub use dispatcher::handle_request;
pub use stdio::run as run_stdio;
