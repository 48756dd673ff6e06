//! Web API 层。
//!
//! 提供 REST 与 JSON RPC 两套 Axum 路由，共用一个凭证校验函数，
//! 请求都委托给应用层的服务。

mod auth;
mod error;
mod routes;
mod rpc;
mod state;

pub use auth::authenticate;
pub use error::{ApiError, ErrorBody};
pub use routes::router;
pub use rpc::{rpc_router, RpcCode, RpcReply, RpcStatus, CHAT_SERVICE, USER_SERVICE};
pub use state::AppState;
