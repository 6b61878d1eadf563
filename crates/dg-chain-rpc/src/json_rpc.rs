use dg_api_types::{ClientError, ClientResult};
use dg_contract::decode_revert_reason;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::debug;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;

#[derive(Debug, Deserialize)]
struct RpcReply {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// One WebSocket connection carrying JSON-RPC 2.0 requests. Requests are
/// serialized; frames whose id does not match the pending request
/// (subscription notifications) are skipped.
pub struct JsonRpcClient {
    endpoint: String,
    socket: Mutex<Socket>,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    pub async fn dial(endpoint: &str) -> ClientResult<Self> {
        let (socket, _response) = connect_async(endpoint)
            .await
            .map_err(|err| ClientError::Connection(format!("{endpoint}: {err}")))?;
        debug!("websocket open to {}", endpoint);
        Ok(Self {
            endpoint: endpoint.to_owned(),
            socket: Mutex::new(socket),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub async fn request(&self, method: &str, params: Value) -> ClientResult<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({ "jsonrpc": "2.0", "id": id, "method": method, "params": params });

        let mut socket = self.socket.lock().await;
        socket
            .send(Message::text(body.to_string()))
            .await
            .map_err(|err| self.transport_error(err))?;

        loop {
            let frame = socket
                .next()
                .await
                .ok_or_else(|| {
                    ClientError::Connection(format!("{}: socket closed", self.endpoint))
                })?
                .map_err(|err| self.transport_error(err))?;

            let text = match frame {
                Message::Text(text) => text.as_str().to_owned(),
                Message::Binary(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
                Message::Close(_) => {
                    return Err(ClientError::Connection(format!(
                        "{}: closed by node",
                        self.endpoint
                    )));
                }
                _ => continue,
            };

            let reply: RpcReply = match serde_json::from_str(&text) {
                Ok(reply) => reply,
                Err(err) => {
                    debug!("ignoring unparseable frame: {}", err);
                    continue;
                }
            };
            if reply.id.as_ref().and_then(Value::as_u64) != Some(id) {
                continue;
            }
            if let Some(error) = reply.error {
                return Err(rpc_error(method, error));
            }
            debug!("{} answered", method);
            return Ok(reply.result.unwrap_or(Value::Null));
        }
    }

    fn transport_error(&self, err: tokio_tungstenite::tungstenite::Error) -> ClientError {
        ClientError::Connection(format!("{}: {err}", self.endpoint))
    }
}

fn rpc_error(method: &str, error: RpcErrorBody) -> ClientError {
    let revert_data = error
        .data
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|raw| hex::decode(raw.trim_start_matches("0x")).ok());

    if let Some(reason) = revert_data.as_deref().and_then(decode_revert_reason) {
        return ClientError::Dispatch(format!("execution reverted: {reason}"));
    }
    if error.message.contains("execution reverted") || error.message.contains("revert") {
        return ClientError::Dispatch(error.message);
    }
    ClientError::Rpc(format!("{method}: {} (code {})", error.message, error.code))
}
