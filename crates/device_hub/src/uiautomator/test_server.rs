//! Minimal uiautomator2 server for tests
//!
//! Serves one HTTP request per connection. The reply function maps
//! `(path, json body)` to a response body; `None` closes the socket unanswered.

use serde_json::{json, Value};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

pub type Reply = fn(&str, &Value) -> Option<String>;

pub const WINDOW_XML: &str = r#"<?xml version='1.0' encoding='UTF-8' standalone='yes' ?><hierarchy rotation="0"><node index="0" text="Settings" class="android.widget.TextView" package="com.android.settings" bounds="[0,0][720,100]" /></hierarchy>"#;

/// Start a server on a free loopback port and return its base URL
pub async fn serve(reply: Reply) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (path, body) = read_request(&mut socket).await;
                if let Some(payload) = reply(&path, &body) {
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        payload.len(),
                        payload
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                }
            });
        }
    });

    format!("http://{}", addr)
}

async fn read_request(socket: &mut TcpStream) -> (String, Value) {
    let mut data = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = socket.read(&mut buf).await.unwrap_or(0);
        if n == 0 {
            return (String::new(), Value::Null);
        }
        data.extend_from_slice(&buf[..n]);

        let Some(end) = data.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&data[..end]).into_owned();
        let length = head
            .lines()
            .filter_map(|line| line.split_once(':'))
            .find(|(k, _)| k.eq_ignore_ascii_case("content-length"))
            .and_then(|(_, v)| v.trim().parse::<usize>().ok())
            .unwrap_or(0);

        let body_start = end + 4;
        if data.len() >= body_start + length {
            let path = head.split_whitespace().nth(1).unwrap_or("/").to_string();
            let body = serde_json::from_slice(&data[body_start..body_start + length])
                .unwrap_or(Value::Null);
            return (path, body);
        }
    }
}

pub fn rpc_result(request: &Value, result: Value) -> String {
    json!({"jsonrpc": "2.0", "id": request["id"], "result": result}).to_string()
}

pub fn rpc_error(request: &Value, message: &str) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": request["id"],
        "error": {"code": -32001, "message": message}
    })
    .to_string()
}

pub fn device_info(request: &Value) -> String {
    rpc_result(
        request,
        json!({
            "currentPackageName": "com.android.settings",
            "displayWidth": 720,
            "displayHeight": 1280,
            "sdkInt": 33
        }),
    )
}
