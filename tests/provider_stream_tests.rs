//! Streaming against a raw socket server that controls chunk boundaries.

use std::time::Duration;

use futures::StreamExt;
use pretty_assertions::assert_eq;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ollama_agent::provider::{ChatProvider, ChatRequest, OpenAiCompatibleProvider};
use ollama_agent::types::{ChatMessage, ReasoningEffort};

const HEAD: &str = "HTTP/1.1 200 OK\r\ncontent-type: text/event-stream\r\nconnection: close\r\n\r\n";

/// Read one HTTP request (headers plus a Content-Length body).
async fn read_request(socket: &mut TcpStream) {
    let mut raw = Vec::new();
    let mut buf = [0u8; 4096];
    loop {
        let n = socket.read(&mut buf).await.unwrap();
        if n == 0 {
            return;
        }
        raw.extend_from_slice(&buf[..n]);
        let Some(end) = raw.windows(4).position(|w| w == b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&raw[..end]).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|value| value.trim().parse::<usize>().ok())
            .unwrap_or(0);
        if raw.len() >= end + 4 + length {
            return;
        }
    }
}

/// Serve one streamed response, writing each part separately.
async fn serve_in_parts(parts: Vec<Vec<u8>>) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        read_request(&mut socket).await;
        socket.write_all(HEAD.as_bytes()).await.unwrap();
        for part in parts {
            socket.write_all(&part).await.unwrap();
            socket.flush().await.unwrap();
            tokio::time::sleep(Duration::from_millis(30)).await;
        }
        let _ = socket.shutdown().await;
    });
    format!("http://{addr}/v1/")
}

fn request() -> ChatRequest {
    ChatRequest {
        model: "gpt-oss:20b".into(),
        messages: vec![ChatMessage::user("coffee?")],
        tools: Vec::new(),
        reasoning_effort: ReasoningEffort::Disabled,
    }
}

async fn streamed_text(base_url: String) -> String {
    let provider = OpenAiCompatibleProvider::new(base_url, "ollama");
    let deltas: Vec<_> = provider.stream_chat(&request()).await.unwrap().collect().await;
    deltas
        .into_iter()
        .filter_map(|delta| delta.unwrap().content)
        .collect()
}

#[tokio::test]
async fn multibyte_characters_split_across_chunks_stay_intact() {
    let line = "data: {\"choices\":[{\"delta\":{\"content\":\"caf\u{e9}\"}}]}\n\ndata: [DONE]\n\n";
    let bytes = line.as_bytes();
    let split = bytes.iter().position(|b| *b == 0xC3).unwrap() + 1;
    let base_url = serve_in_parts(vec![bytes[..split].to_vec(), bytes[split..].to_vec()]).await;

    assert_eq!(streamed_text(base_url).await, "caf\u{e9}");
}

#[tokio::test]
async fn final_line_without_newline_is_still_read() {
    let body = "data: {\"choices\":[{\"delta\":{\"content\":\"na\u{ef}ve \"}}]}\n\n\
                data: {\"choices\":[{\"delta\":{\"content\":\"\u{1f600}\"},\"finish_reason\":\"stop\"}]}";
    let bytes = body.as_bytes();
    // Cut inside the four-byte emoji.
    let split = bytes.iter().position(|b| *b == 0xF0).unwrap() + 2;
    let base_url = serve_in_parts(vec![bytes[..split].to_vec(), bytes[split..].to_vec()]).await;

    assert_eq!(streamed_text(base_url).await, "na\u{ef}ve \u{1f600}");
}
