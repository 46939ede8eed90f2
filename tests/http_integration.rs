// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the HTTP API and the WebSocket push channel.

#![cfg(feature = "http")]

use std::net::SocketAddr;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use onair_core::dispatcher::Dispatcher;
use onair_core::event::CommandSource;
use onair_core::protocol::HttpServer;
use onair_core::state::DeviceState;
use serde_json::Value;
use tokio_tungstenite::tungstenite::Message;

/// Starts a dispatcher and an HTTP server on an ephemeral port.
async fn start() -> (Dispatcher, String) {
    let handles = Dispatcher::builder(DeviceState::new()).without_tick().spawn();
    let server = HttpServer::bind(SocketAddr::from(([127, 0, 0, 1], 0)))
        .await
        .unwrap();
    let base = format!("http://{}", server.local_addr());
    server.spawn(handles.dispatcher.clone(), std::future::pending());
    (handles.dispatcher, base)
}

async fn get_json(url: &str) -> (u16, Value) {
    let response = reqwest::get(url).await.unwrap();
    let status = response.status().as_u16();
    (status, response.json().await.unwrap())
}

// ============================================================================
// Command API
// ============================================================================

mod command_api {
    use super::*;

    #[tokio::test]
    async fn command_applies_and_reports_outcome() {
        let (dispatcher, base) = start().await;

        let (status, body) = get_json(&format!("{base}/api/command?cmd=LED1:ON")).await;

        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["command"], "LED1:ON");
        assert_eq!(body["outcome"]["result"], "applied");
        assert_eq!(body["outcome"]["revision"], 1);
        assert_eq!(dispatcher.snapshot().revision(), 1);
    }

    #[tokio::test]
    async fn legacy_root_query_is_accepted() {
        let (dispatcher, base) = start().await;

        let (status, body) = get_json(&format!("{base}/?cmd=NOW:Tom+%26+Jerry")).await;

        assert_eq!(status, 200);
        assert_eq!(body["status"], "ok");
        assert_eq!(dispatcher.status().texts.now, "Tom & Jerry");
    }

    #[tokio::test]
    async fn repeated_command_is_unchanged() {
        let (_dispatcher, base) = start().await;

        get_json(&format!("{base}/api/command?cmd=LED2:ON")).await;
        let (_, body) = get_json(&format!("{base}/api/command?cmd=LED2:ON")).await;

        assert_eq!(body["outcome"]["result"], "unchanged");
        assert_eq!(body["outcome"]["revision"], 1);
    }

    #[tokio::test]
    async fn missing_command_is_bad_request() {
        let (_dispatcher, base) = start().await;

        let (status, body) = get_json(&format!("{base}/api/command")).await;

        assert_eq!(status, 400);
        assert_eq!(body["status"], "error");
        assert_eq!(body["error"], "parse");
    }

    #[tokio::test]
    async fn out_of_range_index_is_bad_request() {
        let (dispatcher, base) = start().await;

        let (status, body) = get_json(&format!("{base}/api/command?cmd=LED5:ON")).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "parse");
        assert_eq!(dispatcher.snapshot().revision(), 0);
    }

    #[tokio::test]
    async fn unknown_verb_is_not_found() {
        let (_dispatcher, base) = start().await;

        let (status, body) = get_json(&format!("{base}/api/command?cmd=BOGUS:1")).await;

        assert_eq!(status, 404);
        assert_eq!(body["error"], "unknown_command");
    }

    #[tokio::test]
    async fn failed_commit_lists_every_bad_entry() {
        let (dispatcher, base) = start().await;

        for line in [
            "CONF:General:stationcolor=purple",
            "CONF:Network:udpport=99999",
            "CONF:General:slogan=Fine",
        ] {
            let (status, body) =
                get_json(&format!("{base}/api/command?cmd={}", urlencode(line))).await;
            assert_eq!(status, 200);
            assert_eq!(body["outcome"]["result"], "staged");
        }

        let (status, body) = get_json(&format!("{base}/api/command?cmd=CONF:CONF:APPLY=TRUE")).await;

        assert_eq!(status, 400);
        assert_eq!(body["error"], "commit");
        assert_eq!(body["failures"].as_array().unwrap().len(), 2);
        assert_eq!(dispatcher.snapshot().revision(), 0);
        assert_eq!(
            dispatcher.snapshot().station().slogan,
            DeviceState::new().station().slogan
        );
    }

    fn urlencode(line: &str) -> String {
        line.replace('=', "%3D")
    }
}

// ============================================================================
// Status, Web UI and Fallback
// ============================================================================

mod documents {
    use super::*;

    #[tokio::test]
    async fn status_document_shape() {
        let (dispatcher, base) = start().await;
        dispatcher
            .execute("WARN:1:Traffic", CommandSource::Internal)
            .await
            .unwrap();

        let (status, body) = get_json(&format!("{base}/api/status")).await;

        assert_eq!(status, 200);
        assert_eq!(body["revision"], 1);
        assert_eq!(body["leds"]["1"]["status"], false);
        assert_eq!(body["leds"]["1"]["text"], "ON AIR");
        assert_eq!(body["air"]["3"]["seconds"], 0);
        assert_eq!(body["texts"]["warn"], "Traffic");
        assert_eq!(body["warnings"][0]["priority"], 1);
        assert_eq!(body["distribution"], "OnAirScreen");
    }

    #[tokio::test]
    async fn root_serves_web_ui() {
        let (_dispatcher, base) = start().await;

        for path in ["/", "/index.html"] {
            let response = reqwest::get(format!("{base}{path}")).await.unwrap();
            assert_eq!(response.status().as_u16(), 200);
            let content_type = response.headers()["content-type"].to_str().unwrap().to_string();
            assert!(content_type.starts_with("text/html"));
            assert!(response.text().await.unwrap().contains("/ws"));
        }
    }

    #[tokio::test]
    async fn unknown_path_is_json_not_found() {
        let (_dispatcher, base) = start().await;

        let (status, body) = get_json(&format!("{base}/nothing/here")).await;

        assert_eq!(status, 404);
        assert_eq!(body["error"], "not_found");
    }

    #[tokio::test]
    async fn cors_allows_any_origin() {
        let (_dispatcher, base) = start().await;

        let response = reqwest::Client::new()
            .get(format!("{base}/api/status"))
            .header("Origin", "http://studio.example")
            .send()
            .await
            .unwrap();

        assert_eq!(response.headers()["access-control-allow-origin"], "*");
    }
}

// ============================================================================
// WebSocket Push Channel
// ============================================================================

mod push_channel {
    use super::*;

    type Socket =
        tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

    async fn connect(base: &str) -> Socket {
        let url = format!("{}/ws", base.replacen("http", "ws", 1));
        let (socket, _) = tokio_tungstenite::connect_async(url).await.unwrap();
        socket
    }

    /// Reads the next JSON text frame.
    async fn next_frame(socket: &mut Socket) -> Value {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                let message = socket.next().await.unwrap().unwrap();
                if let Message::Text(text) = message {
                    return serde_json::from_str::<Value>(&text).unwrap();
                }
            }
        })
        .await
        .expect("no frame received")
    }

    #[tokio::test]
    async fn initial_frame_is_full_status() {
        let (_dispatcher, base) = start().await;
        let mut socket = connect(&base).await;

        let frame = next_frame(&mut socket).await;

        assert_eq!(frame["type"], "status");
        assert_eq!(frame["revision"], 0);
        assert_eq!(frame["data"]["leds"]["4"]["text"], "EAS ACTIVE");
    }

    #[tokio::test]
    async fn changes_from_other_transports_are_pushed() {
        let (dispatcher, base) = start().await;
        let mut socket = connect(&base).await;
        next_frame(&mut socket).await;

        dispatcher
            .execute("NOW:Breaking news", CommandSource::Udp)
            .await
            .unwrap();

        let frame = next_frame(&mut socket).await;
        assert_eq!(frame["type"], "status");
        assert_eq!(frame["revision"], 1);
        assert_eq!(frame["data"]["texts"]["now"], "Breaking news");
    }

    #[tokio::test]
    async fn text_frames_are_commands() {
        let (dispatcher, base) = start().await;
        let mut socket = connect(&base).await;
        next_frame(&mut socket).await;

        socket.send(Message::Text("LED3:TOGGLE".into())).await.unwrap();
        socket.send(Message::Text("LED7:ON".into())).await.unwrap();

        let mut results = Vec::new();
        let mut pushed = Vec::new();
        while results.len() < 2 {
            let frame = next_frame(&mut socket).await;
            match frame["type"].as_str() {
                Some("result") => results.push(frame),
                Some("status") => pushed.push(frame),
                other => panic!("unexpected frame type {other:?}"),
            }
        }

        assert_eq!(results[0]["status"], "ok");
        assert_eq!(results[0]["command"], "LED3:TOGGLE");
        assert_eq!(results[0]["outcome"]["result"], "applied");
        assert_eq!(results[1]["status"], "error");
        assert_eq!(results[1]["error"], "parse");
        assert!(dispatcher.snapshot().led(onair_core::LedIndex::new(3).unwrap()).on);
    }
}
