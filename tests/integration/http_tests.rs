//! Integration tests for the HTTP inference transport: telemetry goes out
//! as a POST and the server's reply drives the actuator on the next pass.

use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};

use aiotnode::adapters::http::HttpTransport;
use aiotnode::app::commands::CommandSource;
use aiotnode::app::events::AppEvent;
use aiotnode::app::service::{AppService, TickResult};
use aiotnode::config::{ClassifierModel, DeviceConfig};
use aiotnode::error::PublishError;
use aiotnode::link::codec::decode_telemetry;
use aiotnode::link::{LinkEvent, MessagingLink};

use crate::mock_hw::{ActuatorCall, MockHardware, RecordingDisplay, RecordingSink};

/// Serves `replies.len()` requests in order; yields each request body.
fn inference_server(replies: &'static [&'static str]) -> (String, JoinHandle<Vec<Vec<u8>>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("http://{}/infer", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut bodies = Vec::new();
        for reply in replies {
            let (mut stream, _) = listener.accept().unwrap();
            let mut request = Vec::new();
            let mut chunk = [0u8; 1024];
            let body = loop {
                let n = stream.read(&mut chunk).unwrap();
                request.extend_from_slice(&chunk[..n]);
                let Some(end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
                    assert!(n > 0, "request ended early");
                    continue;
                };
                let head = String::from_utf8_lossy(&request[..end]).to_ascii_lowercase();
                let length: usize = head
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .map_or(0, |v| v.trim().parse().unwrap());
                if request.len() >= end + 4 + length {
                    break request[end + 4..end + 4 + length].to_vec();
                }
                assert!(n > 0, "request ended early");
            };
            let response = format!(
                "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                 Content-Length: {}\r\nConnection: close\r\n\r\n{reply}",
                reply.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
            bodies.push(body);
        }
        bodies
    });
    (url, handle)
}

fn config() -> DeviceConfig {
    DeviceConfig {
        model: ClassifierModel::two_feature(),
        ..DeviceConfig::default()
    }
}

#[test]
fn server_prediction_drives_actuator_on_next_pass() {
    let (url, server) = inference_server(&[
        r#"{"temperature":25.0,"humidity":50.0,"prediction":1,"probability":0.91,"action":"ON"}"#,
    ]);
    let config = config();
    let mut app = AppService::new(&config, 0);
    let mut hw = MockHardware::new(25.0, 50.0);
    let mut link = MessagingLink::new(HttpTransport::new(&url, &config.topics), &config);
    let mut screen = RecordingDisplay::new();
    let mut sink = RecordingSink::new();
    app.start(&mut hw, &mut screen);

    let out = app.run_pass(0, &mut hw, &mut link, &mut screen, &mut sink);
    assert_eq!(out.link_event, Some(LinkEvent::Connected));

    // Local inference says NORMAL; the POST happens during this tick.
    let out = app.run_pass(3_000, &mut hw, &mut link, &mut screen, &mut sink);
    assert_eq!(out.tick, TickResult::Published);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Set(false)));
    assert_eq!(link.transport().pending_replies(), 1);

    // The reply is dispatched like a broker control frame.
    let out = app.run_pass(3_050, &mut hw, &mut link, &mut screen, &mut sink);
    assert_eq!(out.frames, 1);
    assert_eq!(hw.last_call(), Some(ActuatorCall::Set(true)));
    assert_eq!(screen.bottom(), "CMD:ON");
    assert_eq!(
        sink.count(|e| *e
            == AppEvent::CommandApplied {
                on: true,
                source: CommandSource::Prediction
            }),
        1
    );

    let bodies = server.join().unwrap();
    assert_eq!(bodies.len(), 1);
    let record = decode_telemetry(&bodies[0]).unwrap();
    assert_eq!(record.device_id.as_str(), "esp32-aiot-demo");
    assert_eq!(record.timestamp, 3_000);
    assert_eq!((record.temperature, record.humidity), (25.0, 50.0));
    assert_eq!(record.label.as_str(), "NORMAL");
}

#[test]
fn unreachable_server_fails_the_tick_and_reconnects() {
    let port = TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port();
    let url = format!("http://127.0.0.1:{port}/infer");
    let config = config();
    let mut app = AppService::new(&config, 0);
    let mut hw = MockHardware::new(20.0, 90.0);
    let mut link = MessagingLink::new(HttpTransport::new(&url, &config.topics), &config);
    let mut screen = RecordingDisplay::new();
    let mut sink = RecordingSink::new();

    app.run_pass(0, &mut hw, &mut link, &mut screen, &mut sink);
    let out = app.run_pass(3_000, &mut hw, &mut link, &mut screen, &mut sink);
    assert_eq!(out.tick, TickResult::PublishFailed(PublishError::Io));
    // Local control still acted.
    assert_eq!(hw.last_call(), Some(ActuatorCall::Set(true)));

    app.run_pass(3_050, &mut hw, &mut link, &mut screen, &mut sink);
    assert!(!link.is_connected());
    assert_eq!(sink.count(|e| *e == AppEvent::Link(LinkEvent::ConnectionLost)), 1);

    let out = app.run_pass(3_100, &mut hw, &mut link, &mut screen, &mut sink);
    assert_eq!(out.link_event, Some(LinkEvent::Connected));
}
