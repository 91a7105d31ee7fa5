use std::net::SocketAddr;

use clap::Parser;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use wifirgb_light::{Animator, App, Config, Effect, FrameLog, Rgb, SimulatedStrip};

async fn start(args: &[&str]) -> (SocketAddr, Animator, FrameLog) {
    let mut argv = vec!["wifirgb", "--address", "127.0.0.1:0", "--leds", "5", "--hostname", "lamp"];
    argv.extend_from_slice(args);
    let config = Config::try_parse_from(argv).unwrap();

    let strip = SimulatedStrip::new(config.leds);
    let frames = strip.frames();
    let app = App::new(&config, strip).unwrap();
    let animator = app.animator().clone();
    let listener = app.server().bind().unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(app.serve(listener));

    (addr, animator, frames)
}

async fn send(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();
    response
}

fn body(response: &str) -> &str {
    response.split_once("\r\n\r\n").map_or("", |(_, body)| body)
}

#[tokio::test]
async fn get_rgb_reports_the_color_state() {
    let (addr, animator, _frames) = start(&[]).await;
    animator.set_color(Rgb::new(10, 20, 30)).await.unwrap();

    let response = send(addr, "GET /rgb HTTP/1.1\r\nHost: lamp\r\n\r\n").await;

    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(response.contains(concat!("Server: lamp wifirgb/", env!("CARGO_PKG_VERSION"), "\r\n")));
    assert!(response.contains("Content-Length: 22\r\n"));
    assert!(response.contains("Connection: close\r\n"));
    assert_eq!(body(&response), r#"{"r":10,"g":20,"b":30}"#);
}

#[tokio::test]
async fn post_rgb_stops_the_effect_and_sets_the_color() {
    let (addr, animator, frames) = start(&[]).await;
    animator.run_effect(Effect::Rainbow).await;

    let payload = r#"{"r":1,"g":2,"b":3}"#;
    let request = format!("POST /rgb HTTP/1.1\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{payload}", payload.len());
    let response = send(addr, &request).await;

    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(response.contains("ETag: \"{\"r\":1,\"g\":2,\"b\":3}\"\r\n"));
    assert_eq!(body(&response), "");
    assert_eq!(animator.active().await, None);
    assert_eq!(animator.color(), Rgb::new(1, 2, 3));
    assert_eq!(frames.last().unwrap(), vec![Rgb::new(1, 2, 3); 5]);
}

#[tokio::test]
async fn basic_auth_gates_every_route() {
    let (addr, animator, _frames) = start(&["--username", "admin", "--password", "secret"]).await;
    animator.set_color(Rgb::new(4, 5, 6)).await.unwrap();

    let response = send(addr, "GET /rgb HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
    assert!(response.contains("WWW-Authenticate: Basic realm=\"wifirgb\"\r\n"));

    let response = send(addr, "POST /off HTTP/1.1\r\nAuthorization: Basic d3Jvbmc6d3Jvbmc=\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 401 Unauthorized\r\n"));
    assert_eq!(animator.color(), Rgb::new(4, 5, 6));

    let response = send(addr, "GET /rgb HTTP/1.1\r\nAuthorization: Basic YWRtaW46c2VjcmV0\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(body(&response), r#"{"r":4,"g":5,"b":6}"#);
}

#[tokio::test]
async fn malformed_request_line_closes_silently() {
    let (addr, animator, _frames) = start(&[]).await;
    animator.set_color(Rgb::new(9, 9, 9)).await.unwrap();

    let response = send(addr, "POST /off\r\n\r\n").await;

    assert!(response.is_empty());
    assert_eq!(animator.color(), Rgb::new(9, 9, 9));
}

#[tokio::test]
async fn unknown_routes_are_not_found() {
    let (addr, _animator, _frames) = start(&[]).await;

    let response = send(addr, "GET /nothing-here HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
    assert_eq!(body(&response), "404 Not Found");

    let response = send(addr, "GET /rgb?fresh=1 HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 404 Not Found\r\n"));
}

#[tokio::test]
async fn effects_and_timer_over_http() {
    let (addr, animator, _frames) = start(&[]).await;

    let response = send(addr, "POST /breathe HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert_eq!(body(&send(addr, "GET /effect HTTP/1.1\r\n\r\n").await), r#"{"effect":"breathe"}"#);

    let payload = r#"{"seconds":600}"#;
    let request = format!("POST /timer HTTP/1.1\r\nContent-Length: {}\r\n\r\n{payload}", payload.len());
    assert!(send(addr, &request).await.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert!(animator.shutdown_remaining() > 590);

    let response = send(addr, "POST /off HTTP/1.1\r\n\r\n").await;
    assert!(response.starts_with("HTTP/1.1 204 No Content\r\n"));
    assert_eq!(body(&send(addr, "GET /effect HTTP/1.1\r\n\r\n").await), r#"{"effect":null}"#);
    assert_eq!(animator.color(), Rgb::BLACK);
}

#[tokio::test]
async fn invalid_json_is_a_bad_request() {
    let (addr, animator, _frames) = start(&[]).await;
    animator.set_color(Rgb::new(3, 3, 3)).await.unwrap();

    let payload = r#"{"r":256,"g":0,"b":0}"#;
    let request = format!("POST /rgb HTTP/1.1\r\nContent-Length: {}\r\n\r\n{payload}", payload.len());
    let response = send(addr, &request).await;

    assert!(response.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_eq!(animator.color(), Rgb::new(3, 3, 3));
}
