//! SIGINT ends the client binary, both at the prompt and mid-turn.

#![cfg(unix)]

use std::io::{BufRead, BufReader};
use std::net::{TcpListener, TcpStream};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

const EXIT_WAIT: Duration = Duration::from_secs(5);

/// Give the signal watcher time to be registered after startup.
const SETTLE: Duration = Duration::from_millis(500);

fn spawn_client(args: &[&str]) -> Child {
    Command::new(env!("CARGO_BIN_EXE_schema-chat"))
        .args(args)
        .env("RUST_LOG", "info")
        .env_remove("SCHEMA_CHAT_CONFIG")
        .env_remove("SCHEMA_CHAT_ENDPOINT")
        .env_remove("SCHEMA_CHAT_STREAM_ENDPOINT")
        .env_remove("SCHEMA_CHAT_LOG_JSON")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .unwrap()
}

/// Block until the client logs `marker`, draining stderr in the background.
fn wait_for_log(child: &mut Child, marker: &'static str) {
    let stderr = child.stderr.take().unwrap();
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in BufReader::new(stderr).lines().map_while(Result::ok) {
            if line.contains(marker) {
                let _ = tx.send(());
            }
        }
    });
    if rx.recv_timeout(EXIT_WAIT).is_err() {
        let _ = child.kill();
        panic!("client never logged {marker:?}");
    }
    thread::sleep(SETTLE);
}

fn interrupt(child: &Child) {
    let status = Command::new("kill")
        .args(["-INT", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

fn wait_for_exit(child: &mut Child) -> ExitStatus {
    let deadline = Instant::now() + EXIT_WAIT;
    loop {
        if let Some(status) = child.try_wait().unwrap() {
            return status;
        }
        if Instant::now() >= deadline {
            let _ = child.kill();
            panic!("client still running {EXIT_WAIT:?} after SIGINT");
        }
        thread::sleep(Duration::from_millis(50));
    }
}

/// A backend that accepts connections and never answers.
fn silent_backend() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    thread::spawn(move || {
        let mut held: Vec<TcpStream> = Vec::new();
        for stream in listener.incoming().map_while(Result::ok) {
            held.push(stream);
        }
    });
    format!("http://{addr}/chat")
}

#[test]
fn test_sigint_at_prompt_exits() {
    let mut child = spawn_client(&["--endpoint", "http://127.0.0.1:9/chat"]);
    // Stdin stays open, so only the interrupt can end the loop.
    let _stdin = child.stdin.take();

    wait_for_log(&mut child, "Chat session started");
    interrupt(&child);

    assert!(wait_for_exit(&mut child).success());
}

#[test]
fn test_sigint_during_unanswered_turn_exits() {
    let endpoint = silent_backend();
    let mut child = spawn_client(&["--endpoint", &endpoint, "-m", "hello"]);

    wait_for_log(&mut child, "Sending chat turn");
    interrupt(&child);

    assert!(wait_for_exit(&mut child).success());
}

#[test]
fn test_sigint_while_waiting_for_stream_exits() {
    let endpoint = silent_backend();
    let mut child = spawn_client(&[
        "--mode",
        "stream",
        "--stream-endpoint",
        &endpoint,
        "-m",
        "hello",
    ]);

    wait_for_log(&mut child, "Chat session started");
    interrupt(&child);

    assert!(wait_for_exit(&mut child).success());
}
