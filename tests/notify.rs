// ABOUTME: Integration tests for webhook notification delivery.
// ABOUTME: Posts to a local listener and checks the payload and flush behaviour.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use stagehand::notify::{Notifier, NotifyContext, Severity, WebhookNotifier};
use stagehand::types::EnvironmentId;

/// Accept one request, reply 200, and hand back the raw request text.
async fn capture_one() -> (String, oneshot::Receiver<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    let (tx, rx) = oneshot::channel();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            let text = String::from_utf8_lossy(&request);
            if let Some((head, body)) = text.split_once("\r\n\r\n") {
                let length = head
                    .lines()
                    .find_map(|l| {
                        let (name, value) = l.split_once(':')?;
                        name.eq_ignore_ascii_case("content-length")
                            .then(|| value.trim().parse::<usize>().ok())
                            .flatten()
                    })
                    .unwrap_or(0);
                if body.len() >= length {
                    break;
                }
            }
        }
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 2\r\nconnection: close\r\n\r\nok")
            .await
            .unwrap();
        let _ = tx.send(String::from_utf8_lossy(&request).into_owned());
    });

    (url, rx)
}

#[tokio::test]
async fn posts_slack_payload_and_flushes() {
    let (url, received) = capture_one().await;
    let notifier = WebhookNotifier::new(url, Some("#deploys".to_string()));
    let ctx = NotifyContext::new("shop-api", "117");

    notifier.notify(ctx.stage(
        Severity::Warning,
        Some(EnvironmentId::Staging),
        "shop-api build 117 is waiting for approval",
    ));
    notifier.flush(Duration::from_secs(5)).await;

    let request = tokio::time::timeout(Duration::from_secs(5), received)
        .await
        .unwrap()
        .unwrap();
    assert!(request.starts_with("POST /hook"));
    let body = request.split_once("\r\n\r\n").unwrap().1;
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["channel"], "#deploys");
    assert_eq!(json["attachments"][0]["color"], "warning");
    assert_eq!(
        json["attachments"][0]["text"],
        "shop-api build 117 is waiting for approval"
    );
}

#[tokio::test]
async fn unreachable_webhook_does_not_fail_the_caller() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/hook", listener.local_addr().unwrap());
    drop(listener);

    let notifier = WebhookNotifier::new(url, None);
    let ctx = NotifyContext::new("shop-api", "117");
    notifier.notify(ctx.stage(Severity::Danger, None, "deployment to staging failed"));
    notifier.flush(Duration::from_secs(5)).await;
}
