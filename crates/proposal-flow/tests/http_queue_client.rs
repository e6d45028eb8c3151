use std::time::Duration;

use proposal_flow::queue::{HttpQueueClient, QueueClient, QueueError};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const QUEUE_PATH: &str = "/000000000000/proposals";

const RECEIVE_RESPONSE: &str = r#"<?xml version="1.0"?>
<ReceiveMessageResponse xmlns="http://queue.amazonaws.com/doc/2012-11-05/">
  <ReceiveMessageResult>
    <Message>
      <MessageId>a1b2c3</MessageId>
      <ReceiptHandle>handle-1</ReceiptHandle>
      <MD5OfBody>ignored</MD5OfBody>
      <Body>{&quot;event_type&quot;:&quot;ProposalCreated&quot;}</Body>
    </Message>
  </ReceiveMessageResult>
  <ResponseMetadata>
    <RequestId>req-1</RequestId>
  </ResponseMetadata>
</ReceiveMessageResponse>"#;

async fn client(server: &MockServer) -> HttpQueueClient {
    HttpQueueClient::new(
        format!("{}{}", server.uri(), QUEUE_PATH),
        Duration::from_secs(2),
    )
    .expect("client builds")
}

#[tokio::test]
async fn poll_requests_a_batch_and_decodes_messages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .and(query_param("Action", "ReceiveMessage"))
        .and(query_param("MaxNumberOfMessages", "10"))
        .and(query_param("WaitTimeSeconds", "1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(RECEIVE_RESPONSE))
        .expect(1)
        .mount(&server)
        .await;

    let messages = client(&server)
        .await
        .poll(10, Duration::from_secs(1))
        .await
        .expect("poll succeeds");

    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].id, "a1b2c3");
    assert_eq!(messages[0].receipt_handle, "handle-1");
    assert_eq!(messages[0].body, r#"{"event_type":"ProposalCreated"}"#);
}

#[tokio::test]
async fn poll_treats_an_empty_result_as_an_empty_batch() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(QUEUE_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "<ReceiveMessageResponse><ReceiveMessageResult/></ReceiveMessageResponse>",
        ))
        .mount(&server)
        .await;

    let messages = client(&server)
        .await
        .poll(10, Duration::ZERO)
        .await
        .expect("poll succeeds");

    assert!(messages.is_empty());
}

#[tokio::test]
async fn send_posts_a_form_encoded_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUEUE_PATH))
        .and(body_string_contains("Action=SendMessage"))
        .and(body_string_contains("MessageBody=%7B%22event_type%22"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<SendMessageResponse/>"))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .send(r#"{"event_type":"DocumentsApproved"}"#.to_string())
        .await
        .expect("send succeeds");
}

#[tokio::test]
async fn acknowledge_deletes_by_receipt_handle() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(QUEUE_PATH))
        .and(body_string_contains("Action=DeleteMessage"))
        .and(body_string_contains("ReceiptHandle=handle-1"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    client(&server)
        .await
        .acknowledge("handle-1")
        .await
        .expect("delete succeeds");
}

#[tokio::test]
async fn non_success_status_is_reported_with_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500).set_body_string("<Error>boom</Error>"))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .poll(10, Duration::ZERO)
        .await
        .expect_err("500 surfaces");

    assert!(err.is_transient());
    match err {
        QueueError::Rejected { status, body } => {
            assert_eq!(status, 500);
            assert!(body.contains("boom"));
        }
        other => panic!("expected rejected status, got {other:?}"),
    }
}

#[tokio::test]
async fn unparseable_receive_body_is_malformed() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<ReceiveMessageResponse><Rec"))
        .mount(&server)
        .await;

    let err = client(&server)
        .await
        .poll(10, Duration::ZERO)
        .await
        .expect_err("garbage surfaces");

    assert!(matches!(err, QueueError::MalformedResponse(_)));
    assert!(!err.is_transient());
}

#[tokio::test]
async fn unreachable_queue_is_unavailable() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let queue_url = format!("http://{}{}", listener.local_addr().expect("addr"), QUEUE_PATH);
    drop(listener);

    let client = HttpQueueClient::new(queue_url, Duration::from_secs(1)).expect("client builds");
    let err = client
        .poll(1, Duration::ZERO)
        .await
        .expect_err("connection refused");

    assert!(matches!(err, QueueError::Unavailable { .. }));
}
