/// Answer synthesis integration tests
///
/// Runs the full ask path (retrieve, build prompt, call Ollama) against an
/// in-process HTTP server that plays back canned Ollama responses.
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use docqa::chunking::ChunkingParams;
use docqa::config::Config;
use docqa::embedding::HashingProvider;
use docqa::retrieval::{Retriever, RetrieverSettings};
use docqa::session::ChatSession;
use docqa::synthesis::AnswerSynthesizer;
use docqa::DocqaError;

const CPP_DOC: &str = "C++ is a general-purpose programming language created by Bjarne Stroustrup. \
It was first released in 1985 as an extension of the C programming language.";

/// Serve the given (status, body) responses in order; yields request bodies
async fn mock_ollama(responses: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut socket, _) = listener.accept().await.unwrap();

            let mut buffer = Vec::new();
            let mut chunk = [0u8; 4096];
            let request_body = loop {
                let n = socket.read(&mut chunk).await.unwrap();
                if n == 0 {
                    break String::new();
                }
                buffer.extend_from_slice(&chunk[..n]);

                let text = String::from_utf8_lossy(&buffer).into_owned();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let lower = line.to_lowercase();
                            lower
                                .strip_prefix("content-length:")
                                .map(|value| value.trim().to_string())
                        })
                        .and_then(|value| value.parse::<usize>().ok())
                        .unwrap_or(0);
                    let body_start = header_end + 4;
                    if buffer.len() >= body_start + content_length {
                        break String::from_utf8_lossy(&buffer[body_start..body_start + content_length])
                            .into_owned();
                    }
                }
            };
            requests.push(request_body);

            let reply = format!(
                "HTTP/1.1 {} Mock\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(reply.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
        }
        requests
    });

    (base_url, handle)
}

async fn loaded_retriever(temp: &TempDir) -> Arc<Retriever> {
    let path = temp.path().join("C++_Introduction.txt");
    std::fs::write(&path, CPP_DOC).unwrap();

    let retriever = Retriever::new(
        Arc::new(HashingProvider::new(128).unwrap()),
        RetrieverSettings::default(),
    );
    retriever
        .load(&path, ChunkingParams::new(100, 20).unwrap())
        .await
        .unwrap();
    Arc::new(retriever)
}

fn llm_config(base_url: &str) -> Config {
    let mut config = Config::default();
    config.llm.enabled = true;
    config.llm.base_url = base_url.to_string();
    config.llm.timeout = "5s".to_string();
    config.llm.retry_backoff = "10ms".to_string();
    config
}

#[tokio::test]
async fn test_ask_sends_grounded_prompt() {
    let temp = TempDir::new().unwrap();
    let (base_url, server) = mock_ollama(vec![(
        200,
        r#"{"model":"gemma2:2b","response":"C++ was created by Bjarne Stroustrup.","done":true}"#,
    )])
    .await;

    let config = llm_config(&base_url);
    let synthesizer = Arc::new(AnswerSynthesizer::from_config(&config.llm).unwrap());
    let mut session = ChatSession::new(loaded_retriever(&temp).await, Some(synthesizer), 2);

    let answer = session.ask("Who created C++?").await.unwrap();
    assert_eq!(
        answer.answer.as_deref(),
        Some("C++ was created by Bjarne Stroustrup.")
    );
    assert_eq!(answer.sources.len(), 2);

    let requests = server.await.unwrap();
    let sent: serde_json::Value = serde_json::from_str(&requests[0]).unwrap();
    let prompt = sent["prompt"].as_str().unwrap();

    assert_eq!(sent["model"], "gemma2:2b");
    assert_eq!(sent["stream"], false);
    assert!(prompt.contains("using ONLY the provided context"));
    assert!(prompt.ends_with("Question:\nWho created C++?\nAnswer:"));

    // Context chunks appear in retrieved order, separated by blank lines
    let expected_context = format!(
        "Context:\n{}\n\n{}\n",
        answer.sources[0].text(),
        answer.sources[1].text()
    );
    assert!(prompt.contains(&expected_context));
}

#[tokio::test]
async fn test_transient_failure_retried_once() {
    let temp = TempDir::new().unwrap();
    let (base_url, server) = mock_ollama(vec![
        (503, r#"{"error":"loading model"}"#),
        (200, r#"{"response":"Bjarne Stroustrup.","done":true}"#),
    ])
    .await;

    let config = llm_config(&base_url);
    let synthesizer = Arc::new(AnswerSynthesizer::from_config(&config.llm).unwrap());
    let mut session = ChatSession::new(loaded_retriever(&temp).await, Some(synthesizer), 1);

    let answer = session.ask("Who created C++?").await.unwrap();
    assert_eq!(answer.answer.as_deref(), Some("Bjarne Stroustrup."));
    assert_eq!(server.await.unwrap().len(), 2);
}

#[tokio::test]
async fn test_unreachable_backend() {
    let temp = TempDir::new().unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    drop(listener);

    let config = llm_config(&base_url);
    let synthesizer = Arc::new(AnswerSynthesizer::from_config(&config.llm).unwrap());
    let retriever = loaded_retriever(&temp).await;

    let mut strict = ChatSession::new(retriever.clone(), Some(synthesizer.clone()), 1);
    let err = strict.ask("Who created C++?").await.unwrap_err();
    assert!(matches!(err, DocqaError::Generation(_)));
    assert!(err.is_retryable());

    let mut lenient =
        ChatSession::new(retriever, Some(synthesizer), 1).with_degrade_to_retrieval(true);
    let answer = lenient.ask("Who created C++?").await.unwrap();
    assert!(answer.degraded);
    assert_eq!(answer.sources.len(), 1);
}

#[tokio::test]
async fn test_history_sent_on_follow_up() {
    let temp = TempDir::new().unwrap();
    let (base_url, server) = mock_ollama(vec![
        (200, r#"{"response":"Bjarne Stroustrup."}"#),
        (200, r#"{"response":"In 1985."}"#),
    ])
    .await;

    let config = llm_config(&base_url);
    let synthesizer = Arc::new(AnswerSynthesizer::from_config(&config.llm).unwrap());
    let mut session = ChatSession::new(loaded_retriever(&temp).await, Some(synthesizer), 1);

    session.ask("Who created C++?").await.unwrap();
    let follow_up = tokio::time::timeout(Duration::from_secs(10), session.ask("When was it released?"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(follow_up.answer.as_deref(), Some("In 1985."));

    let requests = server.await.unwrap();
    let second: serde_json::Value = serde_json::from_str(&requests[1]).unwrap();
    assert!(second["prompt"]
        .as_str()
        .unwrap()
        .contains("User: Who created C++?\nAssistant: Bjarne Stroustrup.\n"));
}
