use quicknote_core::events::feed::{decode_update, FrameOutcome};
use quicknote_core::repo::{NoteRepository, RemoteConfig, RemoteNoteRepository, RepoError};
use quicknote_core::{Note, RemoteChangeFeed};
use serde_json::{json, Value};
use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use uuid::Uuid;

#[derive(Debug)]
struct RecordedRequest {
    request_line: String,
    headers: Vec<(String, String)>,
    body: String,
}

impl RecordedRequest {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Answers one connection per canned `(status, body)` and returns what it saw.
fn serve(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<RecordedRequest>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut recorded = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut request_line = String::new();
            reader.read_line(&mut request_line).unwrap();
            let mut headers = Vec::new();
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                let line = line.trim_end();
                if line.is_empty() {
                    break;
                }
                let (key, value) = line.split_once(':').unwrap();
                headers.push((key.trim().to_string(), value.trim().to_string()));
            }
            let length = headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("content-length"))
                .map_or(0, |(_, value)| value.parse::<usize>().unwrap());
            let mut payload = vec![0; length];
            reader.read_exact(&mut payload).unwrap();

            let mut stream = stream;
            write!(
                stream,
                "HTTP/1.1 {status} STUB\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            )
            .unwrap();
            stream.flush().unwrap();

            recorded.push(RecordedRequest {
                request_line: request_line.trim_end().to_string(),
                headers,
                body: String::from_utf8(payload).unwrap(),
            });
        }
        recorded
    });
    (base_url, handle)
}

fn repository(base_url: &str) -> RemoteNoteRepository {
    let mut config = RemoteConfig::new(base_url, "anon-key");
    config.access_token = Some("user-jwt".to_string());
    config.user_id = Some("user-1".to_string());
    config.timeout_secs = 5;
    RemoteNoteRepository::new(config).unwrap()
}

#[test]
fn search_sends_credentials_and_like_filter() {
    let id = Uuid::new_v4();
    let (base_url, server) = serve(vec![(
        200,
        json!([{ "note_id": id, "note_text": "hello", "user_id": "user-1" }]).to_string(),
    )]);
    let repo = repository(&base_url);

    let notes = repo.search_notes("hel").unwrap();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].note_id, id);
    assert_eq!(notes[0].text(), "hello");

    let requests = server.join().unwrap();
    let request = &requests[0];
    assert!(request
        .request_line
        .starts_with("GET /rest/v1/notes?select=*&note_text=like.*hel* "));
    assert_eq!(request.header("apikey"), Some("anon-key"));
    assert_eq!(request.header("authorization"), Some("Bearer user-jwt"));
}

#[test]
fn empty_search_sends_no_text_filter() {
    let (base_url, server) = serve(vec![(200, "[]".to_string())]);
    let repo = repository(&base_url);

    assert!(repo.search_notes("").unwrap().is_empty());

    let requests = server.join().unwrap();
    assert!(requests[0]
        .request_line
        .starts_with("GET /rest/v1/notes?select=* "));
}

#[test]
fn create_posts_owned_row_and_asks_for_representation() {
    let draft = Note::new_empty();
    let stored = json!([{ "note_id": draft.note_id, "note_text": "", "user_id": "user-1" }]);
    let (base_url, server) = serve(vec![(201, stored.to_string())]);
    let repo = repository(&base_url);

    let created = repo.create_note(&draft).unwrap();
    assert_eq!(created.note_id, draft.note_id);
    assert_eq!(created.user_id.as_deref(), Some("user-1"));

    let requests = server.join().unwrap();
    let request = &requests[0];
    assert!(request.request_line.starts_with("POST /rest/v1/notes "));
    assert_eq!(request.header("prefer"), Some("return=representation"));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body[0]["note_id"], json!(draft.note_id));
    assert_eq!(body[0]["user_id"], "user-1");
}

#[test]
fn update_matching_no_row_is_not_found() {
    let id = Uuid::new_v4();
    let (base_url, server) = serve(vec![(200, "[]".to_string())]);
    let repo = repository(&base_url);

    let err = repo.update_note_text(id, "new text").unwrap_err();
    assert!(matches!(err, RepoError::NotFound(missing) if missing == id));

    let requests = server.join().unwrap();
    let request = &requests[0];
    assert!(request
        .request_line
        .starts_with(&format!("PATCH /rest/v1/notes?note_id=eq.{id} ")));
    let body: Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body, json!({ "note_text": "new text" }));
}

#[test]
fn error_status_is_reported_with_body() {
    let (base_url, server) = serve(vec![(401, r#"{"message":"JWT expired"}"#.to_string())]);
    let repo = repository(&base_url);

    match repo.remove_note(Uuid::new_v4()).unwrap_err() {
        RepoError::Remote { status, message } => {
            assert_eq!(status, 401);
            assert!(message.contains("JWT expired"));
        }
        other => panic!("unexpected error: {other}"),
    }
    server.join().unwrap();
}

#[test]
fn feed_accepts_only_updates_on_its_table() {
    let id = Uuid::new_v4();
    let update = json!({
        "event": "postgres_changes",
        "payload": { "data": {
            "table": "notes",
            "type": "UPDATE",
            "record": { "note_id": id, "note_text": "bar" },
            "old_record": { "note_id": id }
        }}
    });
    let decoded = decode_update(&update.to_string(), "notes").unwrap().unwrap();
    assert_eq!(decoded.note_id, id);
    assert_eq!(decoded.new_text(), Some("bar"));

    let insert = json!({
        "event": "postgres_changes",
        "payload": { "data": {
            "table": "notes",
            "type": "INSERT",
            "record": { "note_id": id, "note_text": "" }
        }}
    });
    assert!(decode_update(&insert.to_string(), "notes").unwrap().is_none());
    assert!(decode_update(&update.to_string(), "archive").unwrap().is_none());

    let heartbeat = json!({ "event": "phx_reply", "payload": { "status": "ok" } });
    assert!(decode_update(&heartbeat.to_string(), "notes").unwrap().is_none());
}

#[test]
fn feed_reports_malformed_and_disconnected_frames() {
    let (feed, updates) = RemoteChangeFeed::new("notes");
    assert_eq!(feed.ingest_frame("not json"), FrameOutcome::Malformed);
    assert_eq!(
        feed.ingest_frame(&RemoteChangeFeed::heartbeat_message(7)),
        FrameOutcome::Ignored
    );

    drop(updates);
    let frame = json!({
        "event": "postgres_changes",
        "payload": { "data": {
            "table": "notes",
            "eventType": "UPDATE",
            "record": { "note_id": Uuid::new_v4(), "note_text": "x" }
        }}
    });
    assert_eq!(
        feed.ingest_frame(&frame.to_string()),
        FrameOutcome::Disconnected
    );
}
