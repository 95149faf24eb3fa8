use quicknote_core::db::open_db_in_memory;
use quicknote_core::repo::{NoteRepository, RepoError, RepoResult, SqliteNoteRepository};
use quicknote_core::{ChangeBus, Note, NoteEvent, NoteId, NoteService, NoteServiceError};
use std::sync::Arc;
use uuid::Uuid;

struct UnreachableRepository;

impl NoteRepository for UnreachableRepository {
    fn backend_name(&self) -> &'static str {
        "unreachable"
    }

    fn search_notes(&self, _pattern: &str) -> RepoResult<Vec<Note>> {
        Err(RepoError::Unavailable("connection refused"))
    }

    fn get_note(&self, _note_id: NoteId) -> RepoResult<Option<Note>> {
        Err(RepoError::Unavailable("connection refused"))
    }

    fn create_note(&self, _note: &Note) -> RepoResult<Note> {
        Err(RepoError::Unavailable("connection refused"))
    }

    fn update_note_text(&self, _note_id: NoteId, _text: &str) -> RepoResult<()> {
        Err(RepoError::Unavailable("connection refused"))
    }

    fn remove_note(&self, _note_id: NoteId) -> RepoResult<()> {
        Err(RepoError::Unavailable("connection refused"))
    }
}

fn sqlite_service() -> NoteService {
    let repo = SqliteNoteRepository::try_new(open_db_in_memory().unwrap()).unwrap();
    NoteService::new(Arc::new(repo), ChangeBus::new())
}

#[test]
fn created_note_is_listed_exactly_once_with_empty_text() {
    let service = sqlite_service();
    let note = service.create().unwrap();

    let all = service.search("");
    assert_eq!(all.iter().filter(|n| n.note_id == note.note_id).count(), 1);
    assert_eq!(all[0].text(), "");
}

#[test]
fn update_then_search_reflects_new_text() {
    let service = sqlite_service();
    let note = service.create().unwrap();

    service.update(note.note_id, "hello world");

    let hits = service.search("lo wo");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].note_id, note.note_id);
    assert_eq!(hits[0].text(), "hello world");
    assert_eq!(service.load(note.note_id).unwrap().text(), "hello world");
}

#[test]
fn search_results_are_subset_of_full_list() {
    let service = sqlite_service();
    for text in ["apple pie", "banana", "pineapple", ""] {
        let note = service.create().unwrap();
        service.update(note.note_id, text);
    }

    let all = service.search("");
    let hits = service.search("apple");
    assert_eq!(all.len(), 4);
    assert_eq!(hits.len(), 2);
    for hit in &hits {
        assert!(hit.text().contains("apple"));
        assert!(all.contains(hit));
    }
    assert!(service.search("cherry").is_empty());
}

#[test]
fn removed_note_disappears_and_second_remove_is_noop() {
    let service = sqlite_service();
    let keep = service.create().unwrap();
    let drop = service.create().unwrap();

    service.remove(drop.note_id);
    service.remove(drop.note_id);

    let ids: Vec<Uuid> = service.search("").iter().map(|n| n.note_id).collect();
    assert_eq!(ids, vec![keep.note_id]);
}

#[test]
fn writes_to_missing_note_are_silent_but_typed_on_try_calls() {
    let service = sqlite_service();
    let missing = Uuid::new_v4();

    service.update(missing, "ghost");
    assert!(service.search("").is_empty());

    let err = service.try_update(missing, "ghost").unwrap_err();
    assert!(matches!(err, NoteServiceError::NoteNotFound(id) if id == missing));
    let err = service.load(missing).unwrap_err();
    assert!(matches!(err, NoteServiceError::NoteNotFound(id) if id == missing));
}

#[test]
fn successful_mutations_publish_one_event_each() {
    let service = sqlite_service();
    let events = service.bus().subscribe();

    let note = service.create().unwrap();
    service.update(note.note_id, "x");
    service.remove(note.note_id);
    service.update(note.note_id, "after delete");

    assert_eq!(
        events.drain(),
        vec![
            NoteEvent::Created(note.note_id),
            NoteEvent::Updated(note.note_id),
            NoteEvent::Deleted(note.note_id),
        ]
    );
}

#[test]
fn repository_file_survives_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.db");

    let id = {
        let repo = SqliteNoteRepository::open(&path).unwrap();
        let service = NoteService::new(Arc::new(repo), ChangeBus::new());
        let note = service.create().unwrap();
        service.update(note.note_id, "persisted");
        note.note_id
    };

    let repo = SqliteNoteRepository::open(&path).unwrap();
    let note = repo.get_note(id).unwrap().unwrap();
    assert_eq!(note.text(), "persisted");
}

#[test]
fn failing_backend_degrades_to_empty_results_and_publishes_nothing() {
    let service = NoteService::new(Arc::new(UnreachableRepository), ChangeBus::new());
    let events = service.bus().subscribe();
    let id = Uuid::new_v4();

    assert!(service.search("").is_empty());
    assert!(service.search("anything").is_empty());
    assert!(service.create().is_none());
    service.update(id, "lost");
    service.remove(id);

    assert!(events.drain().is_empty());
    assert!(matches!(
        service.try_update(id, "lost"),
        Err(NoteServiceError::BackendUnavailable(RepoError::Unavailable(_)))
    ));
    assert!(matches!(
        service.load(id),
        Err(NoteServiceError::BackendUnavailable(_))
    ));
    assert!(events.drain().is_empty());
}
