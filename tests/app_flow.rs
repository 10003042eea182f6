//! Host-loop component tests with a scripted event source.

use folio::app::{run_app, App};
use folio::event_source::SimulatedEventSource;
use folio::session::JsonSessionStore;
use folio::settings::Settings;
use ratatui::backend::TestBackend;
use ratatui::Terminal;

#[test]
fn txt_document_scrolls_to_the_end_and_quits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("notes.txt");
    std::fs::write(&path, "hello world\n".repeat(500)).unwrap();

    let mut app = App::open(&path, Settings::default(), JsonSessionStore::ephemeral()).unwrap();
    let backend = TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    let mut events = SimulatedEventSource::new(vec![
        SimulatedEventSource::char_key('j'),
        SimulatedEventSource::char_key('j'),
        SimulatedEventSource::char_key('G'),
        SimulatedEventSource::char_key('q'),
    ]);

    run_app(&mut terminal, &mut app, &mut events).unwrap();

    assert!(app.should_quit());
    let snapshot = app.snapshot();
    assert!(snapshot.total_pages >= 1);
    assert!(!snapshot.is_loading);
    assert!(snapshot.error.is_none());
    // 'G' reached the bottom of the flowed column
    assert!((snapshot.progress - 100.0).abs() < 0.5);
}

#[test]
fn unreadable_pdf_surfaces_a_load_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.pdf");
    std::fs::write(&path, b"this is not a pdf").unwrap();

    let app = App::open(&path, Settings::default(), JsonSessionStore::ephemeral()).unwrap();
    let snapshot = app.snapshot();
    assert!(!snapshot.is_loading);
    assert!(snapshot.error.is_some());
}

#[test]
fn goto_prompt_jumps_in_an_epub_free_world() {
    // Plain text: page numbers are cosmetic, so the prompt resolves to
    // a no-op rather than an error
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("plain.txt");
    std::fs::write(&path, "word ".repeat(2000)).unwrap();

    let mut app = App::open(&path, Settings::default(), JsonSessionStore::ephemeral()).unwrap();
    let backend = TestBackend::new(80, 24);
    let mut terminal = Terminal::new(backend).unwrap();
    let mut events = SimulatedEventSource::new(vec![
        SimulatedEventSource::char_key(':'),
        SimulatedEventSource::char_key('3'),
        SimulatedEventSource::key_event(
            folio::event_source::KeyCode::Enter,
            folio::event_source::KeyModifiers::empty(),
        ),
        SimulatedEventSource::char_key('q'),
    ]);

    run_app(&mut terminal, &mut app, &mut events).unwrap();
    assert!(app.should_quit());
    assert!(app.snapshot().error.is_none());
}
