//! Terminal host
//!
//! Opens a document by extension, wires the matching reader to the
//! screen, translates terminal input into reader commands, and keeps
//! the reading session ticking while the app runs.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use crossterm::event::{Event, KeyCode, KeyEvent, MouseEvent, MouseEventKind};
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::{Frame, Terminal};
use unicode_width::UnicodeWidthStr;

use crate::event_source::EventSource;
use crate::input::{
    pinch_zoom, translate_key, Gesture, GestureRecognizer, InputCommand, SwipeDirection,
    TouchPoint, ZoomIntent,
};
use crate::reader::docx::DocxReader;
use crate::reader::epub::EpubReader;
use crate::reader::pdf::PdfReader;
use crate::reader::txt::TxtReader;
use crate::reader::{ReaderSnapshot, StateCallback, StateUpdate};
use crate::session::{JsonSessionStore, SessionStore, SessionTracker};
use crate::settings::Settings;
use crate::theme::{Palette, DARK, LIGHT};

/// Layout units represented by one terminal row.
const UNITS_PER_ROW: f32 = 16.0;

/// Layout units represented by one terminal cell for gesture purposes,
/// so a short mouse drag can cross the swipe threshold.
const GESTURE_CELL_UNITS: f32 = 12.0;

/// Wheel scroll step as a fraction of the viewport.
const WHEEL_SCROLL_FRACTION: f32 = 0.2;

enum Reader {
    Pdf(PdfReader),
    Epub(EpubReader),
    Docx(DocxReader),
    Txt(TxtReader),
}

pub struct App {
    reader: Reader,
    snapshot: Rc<RefCell<ReaderSnapshot>>,
    settings: Settings,
    store: JsonSessionStore,
    session: SessionTracker,
    book_key: String,
    gestures: GestureRecognizer,
    goto_input: Option<String>,
    /// Line scroll for the linear (non-virtualized) readers.
    scroll_line: usize,
    content_rows: u16,
    content_cols: u16,
    dark_mode: bool,
    should_quit: bool,
}

impl App {
    /// Open the document at `path`, picking the reader by extension.
    pub fn open(path: &Path, settings: Settings, store: JsonSessionStore) -> Result<Self> {
        let snapshot: Rc<RefCell<ReaderSnapshot>> = Rc::new(RefCell::new(ReaderSnapshot::default()));
        let sink = snapshot.clone();
        let callback: StateCallback = Box::new(move |update: StateUpdate| {
            sink.borrow_mut().apply(&update);
        });

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        let extension = path
            .extension()
            .map(|e| e.to_ascii_lowercase().to_string_lossy().to_string())
            .unwrap_or_default();

        let viewport_height = 40.0 * UNITS_PER_ROW;
        let reader = match extension.as_str() {
            "pdf" => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Reader::Pdf(open_pdf(
                    &name,
                    bytes,
                    &settings,
                    viewport_height,
                    callback,
                ))
            }
            "epub" => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Reader::Epub(EpubReader::open(bytes, callback))
            }
            "docx" => {
                let bytes = std::fs::read(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Reader::Docx(DocxReader::open(&bytes, callback))
            }
            _ => {
                let text = std::fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?;
                Reader::Txt(TxtReader::open(text, callback))
            }
        };

        let book_key = path.display().to_string();
        let session = SessionTracker::new(
            settings.user.clone(),
            book_key.clone(),
            Duration::from_secs(settings.session_tick_seconds),
        );

        let mut app = Self {
            reader,
            snapshot,
            settings,
            store,
            session,
            book_key,
            gestures: GestureRecognizer::new(),
            goto_input: None,
            scroll_line: 0,
            content_rows: 40,
            content_cols: 80,
            dark_mode: false,
            should_quit: false,
        };
        app.begin_session();
        app.restore_position();
        Ok(app)
    }

    fn begin_session(&mut self) {
        let now = Instant::now();
        self.session.begin(&mut self.store, now);
    }

    fn restore_position(&mut self) {
        let Some(page) = self.store.last_page(&self.settings.user, &self.book_key) else {
            return;
        };
        if page <= 1 {
            return;
        }
        let now = Instant::now();
        match &mut self.reader {
            Reader::Pdf(reader) => reader.navigate_to(page, now),
            Reader::Epub(reader) => reader.go_to_section(page),
            // Linear readers restore nothing: pages are cosmetic
            Reader::Docx(_) | Reader::Txt(_) => {}
        }
    }

    #[must_use]
    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Merged display state, as the host loop sees it.
    #[must_use]
    pub fn snapshot(&self) -> ReaderSnapshot {
        self.snapshot.borrow().clone()
    }

    fn palette(&self) -> Palette {
        if self.dark_mode {
            DARK
        } else {
            LIGHT
        }
    }

    /// Per-frame driver.
    pub fn tick(&mut self, now: Instant) {
        if let Reader::Pdf(reader) = &mut self.reader {
            reader.tick(now);
        }
        let page = self.snapshot.borrow().current_page.max(1);
        self.session.maybe_tick(&mut self.store, now, page);
    }

    /// Close the session; call once when the loop exits.
    pub fn shutdown(&mut self, now: Instant) {
        let page = self.snapshot.borrow().current_page.max(1);
        self.session.finish(&mut self.store, now, page);
    }

    pub fn handle_event(&mut self, event: &Event, now: Instant) {
        match event {
            Event::Key(key) => self.handle_key(key, now),
            Event::Mouse(mouse) => self.handle_mouse(mouse, now),
            Event::Resize(cols, rows) => self.handle_resize(*cols, *rows),
            _ => {}
        }
    }

    fn handle_resize(&mut self, cols: u16, rows: u16) {
        self.content_cols = cols;
        self.content_rows = rows.saturating_sub(2);
        if let Reader::Pdf(reader) = &mut self.reader {
            reader.set_viewport_height(f32::from(self.content_rows) * UNITS_PER_ROW);
        }
    }

    fn handle_key(&mut self, key: &KeyEvent, now: Instant) {
        if self.goto_input.is_some() {
            self.handle_goto_key(key, now);
            return;
        }
        let Some(command) = translate_key(key) else {
            return;
        };
        self.apply_command(command, now);
    }

    fn handle_goto_key(&mut self, key: &KeyEvent, now: Instant) {
        let Some(input) = self.goto_input.as_mut() else {
            return;
        };
        match key.code {
            KeyCode::Char(c) if c.is_ascii_digit() => input.push(c),
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Enter => {
                let target = input.parse::<usize>().ok();
                self.goto_input = None;
                if let Some(page) = target {
                    self.go_to_page(page, now);
                }
            }
            KeyCode::Esc => self.goto_input = None,
            _ => {}
        }
    }

    /// Immediate jump, used for the CLI `--page` override.
    pub fn go_to_page_now(&mut self, page: usize) {
        self.go_to_page(page, Instant::now());
    }

    fn go_to_page(&mut self, page: usize, now: Instant) {
        match &mut self.reader {
            Reader::Pdf(reader) => reader.navigate_to(page, now),
            Reader::Epub(reader) => reader.go_to_section(page),
            // Pages are cosmetic for the linear readers
            Reader::Docx(_) | Reader::Txt(_) => {}
        }
    }

    fn apply_command(&mut self, command: InputCommand, now: Instant) {
        match command {
            InputCommand::Quit => self.should_quit = true,
            InputCommand::GoToPrompt => self.goto_input = Some(String::new()),
            InputCommand::ToggleDarkMode => match &mut self.reader {
                // PDF: invert the rendered pages only, as the renderer
                // itself has no theming
                Reader::Pdf(reader) => reader.toggle_dark_mode(),
                _ => self.dark_mode = !self.dark_mode,
            },
            InputCommand::ScrollBy(fraction) => self.scroll_by_fraction(fraction),
            InputCommand::ScrollTop => self.scroll_top(),
            InputCommand::ScrollBottom => self.scroll_bottom(),
            InputCommand::NextPage => self.next_page(now),
            InputCommand::PrevPage => self.prev_page(now),
            InputCommand::FirstPage => match &mut self.reader {
                Reader::Pdf(reader) => reader.navigate_first(now),
                Reader::Epub(reader) => reader.first_section(),
                Reader::Docx(_) | Reader::Txt(_) => self.scroll_top(),
            },
            InputCommand::LastPage => match &mut self.reader {
                Reader::Pdf(reader) => reader.navigate_last(now),
                Reader::Epub(reader) => reader.last_section(),
                Reader::Docx(_) | Reader::Txt(_) => self.scroll_bottom(),
            },
            InputCommand::ZoomIn => {
                if let Reader::Pdf(reader) = &mut self.reader {
                    reader.zoom_in();
                }
            }
            InputCommand::ZoomOut => {
                if let Reader::Pdf(reader) = &mut self.reader {
                    reader.zoom_out();
                }
            }
        }
    }

    fn handle_mouse(&mut self, mouse: &MouseEvent, now: Instant) {
        let point = TouchPoint::new(
            f32::from(mouse.column) * GESTURE_CELL_UNITS,
            f32::from(mouse.row) * GESTURE_CELL_UNITS,
        );
        match mouse.kind {
            MouseEventKind::ScrollDown => self.scroll_by_fraction(WHEEL_SCROLL_FRACTION),
            MouseEventKind::ScrollUp => self.scroll_by_fraction(-WHEEL_SCROLL_FRACTION),
            MouseEventKind::Down(_) => self.gestures.touch_start(&[point], now),
            MouseEventKind::Drag(_) => {
                self.gestures.touch_move(&[point], now);
            }
            MouseEventKind::Up(_) => {
                if let Some(gesture) = self.gestures.touch_end(now) {
                    self.apply_gesture(gesture, now);
                }
            }
            _ => {}
        }
    }

    fn apply_gesture(&mut self, gesture: Gesture, now: Instant) {
        match gesture {
            Gesture::Swipe(SwipeDirection::Left) => self.next_page(now),
            Gesture::Swipe(SwipeDirection::Right) => self.prev_page(now),
            Gesture::Swipe(_) => {}
            Gesture::DoubleTap => {
                if let Reader::Pdf(reader) = &mut self.reader {
                    reader.zoom_in();
                }
            }
            Gesture::PinchEnd { scale } => match pinch_zoom(scale) {
                Some(ZoomIntent::In) => {
                    if let Reader::Pdf(reader) = &mut self.reader {
                        reader.zoom_in();
                    }
                }
                Some(ZoomIntent::Out) => {
                    if let Reader::Pdf(reader) = &mut self.reader {
                        reader.zoom_out();
                    }
                }
                None => {}
            },
            Gesture::Tap | Gesture::PinchUpdate { .. } => {}
        }
    }

    fn next_page(&mut self, now: Instant) {
        match &mut self.reader {
            Reader::Pdf(reader) => reader.navigate_next(now),
            Reader::Epub(reader) => reader.next_section(),
            Reader::Docx(_) | Reader::Txt(_) => {
                self.scroll_by_fraction(1.0);
            }
        }
    }

    fn prev_page(&mut self, now: Instant) {
        match &mut self.reader {
            Reader::Pdf(reader) => reader.navigate_previous(now),
            Reader::Epub(reader) => reader.previous_section(),
            Reader::Docx(_) | Reader::Txt(_) => {
                self.scroll_by_fraction(-1.0);
            }
        }
    }

    fn linear_line_count(&self) -> usize {
        let width = self.text_width();
        match &self.reader {
            Reader::Epub(reader) => reader.lines().len(),
            Reader::Docx(reader) => reader
                .paragraphs()
                .iter()
                .map(|p| textwrap::wrap(p, width).len().max(1))
                .sum(),
            Reader::Txt(reader) => reader.wrapped_lines(width).len(),
            Reader::Pdf(_) => 0,
        }
    }

    fn scroll_by_fraction(&mut self, fraction: f32) {
        match &mut self.reader {
            Reader::Pdf(reader) => reader.scroll_by_fraction(fraction),
            _ => {
                let step = (fraction * f32::from(self.content_rows)) as isize;
                let max = self
                    .linear_line_count()
                    .saturating_sub(usize::from(self.content_rows));
                self.scroll_line = self
                    .scroll_line
                    .saturating_add_signed(step)
                    .min(max);
                self.report_linear_scroll();
            }
        }
    }

    fn scroll_top(&mut self) {
        match &mut self.reader {
            Reader::Pdf(reader) => reader.scroll_top(),
            _ => {
                self.scroll_line = 0;
                self.report_linear_scroll();
            }
        }
    }

    fn scroll_bottom(&mut self) {
        match &mut self.reader {
            Reader::Pdf(reader) => reader.scroll_bottom(),
            _ => {
                self.scroll_line = self
                    .linear_line_count()
                    .saturating_sub(usize::from(self.content_rows));
                self.report_linear_scroll();
            }
        }
    }

    fn report_linear_scroll(&mut self) {
        let max = self
            .linear_line_count()
            .saturating_sub(usize::from(self.content_rows));
        let fraction = if max == 0 {
            1.0
        } else {
            self.scroll_line as f32 / max as f32
        };
        match &mut self.reader {
            Reader::Docx(reader) => reader.report_scroll(fraction),
            Reader::Txt(reader) => reader.report_scroll(fraction),
            Reader::Epub(_) | Reader::Pdf(_) => {}
        }
    }

    fn text_width(&self) -> usize {
        let usable = f32::from(self.content_cols) * self.settings.margin_ratio;
        (usable as usize).clamp(20, 200)
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let palette = self.palette();
        let area = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(2)])
            .split(area);

        self.content_cols = chunks[0].width.saturating_sub(2);
        let rows = chunks[0].height.saturating_sub(2);
        if rows != self.content_rows {
            self.content_rows = rows;
            if let Reader::Pdf(reader) = &mut self.reader {
                reader.set_viewport_height(f32::from(rows) * UNITS_PER_ROW);
            }
        }

        let content = self.content_lines(usize::from(rows));
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(palette.muted))
            .style(Style::default().bg(palette.background).fg(palette.foreground));
        frame.render_widget(Paragraph::new(content).block(block), chunks[0]);

        self.draw_status(frame, chunks[1], palette);
    }

    fn content_lines(&mut self, rows: usize) -> Vec<Line<'static>> {
        let palette = self.palette();
        if let Some(error) = self.snapshot.borrow().error.clone() {
            return vec![
                Line::default(),
                Line::styled(format!("  {error}"), Style::default().fg(palette.error)),
                Line::styled(
                    "  Press q to close the reader and retry from the shell.",
                    Style::default().fg(palette.muted),
                ),
            ];
        }

        let width = self.text_width();
        match &mut self.reader {
            Reader::Pdf(reader) => {
                // Renderer-level inversion: presentation only, the
                // cached page content is untouched
                let page_palette = if reader.dark_mode() {
                    palette.inverted()
                } else {
                    palette
                };
                pdf_lines(reader, rows, page_palette)
            }
            Reader::Epub(reader) => {
                let lines: Vec<String> = reader.lines().to_vec();
                linear_lines(&lines, self.scroll_line, rows)
            }
            Reader::Docx(reader) => {
                let mut lines = vec![];
                for paragraph in reader.paragraphs() {
                    if paragraph.trim().is_empty() {
                        lines.push(String::new());
                    } else {
                        lines.extend(textwrap::wrap(paragraph, width).into_iter().map(String::from));
                    }
                }
                linear_lines(&lines, self.scroll_line, rows)
            }
            Reader::Txt(reader) => {
                let lines = reader.wrapped_lines(width);
                linear_lines(&lines, self.scroll_line, rows)
            }
        }
    }

    fn draw_status(&self, frame: &mut Frame, area: Rect, palette: Palette) {
        let snapshot = self.snapshot.borrow();
        let mut spans = vec![];

        if let Some(input) = &self.goto_input {
            spans.push(Span::styled(
                format!(" go to page: {input}_ "),
                Style::default()
                    .fg(palette.accent)
                    .add_modifier(Modifier::BOLD),
            ));
        } else if snapshot.is_loading {
            spans.push(Span::styled(" loading… ", Style::default().fg(palette.muted)));
        } else {
            spans.push(Span::styled(
                format!(" {} ", self.document_label()),
                Style::default().fg(palette.foreground),
            ));
            spans.push(Span::styled(
                format!(
                    "· page {}/{} · {:.0}% ",
                    snapshot.current_page.max(1),
                    snapshot.total_pages.max(1),
                    snapshot.progress
                ),
                Style::default().fg(palette.accent),
            ));
            if let Reader::Pdf(reader) = &self.reader {
                spans.push(Span::styled(
                    format!("· zoom {}% ", reader.zoom().percent()),
                    Style::default().fg(palette.muted),
                ));
                if reader.is_navigating(Instant::now()) {
                    spans.push(Span::styled("· navigating ", Style::default().fg(palette.muted)));
                }
                if let Some(fraction) = reader.preload_fraction() {
                    if fraction < 1.0 {
                        spans.push(Span::styled(
                            format!("· measuring {:.0}% ", fraction * 100.0),
                            Style::default().fg(palette.muted),
                        ));
                    }
                }
            }
        }

        let help = "j/k scroll · n/p page · g/G ends · : goto · +/- zoom · d theme · q quit";
        let line = Line::from(spans);
        let status = Paragraph::new(vec![
            line,
            Line::styled(format!(" {help}"), Style::default().fg(palette.muted)),
        ])
        .style(Style::default().bg(palette.background));
        frame.render_widget(status, area);
    }

    fn document_label(&self) -> String {
        let label = match &self.reader {
            Reader::Pdf(reader) => reader.title().unwrap_or_else(|| reader.name().to_string()),
            Reader::Epub(reader) => reader.title().unwrap_or("EPUB").to_string(),
            Reader::Docx(_) => "DOCX".to_string(),
            Reader::Txt(_) => "TXT".to_string(),
        };
        if label.width() > 40 {
            let truncated: String = label.chars().take(37).collect();
            format!("{truncated}…")
        } else {
            label
        }
    }
}

fn linear_lines(lines: &[String], scroll_line: usize, rows: usize) -> Vec<Line<'static>> {
    lines
        .iter()
        .skip(scroll_line)
        .take(rows)
        .map(|l| Line::raw(l.clone()))
        .collect()
}

/// Flatten the visible window into terminal lines, entering the first
/// page at the fraction the scroll offset sits at.
fn pdf_lines(reader: &mut PdfReader, rows: usize, palette: Palette) -> Vec<Line<'static>> {
    let offset = reader.scroll_offset();
    let pages = reader.visible_pages();
    let mut out: Vec<Line<'static>> = vec![];

    for visible in pages {
        if out.len() >= rows {
            break;
        }
        // Entirely above the viewport
        if visible.top + visible.height <= offset {
            continue;
        }

        let header_style = Style::default().fg(palette.muted);
        match visible.content {
            Some(content) => {
                let mut lines = content.lines.clone();
                if visible.top < offset && visible.height > 0.0 {
                    let fraction = (offset - visible.top) / visible.height;
                    let skip = (fraction * lines.len() as f32) as usize;
                    lines.drain(..skip.min(lines.len()));
                } else {
                    out.push(Line::styled(
                        format!("── page {} ──", visible.page),
                        header_style,
                    ));
                }
                out.extend(lines.into_iter().map(Line::raw));
            }
            None => {
                out.push(Line::styled(
                    format!("── page {} (unavailable) ──", visible.page),
                    header_style,
                ));
            }
        }
    }

    out.truncate(rows);
    out
}

#[cfg(feature = "pdf")]
fn open_pdf(
    name: &str,
    bytes: Vec<u8>,
    settings: &Settings,
    viewport_height: f32,
    callback: StateCallback,
) -> PdfReader {
    use crate::reader::pdf::{MupdfSource, PdfOptions, PdfSource};

    let source = MupdfSource::open(bytes).map(|s| Box::new(s) as Box<dyn PdfSource>);
    PdfReader::with_options(
        name,
        source,
        PdfOptions {
            zoom_percent: settings.default_zoom_percent,
            viewport_height,
            scroll_buffer: settings.scroll_buffer,
            nav_buffer: settings.nav_buffer,
            preload_min_pages: settings.preload_min_pages,
            preload_batch: settings.preload_batch,
            ..PdfOptions::default()
        },
        callback,
    )
}

#[cfg(not(feature = "pdf"))]
fn open_pdf(
    name: &str,
    _bytes: Vec<u8>,
    settings: &Settings,
    viewport_height: f32,
    callback: StateCallback,
) -> PdfReader {
    use crate::reader::ReaderError;

    PdfReader::from_source(
        name,
        Err(ReaderError::PdfLoad {
            detail: "PDF support is not compiled in".to_string(),
        }),
        settings.default_zoom_percent,
        viewport_height,
        callback,
    )
}

/// Main loop, parameterized over the event source so tests can script
/// input.
pub fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    app: &mut App,
    events: &mut dyn EventSource,
) -> Result<()>
where
    <B as ratatui::backend::Backend>::Error: Send + Sync + 'static,
{
    let tick_rate = Duration::from_millis(50);

    loop {
        let now = Instant::now();
        app.tick(now);
        terminal.draw(|f| app.draw(f))?;

        if events.poll(tick_rate)? {
            let event = events.read()?;
            app.handle_event(&event, Instant::now());
        }

        if app.should_quit() {
            break;
        }
    }

    app.shutdown(Instant::now());
    Ok(())
}
