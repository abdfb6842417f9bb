//! Terminal virtual keyboard.

use std::collections::HashMap;
use std::io::{self, Write};
use std::time::Duration;

use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, KeyboardEnhancementFlags,
    PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags,
};
use crossterm::{cursor, execute, queue, terminal};

use crate::engine::{EngineHandle, EngineUpdate};
use crate::pitch::transpose_note;

/// Home-row piano layout: semitone offset from the root for each key.
const KEY_OFFSETS: [(char, i32); 13] = [
    ('a', 0),
    ('w', 1),
    ('s', 2),
    ('e', 3),
    ('d', 4),
    ('f', 5),
    ('t', 6),
    ('g', 7),
    ('y', 8),
    ('h', 9),
    ('u', 10),
    ('j', 11),
    ('k', 12),
];

pub const DEFAULT_ROOT: &str = "C4";

pub fn note_for_key(root: &str, key: char) -> Option<String> {
    KEY_OFFSETS
        .iter()
        .find(|(k, _)| *k == key.to_ascii_lowercase())
        .map(|(_, offset)| transpose_note(root, *offset))
}

pub struct KeyboardApp<'a> {
    engine: &'a EngineHandle,
    root: String,
    /// Key -> note it started, so a root change while a key is down still
    /// stops the right note.
    held: HashMap<char, String>,
    /// Set when the terminal reports key releases; otherwise a second press
    /// of a held key stops it.
    reports_release: bool,
    status: String,
    should_quit: bool,
}

impl<'a> KeyboardApp<'a> {
    pub fn new(engine: &'a EngineHandle) -> Self {
        Self {
            engine,
            root: DEFAULT_ROOT.to_string(),
            held: HashMap::new(),
            reports_release: false,
            status: String::new(),
            should_quit: false,
        }
    }

    pub fn run(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        self.reports_release = terminal::supports_keyboard_enhancement().unwrap_or(false);
        if self.reports_release {
            execute!(
                stdout,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
        }

        let result = self.event_loop(&mut stdout);

        if self.reports_release {
            let _ = execute!(stdout, PopKeyboardEnhancementFlags);
        }
        terminal::disable_raw_mode()?;
        println!();
        result
    }

    fn event_loop(&mut self, stdout: &mut io::Stdout) -> io::Result<()> {
        write!(
            stdout,
            "a w s e d f t g y h u j k: play   z/x: octave   ,/.: semitone   space: release all   q: quit\r\n"
        )?;

        while !self.should_quit {
            self.process_engine_updates();
            self.draw(stdout)?;

            if event::poll(Duration::from_millis(16))? {
                if let Event::Key(key) = event::read()? {
                    self.handle_key(key);
                }
            }
        }

        self.engine.release_all();
        Ok(())
    }

    fn process_engine_updates(&mut self) {
        while let Ok(update) = self.engine.update_rx.try_recv() {
            match update {
                EngineUpdate::BackendUnavailable { message } | EngineUpdate::Error { message } => {
                    self.status = message;
                }
                EngineUpdate::Released { .. } => {
                    self.held.clear();
                }
                EngineUpdate::NoteStarted { .. } | EngineUpdate::NoteStopped { .. } => {}
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) {
        if key.kind == KeyEventKind::Repeat {
            return;
        }
        let pressed = key.kind == KeyEventKind::Press;

        match key.code {
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc if pressed => self.should_quit = true,
            KeyCode::Char(' ') if pressed => {
                self.engine.release_all();
                self.held.clear();
            }
            KeyCode::Char('z') if pressed => self.shift_root(-12),
            KeyCode::Char('x') if pressed => self.shift_root(12),
            KeyCode::Char(',') if pressed => self.shift_root(-1),
            KeyCode::Char('.') if pressed => self.shift_root(1),
            KeyCode::Char(c) => {
                let c = c.to_ascii_lowercase();
                if pressed {
                    self.key_down(c);
                } else {
                    self.key_up(c);
                }
            }
            _ => {}
        }
    }

    fn key_down(&mut self, key: char) {
        if self.held.contains_key(&key) {
            if !self.reports_release {
                self.key_up(key);
            }
            return;
        }
        if let Some(note) = note_for_key(&self.root, key) {
            self.engine.play_note(note.clone());
            self.held.insert(key, note);
        }
    }

    fn key_up(&mut self, key: char) {
        if let Some(note) = self.held.remove(&key) {
            self.engine.stop_note(note);
        }
    }

    fn shift_root(&mut self, semitones: i32) {
        self.root = transpose_note(&self.root, semitones);
    }

    fn draw(&self, stdout: &mut io::Stdout) -> io::Result<()> {
        let mut held: Vec<&str> = self.held.values().map(String::as_str).collect();
        held.sort_unstable();

        queue!(
            stdout,
            cursor::MoveToColumn(0),
            terminal::Clear(terminal::ClearType::CurrentLine)
        )?;
        write!(
            stdout,
            "root {:<4} held [{}] {}",
            self.root,
            held.join(" "),
            self.status
        )?;
        stdout.flush()
    }
}
