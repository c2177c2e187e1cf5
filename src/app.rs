use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::time::{Duration, Instant};

use crate::clipboard::{ClipboardSink, SystemClipboard};
use crate::editor::Editor;
use crate::exchange::Exchange;
use crate::gemini::{CompletionClient, GeminiClient};

/// How long a status message stays on the status line
const STATUS_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Editor,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Popup {
    None,
    Help,
}

pub struct App<C = GeminiClient> {
    pub focus: Focus,
    pub popup: Popup,

    pub exchange: Exchange<C>,
    pub editor: Editor,

    /// Model name shown in the navbar
    pub model: String,

    // Status message (auto-clears after STATUS_TIMEOUT)
    pub status_message: Option<String>,
    pub status_message_time: Option<Instant>,

    clipboard: Box<dyn ClipboardSink>,
}

impl<C: CompletionClient> App<C> {
    pub fn new(exchange: Exchange<C>, editor: Editor, model: impl Into<String>) -> Self {
        Self {
            focus: Focus::Chat,
            popup: Popup::None,
            exchange,
            editor,
            model: model.into(),
            status_message: None,
            status_message_time: None,
            clipboard: Box::new(SystemClipboard::default()),
        }
    }

    pub fn with_clipboard(mut self, clipboard: Box<dyn ClipboardSink>) -> Self {
        self.clipboard = clipboard;
        self
    }

    /// Set a status message (auto-clears after 3 seconds)
    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = Some(msg.into());
        self.status_message_time = Some(Instant::now());
    }

    /// Apply finished requests and expire the status message
    pub fn tick(&mut self) {
        if self.exchange.poll() && self.exchange.is_code() {
            self.set_status("Code reply: Ctrl+Y copy, Ctrl+E insert into editor");
        }

        if let Some(since) = self.status_message_time {
            if since.elapsed() >= STATUS_TIMEOUT {
                self.status_message = None;
                self.status_message_time = None;
            }
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        if self.popup != Popup::None {
            if matches!(key.code, KeyCode::Esc | KeyCode::F(1) | KeyCode::Enter) {
                self.popup = Popup::None;
            }
            return Ok(());
        }

        match key.code {
            KeyCode::F(1) => {
                self.popup = Popup::Help;
                return Ok(());
            }
            KeyCode::Tab | KeyCode::BackTab => {
                self.focus = match self.focus {
                    Focus::Editor => Focus::Chat,
                    Focus::Chat => Focus::Editor,
                };
                return Ok(());
            }
            _ => {}
        }

        match self.focus {
            Focus::Chat => self.handle_chat_key(key),
            Focus::Editor => self.handle_editor_key(key),
        }
    }

    fn handle_chat_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('y') if ctrl => self.copy_response()?,
            KeyCode::Char('e') if ctrl => self.insert_response(),
            KeyCode::Char(c) if !ctrl => self.exchange.push_char(c),
            KeyCode::Backspace => self.exchange.pop_char(),
            KeyCode::Enter => {
                if self.exchange.is_loading() {
                    self.set_status("Still waiting for the last reply");
                } else if !self.exchange.submit() {
                    self.set_status("Type a prompt first");
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn handle_editor_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);

        match key.code {
            KeyCode::Char('s') if ctrl => {
                let path = self.editor.save()?;
                self.set_status(format!("Saved {}", path.display()));
            }
            KeyCode::Char(c) if !ctrl => self.editor.insert_char(c),
            KeyCode::Enter => self.editor.newline(),
            KeyCode::Backspace => self.editor.backspace(),
            KeyCode::Delete => self.editor.delete(),
            KeyCode::Left => self.editor.move_left(),
            KeyCode::Right => self.editor.move_right(),
            KeyCode::Up => self.editor.move_up(),
            KeyCode::Down => self.editor.move_down(),
            KeyCode::Home => self.editor.home(),
            KeyCode::End => self.editor.end(),
            _ => {}
        }
        Ok(())
    }

    /// Copy is only offered for code replies
    fn copy_response(&mut self) -> Result<()> {
        if !self.exchange.is_code() {
            return Ok(());
        }
        if self.exchange.copy(&mut *self.clipboard)? {
            self.set_status("Copied to clipboard");
        }
        Ok(())
    }

    fn insert_response(&mut self) {
        if !self.exchange.is_code() || self.exchange.response().is_empty() {
            return;
        }
        let code = self.exchange.response().to_string();
        self.editor.insert_str(&code);
        self.focus = Focus::Editor;
        self.set_status("Inserted reply into editor");
    }
}
