// ABOUTME: Viewer console TUI
// ABOUTME: Read-only now-playing display driven entirely by replicated state

use crate::console::format_time;
use crate::protocol::messages::MediaKind;
use crate::session::SyncSession;
use crossterm::event::{self, Event, KeyCode};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Viewer console application state
pub struct ViewerConsole {
    session: Arc<SyncSession>,
    should_quit: bool,
}

impl ViewerConsole {
    /// Create a console observing the given session
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self {
            session,
            should_quit: false,
        }
    }

    /// Run the console loop until the user quits
    pub fn run<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut ratatui::Terminal<B>,
    ) -> io::Result<()> {
        loop {
            terminal.draw(|f| self.ui(f))?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if matches!(key.code, KeyCode::Char('q') | KeyCode::Esc) {
                        self.should_quit = true;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn ui(&self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Min(8),    // Now playing
                Constraint::Length(3), // Progress
                Constraint::Length(3), // Status
            ])
            .split(f.area());

        self.render_now_playing(f, chunks[0]);
        self.render_progress(f, chunks[1]);
        self.render_status(f, chunks[2]);
    }

    fn render_now_playing(&self, f: &mut Frame, area: Rect) {
        let state = self.session.engine().playback_state();
        let active = self.session.engine().active_item();

        let text = match &active {
            Some(item) => {
                let kind_line = match item.kind {
                    MediaKind::Image => Line::from(Span::styled(
                        "Panoramic image",
                        Style::default().fg(Color::Blue),
                    )),
                    MediaKind::Video if state.is_playing => Line::from(Span::styled(
                        "Playing",
                        Style::default().fg(Color::Green),
                    )),
                    MediaKind::Video => Line::from(Span::styled(
                        "Paused",
                        Style::default().fg(Color::Yellow),
                    )),
                };
                vec![
                    Line::from(""),
                    Line::from(Span::styled(
                        item.title.clone(),
                        Style::default().add_modifier(Modifier::BOLD),
                    )),
                    Line::from(""),
                    kind_line,
                ]
            }
            None => vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Awaiting content...",
                    Style::default().add_modifier(Modifier::BOLD),
                )),
                Line::from(""),
                Line::from(Span::styled(
                    "The admin controls playback",
                    Style::default().fg(Color::DarkGray),
                )),
            ],
        };

        let paragraph = Paragraph::new(text)
            .centered()
            .block(
                Block::default()
                    .title(format!("ViewSync — {}", self.session.display_name()))
                    .borders(Borders::ALL)
                    .border_style(Style::default().fg(Color::Green)),
            );

        f.render_widget(paragraph, area);
    }

    fn render_progress(&self, f: &mut Frame, area: Rect) {
        let state = self.session.engine().playback_state();
        let active = self.session.engine().active_item();

        let (ratio, label) = match &active {
            Some(item) if item.kind == MediaKind::Video && item.duration_seconds > 0.0 => {
                let ratio = (state.position_seconds / item.duration_seconds).clamp(0.0, 1.0);
                let label = format!(
                    "{} / {}",
                    format_time(state.position_seconds),
                    format_time(item.duration_seconds)
                );
                (ratio, label)
            }
            Some(item) if item.kind == MediaKind::Video => {
                (0.0, format_time(state.position_seconds))
            }
            _ => (0.0, String::new()),
        };

        let gauge = Gauge::default()
            .block(Block::default().borders(Borders::ALL))
            .gauge_style(Style::default().fg(Color::Cyan))
            .ratio(ratio)
            .label(label);

        f.render_widget(gauge, area);
    }

    fn render_status(&self, f: &mut Frame, area: Rect) {
        let mut spans = Vec::new();

        if self.session.is_online() {
            spans.push(Span::styled("● synchronized", Style::default().fg(Color::Green)));
        } else {
            spans.push(Span::styled("● local mode", Style::default().fg(Color::Yellow)));
            spans.push(Span::styled(
                "  (offline sync active)",
                Style::default().fg(Color::DarkGray),
            ));
        }

        spans.push(Span::styled(
            format!("   {} devices", self.session.tracker().device_count()),
            Style::default().fg(Color::DarkGray),
        ));
        spans.push(Span::styled(
            "   press q to quit",
            Style::default().fg(Color::DarkGray),
        ));

        let paragraph = Paragraph::new(Line::from(spans)).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

        f.render_widget(paragraph, area);
    }
}
