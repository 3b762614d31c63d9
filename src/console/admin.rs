// ABOUTME: Admin console TUI
// ABOUTME: Playback controls, media library, and live device roster in one dashboard

use crate::console::{format_size, format_time};
use crate::engine::now_millis;
use crate::presence::battery::LOW_BATTERY_THRESHOLD;
use crate::protocol::messages::{DeviceRole, MediaKind};
use crate::session::SyncSession;
use crossterm::event::{self, Event, KeyCode};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph},
    Frame,
};
use std::io;
use std::sync::Arc;
use std::time::Duration;

/// Seconds skipped per seek keypress
const SEEK_STEP: f64 = 10.0;

/// Admin console application state
pub struct AdminConsole {
    session: Arc<SyncSession>,
    selected: usize,
    should_quit: bool,
}

impl AdminConsole {
    /// Create a console driving the given session
    pub fn new(session: Arc<SyncSession>) -> Self {
        Self {
            session,
            selected: 0,
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
                    self.handle_key(key.code);
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Translate a keypress into an engine operation
    fn handle_key(&mut self, code: KeyCode) {
        let session = Arc::clone(&self.session);
        let engine = session.engine();
        match code {
            KeyCode::Char('q') | KeyCode::Esc => {
                self.should_quit = true;
            }
            KeyCode::Char(' ') => {
                if engine.playback_state().is_playing {
                    engine.pause();
                } else {
                    engine.play();
                }
            }
            KeyCode::Char('s') => engine.stop(),
            KeyCode::Left => {
                let position = engine.playback_state().position_seconds;
                engine.seek(position - SEEK_STEP);
            }
            KeyCode::Right => {
                let position = engine.playback_state().position_seconds;
                engine.seek(position + SEEK_STEP);
            }
            KeyCode::Up => {
                self.selected = self.selected.saturating_sub(1);
            }
            KeyCode::Down => {
                let count = engine.library().len();
                if count > 0 {
                    self.selected = (self.selected + 1).min(count - 1);
                }
            }
            KeyCode::Enter => {
                if let Some(item) = engine.library().get(self.selected) {
                    engine.load_media(&item.id);
                }
            }
            KeyCode::Char('d') => {
                if let Some(item) = engine.library().get(self.selected) {
                    engine.remove_media(&item.id);
                    self.selected = self.selected.saturating_sub(1);
                }
            }
            _ => {}
        }
    }

    fn ui(&mut self, f: &mut Frame) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(7), // Now playing
                Constraint::Min(8),    // Library
                Constraint::Min(8),    // Devices
                Constraint::Length(3), // Help
            ])
            .split(f.area());

        self.render_now_playing(f, chunks[0]);
        self.render_library(f, chunks[1]);
        self.render_devices(f, chunks[2]);
        self.render_help(f, chunks[3]);
    }

    fn render_now_playing(&self, f: &mut Frame, area: Rect) {
        let state = self.session.engine().playback_state();
        let active = self.session.engine().active_item();

        let (title, detail) = match &active {
            Some(item) => {
                let detail = match item.kind {
                    MediaKind::Image => "panoramic image".to_string(),
                    MediaKind::Video if item.duration_seconds > 0.0 => format!(
                        "{} / {}",
                        format_time(state.position_seconds),
                        format_time(item.duration_seconds)
                    ),
                    MediaKind::Video => format_time(state.position_seconds),
                };
                (item.title.clone(), detail)
            }
            None => ("Nothing loaded".to_string(), String::new()),
        };

        let status = if active.as_ref().map(|i| i.kind) == Some(MediaKind::Image) {
            Span::styled("showing", Style::default().fg(Color::Blue))
        } else if state.is_playing {
            Span::styled("playing", Style::default().fg(Color::Green))
        } else {
            Span::styled("paused", Style::default().fg(Color::Yellow))
        };

        let link = if self.session.is_online() {
            Span::styled("online", Style::default().fg(Color::Green))
        } else {
            Span::styled("local mode", Style::default().fg(Color::Yellow))
        };

        let text = vec![
            Line::from(vec![
                Span::styled("Media: ", Style::default().fg(Color::Cyan)),
                Span::raw(title),
            ]),
            Line::from(vec![
                Span::styled("Status: ", Style::default().fg(Color::Cyan)),
                status,
            ]),
            Line::from(vec![
                Span::styled("Position: ", Style::default().fg(Color::Cyan)),
                Span::raw(detail),
            ]),
            Line::from(vec![
                Span::styled("Sync: ", Style::default().fg(Color::Cyan)),
                link,
            ]),
        ];

        let paragraph = Paragraph::new(text).block(
            Block::default()
                .title(format!("ViewSync Admin — {}", self.session.display_name()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Green)),
        );

        f.render_widget(paragraph, area);
    }

    fn render_library(&self, f: &mut Frame, area: Rect) {
        let library = self.session.engine().library();
        let active_id = self.session.engine().playback_state().active_media_id;

        let mut items = Vec::new();
        for (index, item) in library.iter().enumerate() {
            let marker = if Some(&item.id) == active_id.as_ref() {
                Span::styled("> ", Style::default().fg(Color::Green))
            } else {
                Span::raw("  ")
            };

            let mut spans = vec![
                marker,
                Span::raw(item.title.clone()),
                Span::styled(
                    format!("  {}", format_size(item.size_bytes)),
                    Style::default().fg(Color::DarkGray),
                ),
            ];
            if item.kind == MediaKind::Video && item.duration_seconds > 0.0 {
                spans.push(Span::styled(
                    format!("  {}", format_time(item.duration_seconds)),
                    Style::default().fg(Color::DarkGray),
                ));
            }
            if !item.source.is_portable() {
                spans.push(Span::styled(
                    "  [local only]",
                    Style::default().fg(Color::Yellow),
                ));
            }

            let style = if index == self.selected {
                Style::default().add_modifier(Modifier::REVERSED)
            } else {
                Style::default()
            };
            items.push(ListItem::new(Line::from(spans)).style(style));
        }

        if items.is_empty() {
            items.push(ListItem::new(Line::from(Span::styled(
                "Library is empty, add media with --media or --demo",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ))));
        }

        let list = List::new(items).block(
            Block::default()
                .title(format!("Library ({})", library.len()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        );

        f.render_widget(list, area);
    }

    fn render_devices(&self, f: &mut Frame, area: Rect) {
        let roster = self.session.tracker().roster();
        let now = now_millis();

        let mut items = Vec::new();
        for device in &roster {
            let role = match device.role {
                DeviceRole::Admin => Span::styled("admin ", Style::default().fg(Color::Magenta)),
                DeviceRole::Viewer => Span::styled("viewer", Style::default().fg(Color::Cyan)),
            };

            let age_secs = now.saturating_sub(device.last_seen_at) / 1000;
            let mut spans = vec![
                role,
                Span::raw("  "),
                Span::raw(device.display_name.clone()),
                Span::styled(
                    format!("  seen {}s ago", age_secs),
                    Style::default().fg(Color::DarkGray),
                ),
            ];

            if let Some(level) = device.battery_level {
                let charging = device.battery_charging.unwrap_or(false);
                let low = level <= LOW_BATTERY_THRESHOLD && !charging;
                let style = if low {
                    Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)
                } else {
                    Style::default().fg(Color::DarkGray)
                };
                let suffix = if charging { "+" } else { "" };
                spans.push(Span::styled(format!("  {}%{}", level, suffix), style));
                if low {
                    spans.push(Span::styled(
                        "  LOW BATTERY",
                        Style::default().fg(Color::Red),
                    ));
                }
            }

            items.push(ListItem::new(Line::from(spans)));
        }

        if items.is_empty() {
            items.push(ListItem::new(Line::from(Span::styled(
                "No devices connected",
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            ))));
        }

        let list = List::new(items).block(
            Block::default()
                .title(format!("Devices ({})", roster.len()))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Magenta)),
        );

        f.render_widget(list, area);
    }

    fn render_help(&self, f: &mut Frame, area: Rect) {
        let text = Line::from(vec![
            Span::styled("space", Style::default().fg(Color::Yellow)),
            Span::styled(" play/pause  ", Style::default().fg(Color::DarkGray)),
            Span::styled("s", Style::default().fg(Color::Yellow)),
            Span::styled(" stop  ", Style::default().fg(Color::DarkGray)),
            Span::styled("←/→", Style::default().fg(Color::Yellow)),
            Span::styled(" seek  ", Style::default().fg(Color::DarkGray)),
            Span::styled("↑/↓", Style::default().fg(Color::Yellow)),
            Span::styled(" select  ", Style::default().fg(Color::DarkGray)),
            Span::styled("enter", Style::default().fg(Color::Yellow)),
            Span::styled(" load  ", Style::default().fg(Color::DarkGray)),
            Span::styled("d", Style::default().fg(Color::Yellow)),
            Span::styled(" delete  ", Style::default().fg(Color::DarkGray)),
            Span::styled("q", Style::default().fg(Color::Yellow)),
            Span::styled(" quit", Style::default().fg(Color::DarkGray)),
        ]);

        let paragraph = Paragraph::new(text).block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

        f.render_widget(paragraph, area);
    }
}
