//! Terminal viewer — the display and windowing collaborator.
//!
//! Renders the latest decoded frame with ratatui-image (Sixel/Kitty/
//! iTerm2 with a halfblocks fallback) and feeds terminal mouse and
//! key events into the input pipeline. Crossterm polling is blocking,
//! so it runs on a dedicated thread and forwards events over a
//! channel to the async render loop.

use std::io;
use std::time::Duration;

use crossterm::event::{
    self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind, KeyModifiers,
};
use crossterm::execute;
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use image::DynamicImage;
use ratatui::backend::CrosstermBackend;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Style};
use ratatui::widgets::Paragraph;
use ratatui::Terminal;
use ratatui_image::picker::Picker;
use ratatui_image::protocol::StatefulProtocol;
use ratatui_image::StatefulImage;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use mirror_core::capture::CaptureStats;
use mirror_core::dispatch::{Command, CommandSender};
use mirror_core::input::PointerSender;
use mirror_core::rfb::Frame;

use crate::input::{translate_key, translate_mouse};

/// Run the viewer until the user quits or the token is cancelled.
///
/// Quitting cancels the shared token so the capture loop and the
/// dispatcher shut down with it.
pub async fn run(
    mut frame_rx: watch::Receiver<Option<Frame>>,
    stats_rx: watch::Receiver<CaptureStats>,
    pointer: PointerSender,
    commands: CommandSender,
    shutdown: CancellationToken,
    device_label: String,
    forward_keyboard: bool,
) -> io::Result<()> {
    // Query terminal graphics capabilities before raw mode.
    let mut picker = Picker::from_query_stdio().unwrap_or_else(|_| Picker::halfblocks());

    enable_raw_mode()?;
    execute!(io::stdout(), EnterAlternateScreen, EnableMouseCapture)?;
    let mut terminal = Terminal::new(CrosstermBackend::new(io::stdout()))?;
    terminal.clear()?;

    let result = event_loop(
        &mut terminal,
        &mut picker,
        &mut frame_rx,
        stats_rx,
        pointer,
        commands,
        shutdown,
        device_label,
        forward_keyboard,
    )
    .await;

    // Restore the terminal even when the loop failed.
    let _ = execute!(io::stdout(), DisableMouseCapture, LeaveAlternateScreen);
    let _ = disable_raw_mode();
    result
}

#[allow(clippy::too_many_arguments)]
async fn event_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    picker: &mut Picker,
    frame_rx: &mut watch::Receiver<Option<Frame>>,
    stats_rx: watch::Receiver<CaptureStats>,
    pointer: PointerSender,
    commands: CommandSender,
    shutdown: CancellationToken,
    device_label: String,
    forward_keyboard: bool,
) -> io::Result<()> {
    // Dedicated thread for blocking crossterm polls.
    let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();
    let pump_token = shutdown.clone();
    tokio::task::spawn_blocking(move || {
        while !pump_token.is_cancelled() {
            if event::poll(Duration::from_millis(10)).unwrap_or(false) {
                if let Ok(ev) = event::read() {
                    if event_tx.send(ev).is_err() {
                        break;
                    }
                }
            }
        }
    });

    let mut protocol: Option<StatefulProtocol> = None;
    let mut image_area = Rect::default();

    loop {
        let stats = stats_rx.borrow().clone();
        terminal.draw(|f| {
            let chunks = Layout::default()
                .direction(Direction::Vertical)
                .constraints([Constraint::Min(0), Constraint::Length(1)])
                .split(f.area());
            image_area = chunks[0];

            if let Some(protocol) = protocol.as_mut() {
                f.render_stateful_widget(StatefulImage::default(), chunks[0], protocol);
            } else {
                let waiting = Paragraph::new(format!("{device_label} — waiting for frames ..."))
                    .style(Style::default().fg(Color::DarkGray))
                    .alignment(ratatui::layout::Alignment::Center);
                f.render_widget(waiting, chunks[0]);
            }

            let status = if stats.connected {
                format!(
                    " {device_label}  {:.1} fps  {} frames  {} skipped  (Esc quits)",
                    stats.fps, stats.total_frames, stats.skipped_cycles
                )
            } else {
                format!(" {device_label}  connecting ...  (Esc quits)")
            };
            f.render_widget(
                Paragraph::new(status).style(Style::default().fg(Color::Gray)),
                chunks[1],
            );
        })?;

        tokio::select! {
            _ = shutdown.cancelled() => break,

            changed = frame_rx.changed() => {
                if changed.is_err() {
                    break; // capture service gone
                }
                let frame = frame_rx.borrow_and_update().clone();
                if let Some(frame) = frame {
                    let dynamic = DynamicImage::ImageRgba8(frame.into_image());
                    protocol = Some(picker.new_resize_protocol(dynamic));
                }
            }

            ev = event_rx.recv() => {
                let Some(ev) = ev else { break };
                match ev {
                    Event::Key(key) if key.kind != KeyEventKind::Release => {
                        let quit = key.code == KeyCode::Esc
                            || (key.code == KeyCode::Char('c')
                                && key.modifiers.contains(KeyModifiers::CONTROL));
                        if quit {
                            shutdown.cancel();
                            break;
                        }
                        if forward_keyboard {
                            if let Some(input) = translate_key(&key) {
                                let _ = commands.enqueue(Command::Key(input));
                            }
                        }
                    }
                    Event::Mouse(mouse) => {
                        if let Some(pe) = translate_mouse(&mouse, image_area) {
                            debug!(?pe, "pointer event");
                            pointer.send(pe);
                        }
                    }
                    _ => {}
                }
            }
        }
    }

    Ok(())
}
