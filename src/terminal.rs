// SPDX-License-Identifier: GPL-3.0-only

//! Terminal scan screen
//!
//! Renders the scanner preview to the terminal using Unicode half-block
//! characters for improved vertical resolution. The layout is a message
//! label on the top row, the live preview with the overlay box in the
//! middle, and a status bar on the bottom row.
//!
//! Preview coordinates are terminal columns by half-rows, so one cell
//! covers two vertical preview pixels.

use crate::backends::camera::CameraBackend;
use crate::constants::terminal::POLL_INTERVAL;
use crate::fl;
use crate::scanner::{
    OutcomeRecorder, PreviewLayer, PreviewRect, PreviewSize, ScanMode, ScanOutcome, ScanState,
    ScannerConfig, ScannerController,
};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};
use std::io::{self, stdout};
use std::time::Duration;
use tracing::info;

/// Run the interactive scan screen until it is dismissed
///
/// Returns the recorded outcome, or `None` when the user closed the screen.
pub fn run(
    mode: ScanMode,
    backend: &dyn CameraBackend,
    config: ScannerConfig,
    dismiss_animation: Duration,
) -> Result<Option<ScanOutcome>, Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend_term = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend_term)?;

    let result = run_app(&mut terminal, mode, backend, config, dismiss_animation);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mode: ScanMode,
    backend: &dyn CameraBackend,
    config: ScannerConfig,
    dismiss_animation: Duration,
) -> Result<Option<ScanOutcome>, Box<dyn std::error::Error>> {
    let status_message = build_status_message(&mode);

    let size = terminal.size()?;
    let mut controller =
        ScannerController::new(mode, OutcomeRecorder::default()).with_config(config);
    controller.appear(backend, preview_size(size.width, size.height));

    if controller.state() == ScanState::SetupFailed {
        let message = controller
            .setup_error()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "Camera setup failed".to_string());
        return Err(message.into());
    }

    loop {
        // Drain everything the capture thread delivered since the last redraw
        controller.pump();

        let label = controller.message().map(|m| m.text()).unwrap_or_default();
        terminal.draw(|f| {
            let area = f.area();

            let label_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.min(1),
            };
            f.render_widget(MessageLabel { text: &label }, label_area);

            let preview_area = Rect {
                x: area.x,
                y: area.y + 1,
                width: area.width,
                height: area.height.saturating_sub(2),
            };
            f.render_widget(
                PreviewWidget {
                    layer: controller.preview(),
                    overlay: controller.overlay(),
                },
                preview_area,
            );

            let status_area = Rect {
                x: area.x,
                y: area.height.saturating_sub(1),
                width: area.width,
                height: 1,
            };
            f.render_widget(
                StatusBar {
                    message: &status_message,
                },
                status_area,
            );
        })?;

        if let Some(dismissal) = controller.dismissal() {
            if dismissal.animated {
                // Leave the final label and overlay up briefly
                std::thread::sleep(dismiss_animation);
            }
            break;
        }

        // Handle input with timeout for frame updates
        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => {
                    let ctrl_c = key.code == KeyCode::Char('c')
                        && key.modifiers.contains(KeyModifiers::CONTROL);
                    if ctrl_c || key.code == KeyCode::Char('q') || key.code == KeyCode::Esc {
                        controller.dismiss();
                    }
                }
                Event::Resize(width, height) => {
                    controller.resize_preview(preview_size(width, height));
                }
                _ => {}
            }
        }
    }

    let state = controller.state();
    let outcome = controller.into_delegate().into_outcome();
    match &outcome {
        Some(outcome) => info!(?outcome, "Scan finished"),
        None => info!(?state, "Scan closed without a result"),
    }
    Ok(outcome)
}

/// Preview surface size for a terminal of `width` x `height` cells
fn preview_size(width: u16, height: u16) -> PreviewSize {
    let rows = height.saturating_sub(2);
    PreviewSize::new(width as f32, rows as f32 * 2.0)
}

fn build_status_message(mode: &ScanMode) -> String {
    let hint = if mode.is_armed() {
        fl!("mode-verify")
    } else {
        fl!("mode-register")
    };
    format!("{} | {}", hint, fl!("quit-hint"))
}

/// Live preview with the detected-code overlay
struct PreviewWidget<'a> {
    layer: Option<&'a PreviewLayer>,
    overlay: PreviewRect,
}

impl Widget for PreviewWidget<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(layer) = self.layer.filter(|layer| layer.frame().is_some()) else {
            // No frame yet - show placeholder
            let msg = fl!("waiting-for-camera");
            let x = area.x + (area.width.saturating_sub(msg.chars().count() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, Style::default());
            }
            return;
        };

        // Render using half-block characters:
        // upper half (▀) colored with fg, lower half with bg
        for ty in 0..area.height {
            for tx in 0..area.width {
                let px = tx as f32 + 0.5;
                let top = sample(layer, px, ty as f32 * 2.0 + 0.5);
                let bottom = sample(layer, px, ty as f32 * 2.0 + 1.5);

                if let Some(cell) = buf.cell_mut((area.x + tx, area.y + ty)) {
                    cell.set_char('▀');
                    cell.set_fg(top);
                    cell.set_bg(bottom);
                }
            }
        }

        draw_overlay(self.overlay, area, buf);
    }
}

/// Color of the preview at a layer point, black in letterbox bars
fn sample(layer: &PreviewLayer, x: f32, y: f32) -> Color {
    match (layer.frame(), layer.frame_point(x, y)) {
        (Some(frame), Some((fx, fy))) => {
            let (r, g, b) = frame.rgb_at(fx, fy);
            Color::Rgb(r, g, b)
        }
        _ => Color::Black,
    }
}

/// Box-drawing outline around the overlay rectangle, clipped to `area`
fn draw_overlay(overlay: PreviewRect, area: Rect, buf: &mut Buffer) {
    if overlay.is_empty() || area.width == 0 || area.height == 0 {
        return;
    }

    let max_x = area.width as i32 - 1;
    let max_y = area.height as i32 - 1;
    let left = (overlay.x.floor() as i32).clamp(0, max_x);
    let right = ((overlay.x + overlay.width).ceil() as i32 - 1).clamp(0, max_x);
    let top = ((overlay.y / 2.0).floor() as i32).clamp(0, max_y);
    let bottom = (((overlay.y + overlay.height) / 2.0).ceil() as i32 - 1).clamp(0, max_y);

    let style = Style::default().fg(Color::Green);
    let mut put = |x: i32, y: i32, ch: char| {
        if let Some(cell) = buf.cell_mut((area.x + x as u16, area.y + y as u16)) {
            cell.set_char(ch);
            cell.set_style(style);
        }
    };

    for x in left..=right {
        put(x, top, '─');
        put(x, bottom, '─');
    }
    for y in top..=bottom {
        put(left, y, '│');
        put(right, y, '│');
    }
    put(left, top, '┌');
    put(right, top, '┐');
    put(left, bottom, '└');
    put(right, bottom, '┘');
}

/// Scanner message label
struct MessageLabel<'a> {
    text: &'a str,
}

impl Widget for MessageLabel<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 {
            return;
        }
        let len = self.text.chars().count() as u16;
        let x = area.x + area.width.saturating_sub(len) / 2;
        buf.set_stringn(
            x,
            area.y,
            self.text,
            area.width as usize,
            Style::default().fg(Color::White),
        );
    }
}

/// Status bar widget
struct StatusBar<'a> {
    message: &'a str,
}

impl Widget for StatusBar<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Fill background
        for x in area.x..area.x + area.width {
            if let Some(cell) = buf.cell_mut((x, area.y)) {
                cell.set_char(' ');
                cell.set_bg(Color::DarkGray);
            }
        }

        buf.set_stringn(
            area.x,
            area.y,
            self.message,
            area.width as usize,
            Style::default().fg(Color::White).bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_size_uses_half_rows() {
        let size = preview_size(80, 24);
        assert_eq!(size, PreviewSize::new(80.0, 44.0));
        assert_eq!(preview_size(10, 1), PreviewSize::new(10.0, 0.0));
    }

    #[test]
    fn test_overlay_outline_is_clipped() {
        let area = Rect::new(0, 0, 10, 5);
        let mut buf = Buffer::empty(area);
        let overlay = PreviewRect {
            x: 2.0,
            y: 2.0,
            width: 4.0,
            height: 4.0,
        };
        draw_overlay(overlay, area, &mut buf);

        assert_eq!(buf[(2, 1)].symbol(), "┌");
        assert_eq!(buf[(5, 1)].symbol(), "┐");
        assert_eq!(buf[(2, 2)].symbol(), "└");
        assert_eq!(buf[(3, 1)].symbol(), "─");

        // Past the right and bottom edges
        let mut buf = Buffer::empty(area);
        let overlay = PreviewRect {
            x: 8.0,
            y: 6.0,
            width: 20.0,
            height: 20.0,
        };
        draw_overlay(overlay, area, &mut buf);
        assert_eq!(buf[(8, 3)].symbol(), "┌");
        assert_eq!(buf[(9, 4)].symbol(), "┘");
    }

    #[test]
    fn test_empty_overlay_draws_nothing() {
        let area = Rect::new(0, 0, 4, 2);
        let mut buf = Buffer::empty(area);
        draw_overlay(PreviewRect::ZERO, area, &mut buf);
        assert_eq!(buf, Buffer::empty(area));
    }
}
