// SPDX-License-Identifier: GPL-3.0-only

//! Terminal-based scan view
//!
//! Renders the camera feed to the terminal using Unicode half-block
//! characters and drives the interactive scan loop: preview, detection
//! overlay, and the polled cancel key.

use crate::backends::camera::types::CameraFrame;
use crate::backends::camera::v4l2::{V4l2Source, try_open_device};
use crate::config::Config;
use crate::constants::{KEY_POLL_INTERVAL, snapshot};
use crate::scan::decode::{Detection, Orientation, Region};
use crate::scan::session::{self, ScanOutcome, ScanUi, SessionOptions};

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal, backend::CrosstermBackend, buffer::Buffer, layout::Rect, style::Color,
    widgets::Widget,
};
use std::io::{self, stdout};
use std::path::PathBuf;
use tracing::{info, warn};

/// Run a live scan in the terminal
///
/// Opens the configured camera, runs the acquisition loop with the
/// terminal UI, restores the terminal, and returns the scan outcome.
/// Device problems are mapped to [`ScanOutcome::DeviceError`] rather
/// than errors; the `Err` branch is reserved for terminal I/O failures.
pub fn run(
    config: &Config,
    options: &SessionOptions,
    save_frame: bool,
) -> Result<ScanOutcome, Box<dyn std::error::Error>> {
    let Some(device) = try_open_device(config.device_index) else {
        return Ok(ScanOutcome::DeviceError);
    };
    let source = match V4l2Source::new(&device) {
        Ok(source) => source,
        Err(e) => {
            warn!(error = %e, "Camera stream setup failed");
            return Ok(ScanOutcome::DeviceError);
        }
    };

    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;

    let mut ui = TerminalUi::new(terminal, config);
    let outcome = session::run(source, &mut ui, options);

    // Restore terminal
    disable_raw_mode()?;
    execute!(ui.terminal.backend_mut(), LeaveAlternateScreen)?;
    ui.terminal.show_cursor()?;

    if save_frame
        && matches!(outcome, ScanOutcome::Found(_))
        && let Some(frame) = ui.confirmed_frame.take()
    {
        match save_snapshot(&frame) {
            Ok(path) => info!(path = %path.display(), "Confirmation frame saved"),
            Err(e) => warn!(error = %e, "Failed to save confirmation frame"),
        }
    }

    Ok(outcome)
}

/// Terminal implementation of the scan loop's feedback sink
struct TerminalUi {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
    cancel_key: char,
    confirm_hold: std::time::Duration,
    idle_status: String,
    /// Last confirmed frame, kept for the optional snapshot
    confirmed_frame: Option<CameraFrame>,
}

impl TerminalUi {
    fn new(terminal: Terminal<CrosstermBackend<io::Stdout>>, config: &Config) -> Self {
        Self {
            terminal,
            cancel_key: config.cancel_key,
            confirm_hold: config.confirm_hold(),
            idle_status: format!(
                "Point the book barcode at the camera | '{}' cancels",
                config.cancel_key
            ),
            confirmed_frame: None,
        }
    }

    fn draw(&mut self, frame: &CameraFrame, region: Option<Region>, status: &str) -> io::Result<()> {
        self.terminal
            .draw(|f| {
                let area = f.area();

                // Reserve bottom line for status
                let camera_area = Rect {
                    x: area.x,
                    y: area.y,
                    width: area.width,
                    height: area.height.saturating_sub(1),
                };
                f.render_widget(FrameView { frame, region }, camera_area);

                let status_area = Rect {
                    x: area.x,
                    y: area.height.saturating_sub(1),
                    width: area.width,
                    height: 1,
                };
                f.render_widget(StatusBar { message: status }, status_area);
            })
            .map_err(io::Error::other)?;
        Ok(())
    }
}

impl ScanUi for TerminalUi {
    fn present(&mut self, frame: &CameraFrame, detection: Option<&Detection>) -> io::Result<()> {
        let status = match detection {
            Some(det) => format!("Found: {} (EAN-13)", det.payload),
            None => self.idle_status.clone(),
        };
        self.draw(frame, detection.and_then(|d| d.region), &status)
    }

    fn poll_cancel(&mut self) -> io::Result<bool> {
        if event::poll(KEY_POLL_INTERVAL)?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C always cancels
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                return Ok(true);
            }
            if key.code == KeyCode::Char(self.cancel_key) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn confirm(&mut self, frame: &CameraFrame, detection: &Detection) -> io::Result<()> {
        // Rotated hits have no usable box; the label is the feedback
        let status = match detection.orientation {
            Orientation::Upright => format!("Found: {} (EAN-13)", detection.payload),
            _ => format!("Found: {} (EAN-13, rotated)", detection.payload),
        };
        self.draw(frame, detection.region, &status)?;
        self.confirmed_frame = Some(frame.clone());

        // Hold so the user sees what was recognized before teardown
        std::thread::sleep(self.confirm_hold);
        Ok(())
    }
}

/// Save a frame as a timestamped PNG under the user's pictures directory
fn save_snapshot(frame: &CameraFrame) -> Result<PathBuf, Box<dyn std::error::Error>> {
    let width = frame.width;
    let height = frame.height;

    let mut rgb_data = Vec::with_capacity((width * height * 3) as usize);
    for y in 0..height {
        for x in 0..width {
            let (r, g, b) = frame.sample_rgb(x, y);
            rgb_data.push(r);
            rgb_data.push(g);
            rgb_data.push(b);
        }
    }

    let img: image::RgbImage =
        image::ImageBuffer::from_raw(width, height, rgb_data).ok_or("Failed to create image")?;

    let snapshot_dir = dirs::picture_dir()
        .ok_or("No pictures directory available")?
        .join(snapshot::SUBDIRECTORY);
    std::fs::create_dir_all(&snapshot_dir)?;

    let timestamp = chrono::Local::now().format(snapshot::TIMESTAMP_FORMAT);
    let filename = format!("{}_{}.png", snapshot::FILE_PREFIX, timestamp);
    let filepath = snapshot_dir.join(&filename);

    img.save(&filepath)?;
    Ok(filepath)
}

/// Widget that renders a camera frame using half-block characters
///
/// Each terminal cell shows two vertical pixels: the upper half (▀) is
/// the foreground color, the lower half the background color. When an
/// upright detection region is present its border cells are painted
/// green.
struct FrameView<'a> {
    frame: &'a CameraFrame,
    region: Option<Region>,
}

impl Widget for FrameView<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let frame = self.frame;
        if frame.width == 0 || frame.height == 0 || area.width == 0 || area.height == 0 {
            return;
        }

        // Calculate display dimensions maintaining aspect ratio
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64; // *2 because half-blocks

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            // Terminal is wider - fit to height
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            // Terminal is taller - fit to width
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };
        if display_width == 0 || display_height == 0 {
            return;
        }

        // Center the image
        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        // Scale factors
        let x_scale = frame.width as f64 / display_width as f64;
        let y_scale = frame.height as f64 / (display_height * 2) as f64;

        for ty in 0..display_height {
            for tx in 0..display_width {
                let term_x = x_offset + tx;
                let term_y = y_offset + ty;

                if term_x >= area.x + area.width || term_y >= area.y + area.height {
                    continue;
                }

                let src_x = (tx as f64 * x_scale) as u32;
                let src_y_top = (ty as f64 * 2.0 * y_scale) as u32;
                let src_y_bottom = ((ty as f64 * 2.0 + 1.0) * y_scale) as u32;

                let (tr, tg, tb) = frame.sample_rgb(src_x, src_y_top);
                let (br, bg, bb) = frame.sample_rgb(src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(Color::Rgb(tr, tg, tb));
                    cell.set_bg(Color::Rgb(br, bg, bb));
                }
            }
        }

        // Detection box, mapped from frame pixels to cells
        if let Some(region) = self.region {
            let cx0 = x_offset + ((region.x as f64 / x_scale) as u16).min(display_width - 1);
            let cy0 = y_offset + ((region.y as f64 / (y_scale * 2.0)) as u16).min(display_height - 1);
            let cx1 = x_offset
                + (((region.x + region.width) as f64 / x_scale) as u16).min(display_width - 1);
            let cy1 = y_offset
                + (((region.y + region.height) as f64 / (y_scale * 2.0)) as u16)
                    .min(display_height - 1);

            for tx in cx0..=cx1 {
                paint_green(buf, area, tx, cy0);
                paint_green(buf, area, tx, cy1);
            }
            for ty in cy0..=cy1 {
                paint_green(buf, area, cx0, ty);
                paint_green(buf, area, cx1, ty);
            }
        }
    }
}

fn paint_green(buf: &mut Buffer, area: Rect, x: u16, y: u16) {
    if x >= area.x + area.width || y >= area.y + area.height {
        return;
    }
    if let Some(cell) = buf.cell_mut((x, y)) {
        cell.set_char('▀');
        cell.set_fg(Color::Green);
        cell.set_bg(Color::Green);
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

        // set_stringn clips by display width on a character boundary;
        // the message may hold a multi-byte cancel key
        buf.set_stringn(
            area.x,
            area.y,
            self.message,
            area.width as usize,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_bar_clips_multibyte_message_to_narrow_area() {
        // A non-ASCII cancel key lands a multi-byte character exactly on
        // the cut when the terminal is narrower than the message
        let message = "Point the book barcode at the camera | 'é' cancels";
        assert!(message.len() > 41 && !message.is_char_boundary(41));

        let area = Rect::new(0, 0, 41, 1);
        let mut buf = Buffer::empty(area);
        StatusBar { message }.render(area, &mut buf);

        assert_eq!(buf.cell((0, 0)).map(|c| c.symbol()), Some("P"));
    }

    #[test]
    fn test_status_bar_renders_short_message_in_full() {
        let area = Rect::new(0, 0, 20, 1);
        let mut buf = Buffer::empty(area);
        StatusBar { message: "Found: 1 (EAN-13)" }.render(area, &mut buf);

        let rendered: String = (0..17)
            .filter_map(|x| buf.cell((x, 0)).map(|c| c.symbol().to_string()))
            .collect();
        assert_eq!(rendered, "Found: 1 (EAN-13)");
    }
}
