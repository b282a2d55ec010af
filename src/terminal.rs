// SPDX-License-Identifier: GPL-3.0-only

//! Terminal scanner surface
//!
//! Renders the live camera preview using Unicode half-block characters,
//! with a status bar for state, device, and results. This is the widget's
//! interactive render output: a preview area, start/stop control, and a
//! device selector.

use crate::backends::camera::get_backend_for_type;
use crate::backends::camera::types::{CameraFrame, PixelFormat};
use crate::config::Config;
use crate::constants::PREVIEW_CHANNEL_CAPACITY;
use crate::decoder::default_engine;
use crate::scanner::{BarcodeScanner, ScanState};

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
use std::sync::Mutex;
use std::time::Duration;
use tracing::{info, warn};

/// Run the terminal scanner
pub fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    // Set up terminal
    enable_raw_mode()?;
    let mut stdout = stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    // Run the app
    let result = run_app(&mut terminal, config);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_app(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    mut config: Config,
) -> Result<(), Box<dyn std::error::Error>> {
    let camera_backend = get_backend_for_type(config.backend);

    // Results cross from the session thread back to this loop
    let (result_tx, result_rx) = std::sync::mpsc::channel::<String>();
    let result_tx = Mutex::new(result_tx);

    let mut scanner = BarcodeScanner::new(
        camera_backend,
        default_engine(),
        config.selection_policy,
        move |text| {
            let _ = result_tx.lock().unwrap().send(text);
        },
    );

    let (preview_tx, mut preview_rx) =
        futures::channel::mpsc::channel::<CameraFrame>(PREVIEW_CHANNEL_CAPACITY);
    if config.preview_enabled {
        scanner.set_preview(preview_tx);
    }

    scanner.list_devices();
    if let Some(last) = config.last_device.clone()
        && scanner.devices().iter().any(|d| d.id == last)
    {
        scanner.select_device(&last);
    }

    info!(count = scanner.devices().len(), "Scanner surface ready");

    let mut frame_widget = FrameWidget::new();
    let mut last_result: Option<String> = None;
    let mut show_help = false;

    loop {
        // Drain the preview channel to get the latest frame
        while let Ok(Some(frame)) = preview_rx.try_next() {
            frame_widget.update_frame(frame);
        }

        // Drain scan results (the widget is already Idle when these arrive)
        while let Ok(text) = result_rx.try_recv() {
            info!(len = text.len(), "Scan result received");
            last_result = Some(text);
        }

        let status_message = if show_help {
            help_message()
        } else {
            status_message(&scanner, last_result.as_deref())
        };

        // Draw
        terminal.draw(|f| {
            let area = f.area();

            // Reserve bottom line for status
            let preview_area = Rect {
                x: area.x,
                y: area.y,
                width: area.width,
                height: area.height.saturating_sub(1),
            };

            f.render_widget(&frame_widget, preview_area);

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

        // Handle input with timeout for frame updates
        if event::poll(Duration::from_millis(16))?
            && let Event::Key(key) = event::read()?
            && key.kind == KeyEventKind::Press
        {
            // Ctrl+C to quit
            if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
                break;
            }

            match key.code {
                KeyCode::Char('q') => break,

                // Toggle scanning
                KeyCode::Enter | KeyCode::Char(' ') => {
                    if scanner.state() == ScanState::Scanning {
                        scanner.stop();
                    } else {
                        last_result = None;
                        frame_widget = FrameWidget::new();
                        scanner.start();
                    }
                    show_help = false;
                }

                // Cycle through devices (stops an active session first)
                KeyCode::Char('s') => {
                    if scanner.state() == ScanState::Scanning {
                        scanner.stop();
                    }
                    cycle_device(&mut scanner);
                    show_help = false;
                }

                // Re-enumerate devices
                KeyCode::Char('r') => {
                    if scanner.state() == ScanState::Idle {
                        scanner.list_devices();
                    }
                }

                KeyCode::Char('h') => show_help = !show_help,

                _ => {}
            }
        }
    }

    scanner.teardown();

    // Remember the device for next time
    config.last_device = scanner.selected_device().map(str::to_string);
    if let Err(e) = config.save() {
        warn!(error = %e, "Failed to save config");
    }

    Ok(())
}

/// Select the next device after the current selection
fn cycle_device(scanner: &mut BarcodeScanner) {
    let devices = scanner.devices().to_vec();
    if devices.is_empty() {
        return;
    }
    let current = scanner
        .selected_device()
        .and_then(|id| devices.iter().position(|d| d.id == id));
    let next = match current {
        Some(index) => (index + 1) % devices.len(),
        None => 0,
    };
    scanner.select_device(&devices[next].id);
}

fn status_message(scanner: &BarcodeScanner, last_result: Option<&str>) -> String {
    let device = scanner
        .selected_device()
        .and_then(|id| scanner.devices().iter().find(|d| d.id == id))
        .map(|d| d.label.clone())
        .unwrap_or_else(|| "no device".to_string());

    let mut msg = format!("[{}] {}", scanner.state(), device);

    if let Some(text) = last_result {
        msg.push_str(&format!(" | Scanned: {}", text));
    } else if let Some(err) = scanner.last_error() {
        msg.push_str(&format!(" | Error: {}", err));
    }

    msg.push_str(" | enter/space scan | 'h' help");
    msg
}

fn help_message() -> String {
    "enter/space: Start or stop scanning | s: Switch device | r: Refresh devices | \
     h: Toggle help | q/Ctrl+C: Quit"
        .to_string()
}

/// Widget that renders a camera frame using half-block characters
struct FrameWidget {
    frame: Option<CameraFrame>,
}

impl FrameWidget {
    fn new() -> Self {
        Self { frame: None }
    }

    fn update_frame(&mut self, frame: CameraFrame) {
        self.frame = Some(frame);
    }
}

impl Widget for &FrameWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let Some(frame) = &self.frame else {
            // No frame yet - show placeholder
            let msg = "Press enter to scan";
            let x = area.x + (area.width.saturating_sub(msg.len() as u16)) / 2;
            let y = area.y + area.height / 2;
            if y < area.y + area.height && x < area.x + area.width {
                buf.set_string(x, y, msg, ratatui::style::Style::default());
            }
            return;
        };

        // Calculate display dimensions maintaining aspect ratio.
        // Each terminal cell displays 2 vertical pixels using half-blocks.
        let frame_aspect = frame.width as f64 / frame.height as f64;
        let term_width = area.width as f64;
        let term_height = (area.height * 2) as f64;

        let (display_width, display_height) = if term_width / term_height > frame_aspect {
            let h = term_height;
            let w = h * frame_aspect;
            (w as u16, (h / 2.0) as u16)
        } else {
            let w = term_width;
            let h = w / frame_aspect;
            (w as u16, (h / 2.0) as u16)
        };

        let x_offset = area.x + (area.width.saturating_sub(display_width)) / 2;
        let y_offset = area.y + (area.height.saturating_sub(display_height)) / 2;

        let x_scale = frame.width as f64 / display_width.max(1) as f64;
        let y_scale = frame.height as f64 / (display_height.max(1) * 2) as f64;

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

                let top_color = sample_pixel(frame, src_x, src_y_top);
                let bottom_color = sample_pixel(frame, src_x, src_y_bottom);

                if let Some(cell) = buf.cell_mut((term_x, term_y)) {
                    cell.set_char('▀');
                    cell.set_fg(top_color);
                    cell.set_bg(bottom_color);
                }
            }
        }
    }
}

fn sample_pixel(frame: &CameraFrame, x: u32, y: u32) -> Color {
    let (r, g, b) = sample_pixel_rgb(frame, x, y);
    Color::Rgb(r, g, b)
}

fn sample_pixel_rgb(frame: &CameraFrame, x: u32, y: u32) -> (u8, u8, u8) {
    let x = x.min(frame.width.saturating_sub(1));
    let y = y.min(frame.height.saturating_sub(1));
    let data = &frame.data;

    match frame.format {
        PixelFormat::Rgba => {
            let idx = (y * frame.stride + x * 4) as usize;
            if idx + 2 < data.len() {
                (data[idx], data[idx + 1], data[idx + 2])
            } else {
                (0, 0, 0)
            }
        }
        PixelFormat::Rgb24 => {
            let idx = (y * frame.stride + x * 3) as usize;
            if idx + 2 < data.len() {
                (data[idx], data[idx + 1], data[idx + 2])
            } else {
                (0, 0, 0)
            }
        }
        PixelFormat::Gray8 => {
            let idx = (y * frame.stride + x) as usize;
            if idx < data.len() {
                let v = data[idx];
                (v, v, v)
            } else {
                (0, 0, 0)
            }
        }
        PixelFormat::Yuyv => {
            // Packed 4:2:2: two pixels share chroma (Y0 U Y1 V)
            let pair_x = (x & !1) as usize;
            let base = (y as usize) * (frame.stride as usize) + pair_x * 2;
            if base + 3 >= data.len() {
                return (0, 0, 0);
            }
            let luma = if x & 1 == 0 {
                data[base]
            } else {
                data[base + 2]
            };
            yuv_to_rgb(luma, data[base + 1], data[base + 3])
        }
    }
}

/// Convert YUV (BT.601) to RGB
fn yuv_to_rgb(y: u8, u: u8, v: u8) -> (u8, u8, u8) {
    let y = y as f32;
    let u = u as f32 - 128.0;
    let v = v as f32 - 128.0;

    let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
    let g = (y - 0.344136 * u - 0.714136 * v).clamp(0.0, 255.0) as u8;
    let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

    (r, g, b)
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

        let text = if self.message.len() > area.width as usize {
            // Scanned text can be multi-byte; clip on a char boundary
            let mut end = area.width as usize;
            while !self.message.is_char_boundary(end) {
                end -= 1;
            }
            &self.message[..end]
        } else {
            self.message
        };

        buf.set_string(
            area.x,
            area.y,
            text,
            ratatui::style::Style::default()
                .fg(Color::White)
                .bg(Color::DarkGray),
        );
    }
}
