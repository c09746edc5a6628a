use crate::braille::DotCanvas;
use crate::particle::{Bounds, Tint, Vec2};
use crate::scheduler::panic_message;
use crate::surface::{FrameInfo, Surface, SurfaceError};
use crate::ui::{self, View};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen, SetTitle},
};
use ratatui::{backend::CrosstermBackend, layout::Rect, style::Color, Terminal};
use std::io::{self, Stdout};
use std::panic;
use std::time::{Duration, Instant};
use tracing::{debug, error};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum KeyAction {
    Close,
    ToggleFullscreen,
}

/// Map a key event to what the surface should do. Releases and repeats
/// do nothing.
fn key_action(key: KeyEvent) -> Option<KeyAction> {
    if key.kind != KeyEventKind::Press {
        return None;
    }
    match key.code {
        KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            Some(KeyAction::Close)
        }
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(KeyAction::Close),
        KeyCode::Char('v') | KeyCode::Char('V') => Some(KeyAction::ToggleFullscreen),
        _ => None,
    }
}

/// Route panic reports through tracing; stderr is the alternate screen
/// while the surface is open
fn install_panic_hook() {
    panic::set_hook(Box::new(|info| {
        let location = info
            .location()
            .map(|l| l.to_string())
            .unwrap_or_default();
        error!(location = %location, "panic: {}", panic_message(info.payload()));
    }));
}

/// Back to the default hook
fn remove_panic_hook() {
    let _ = panic::take_hook();
}

/// Draws the particles as Braille dots in the alternate screen
pub struct TerminalSurface {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    world: Bounds,
    title: String,
    canvas: DotCanvas,
    info: FrameInfo,
    frame_budget: Duration,
    last_frame: Instant,
    fps: f32,
    fullscreen: bool,
    close_requested: bool,
    restored: bool,
}

impl TerminalSurface {
    /// Enter raw mode and the alternate screen. `target_fps == 0` disables pacing.
    pub fn open(world: Bounds, title: &str, target_fps: u32) -> Result<Self, SurfaceError> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(err) = execute!(stdout, EnterAlternateScreen, SetTitle(title)) {
            let _ = disable_raw_mode();
            return Err(err.into());
        }

        let terminal = match Terminal::new(CrosstermBackend::new(stdout)) {
            Ok(terminal) => terminal,
            Err(err) => {
                let _ = disable_raw_mode();
                let _ = execute!(io::stdout(), LeaveAlternateScreen);
                return Err(err.into());
            }
        };

        let frame_budget = if target_fps == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64(1.0 / target_fps as f64)
        };

        let mut surface = Self {
            terminal,
            world,
            title: title.to_string(),
            canvas: DotCanvas::new(0, 0),
            info: FrameInfo::default(),
            frame_budget,
            last_frame: Instant::now(),
            fps: 0.0,
            fullscreen: false,
            close_requested: false,
            restored: false,
        };
        surface.terminal.hide_cursor()?;
        install_panic_hook();
        Ok(surface)
    }

    fn canvas_size(&self) -> io::Result<(u16, u16)> {
        let size = self.terminal.size()?;
        let area = Rect::new(0, 0, size.width, size.height);
        Ok(ui::get_canvas_size(area, self.fullscreen))
    }

    fn handle_event(&mut self, event: Event) {
        let Event::Key(key) = event else {
            // resizes are picked up by the next begin_frame
            return;
        };
        match key_action(key) {
            Some(KeyAction::Close) => self.close_requested = true,
            Some(KeyAction::ToggleFullscreen) => self.fullscreen = !self.fullscreen,
            None => {}
        }
    }

    fn restore(&mut self) -> io::Result<()> {
        if self.restored {
            return Ok(());
        }
        self.restored = true;
        remove_panic_hook();
        disable_raw_mode()?;
        execute!(self.terminal.backend_mut(), LeaveAlternateScreen)?;
        self.terminal.show_cursor()
    }
}

impl Surface for TerminalSurface {
    /// Also paces frames: waits for input until the frame budget is spent
    fn should_close(&mut self) -> Result<bool, SurfaceError> {
        loop {
            if self.close_requested {
                break;
            }
            let timeout = self.frame_budget.saturating_sub(self.last_frame.elapsed());
            if !event::poll(timeout)? {
                break;
            }
            let event = event::read()?;
            self.handle_event(event);
        }
        Ok(self.close_requested)
    }

    fn begin_frame(&mut self, info: &FrameInfo) {
        self.info = *info;
        let (width, height) = self.canvas_size().unwrap_or_else(|err| {
            debug!(error = %err, "terminal size unavailable, keeping previous canvas");
            self.canvas.cell_size()
        });
        self.canvas.reset(width, height);
    }

    fn draw_point(&mut self, position: Vec2, size: f32, tint: Tint) {
        let color = Color::Rgb(tint.r, tint.g, tint.b);
        self.canvas.plot_world(self.world, position, size, color);
    }

    fn end_frame(&mut self) -> Result<(), SurfaceError> {
        let view = View {
            title: &self.title,
            canvas: &self.canvas,
            info: &self.info,
            fps: self.fps,
            fullscreen: self.fullscreen,
        };
        self.terminal.draw(|frame| ui::render(frame, &view))?;

        let elapsed = self.last_frame.elapsed().as_secs_f32();
        self.last_frame = Instant::now();
        if elapsed > 0.0 {
            let instant_fps = 1.0 / elapsed;
            self.fps = if self.fps == 0.0 {
                instant_fps
            } else {
                self.fps * 0.9 + instant_fps * 0.1
            };
        }
        Ok(())
    }

    fn close(&mut self) -> Result<(), SurfaceError> {
        Ok(self.restore()?)
    }
}

impl Drop for TerminalSurface {
    fn drop(&mut self) {
        let _ = self.restore();
    }
}
