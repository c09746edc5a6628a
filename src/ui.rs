use crate::braille::DotCanvas;
use crate::surface::FrameInfo;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph},
    Frame,
};

const SIDEBAR_WIDTH: u16 = 22;

// UI color scheme
const BORDER_COLOR: Color = Color::Cyan;
const HIGHLIGHT_COLOR: Color = Color::Yellow;
const TEXT_COLOR: Color = Color::White;
const DIM_TEXT_COLOR: Color = Color::Gray;

/// Everything one terminal frame shows
pub struct View<'a> {
    pub title: &'a str,
    pub canvas: &'a DotCanvas,
    pub info: &'a FrameInfo,
    pub fps: f32,
    pub fullscreen: bool,
}

/// Creates a standard styled block with rounded borders
fn styled_block(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(BORDER_COLOR))
        .title(title)
}

/// Main render function
pub fn render(frame: &mut Frame, view: &View) {
    let area = frame.area();

    if view.fullscreen {
        render_canvas(frame, area, view);
    } else {
        let layout = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(SIDEBAR_WIDTH), Constraint::Min(0)])
            .split(area);

        render_sidebar(frame, layout[0], view);
        render_canvas(frame, layout[1], view);
    }
}

/// Calculate the canvas size (excluding borders)
pub fn get_canvas_size(frame_area: Rect, fullscreen: bool) -> (u16, u16) {
    if fullscreen {
        (frame_area.width.saturating_sub(2), frame_area.height.saturating_sub(2))
    } else {
        let canvas_width = frame_area.width.saturating_sub(SIDEBAR_WIDTH + 2);
        let canvas_height = frame_area.height.saturating_sub(2);
        (canvas_width, canvas_height)
    }
}

fn render_sidebar(frame: &mut Frame, area: Rect, view: &View) {
    let sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(9), // Status
            Constraint::Min(5),    // Controls
        ])
        .split(area);

    render_status_box(frame, sections[0], view);
    render_controls_box(frame, sections[1]);
}

fn render_status_box(frame: &mut Frame, area: Rect, view: &View) {
    let title = format!(" {} ", view.title);
    let block = styled_block(&title);
    let info = view.info;

    let make_line = |label: &str, value: String| {
        Line::from(vec![
            Span::styled(format!("{:<8}", label), Style::default().fg(DIM_TEXT_COLOR)),
            Span::styled(value, Style::default().fg(TEXT_COLOR)),
        ])
    };

    let failed_style = if info.failed_passes > 0 {
        Style::default().fg(HIGHLIGHT_COLOR)
    } else {
        Style::default().fg(TEXT_COLOR)
    };

    let content = vec![
        make_line("Tick", info.tick.to_string()),
        make_line("FPS", format!("{:.0}", view.fps)),
        make_line("Free", info.free_count.to_string()),
        make_line("Cluster", info.cluster_count.to_string()),
        make_line("Workers", info.workers.to_string()),
        Line::from(vec![
            Span::styled(format!("{:<8}", "Failed"), Style::default().fg(DIM_TEXT_COLOR)),
            Span::styled(info.failed_passes.to_string(), failed_style),
        ]),
    ];

    let paragraph = Paragraph::new(content).block(block);
    frame.render_widget(paragraph, area);
}

fn render_controls_box(frame: &mut Frame, area: Rect) {
    let key_style = Style::default().fg(HIGHLIGHT_COLOR);
    let desc_style = Style::default().fg(DIM_TEXT_COLOR);

    let make_control = |key: &str, desc: &str| -> Line<'static> {
        Line::from(vec![
            Span::styled(format!("{:>5}", key), key_style),
            Span::styled(format!(" {}", desc), desc_style),
        ])
    };

    let content = vec![
        make_control("V", "fullscreen"),
        make_control("Q/Esc", "quit"),
    ];

    let paragraph = Paragraph::new(content).block(styled_block(" Controls "));
    frame.render_widget(paragraph, area);
}

fn render_canvas(frame: &mut Frame, area: Rect, view: &View) {
    let block = styled_block("");

    let inner = block.inner(area);
    frame.render_widget(block, area);

    let buf = frame.buffer_mut();
    for cell in view.canvas.cells() {
        let x = inner.x + cell.x;
        let y = inner.y + cell.y;

        if x < inner.x + inner.width && y < inner.y + inner.height {
            buf.set_string(x, y, cell.char.to_string(), Style::default().fg(cell.color));
        }
    }
}
