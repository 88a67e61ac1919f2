//! UI rendering for the front panel.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Paragraph},
    style::{Color, Style, Modifier},
};
use crate::display;
use crate::keypad::CommandKey;
use super::app::PanelApp;

/// Main draw function.
pub fn draw(frame: &mut Frame, app: &PanelApp) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(6),
            Constraint::Min(4),
            Constraint::Length(3),
        ])
        .split(frame.area());

    draw_display(frame, chunks[0], app);
    draw_registers(frame, chunks[1], app);
    draw_keys(frame, chunks[2]);
    draw_status(frame, chunks[3], app);
}

/// Draw the seven-segment display and halt lamp.
fn draw_display(frame: &mut Frame, area: Rect, app: &PanelApp) {
    let lit = Style::default().fg(Color::Red).add_modifier(Modifier::BOLD);
    let rows = display::render(app.machine.display());

    let lamp = if app.machine.is_halted() {
        Span::styled("  ● HALT", lit)
    } else {
        Span::styled("  ○ HALT", Style::default().fg(Color::DarkGray))
    };

    let mut content: Vec<Line> = rows
        .into_iter()
        .map(|row| Line::from(Span::styled(row, lit)))
        .collect();
    content[2].spans.push(lamp);

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" Elektor SC/MP ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red)));

    frame.render_widget(paragraph, area);
}

/// Draw CPU registers.
fn draw_registers(frame: &mut Frame, area: Rect, app: &PanelApp) {
    let cpu = &app.machine.cpu;
    let regs = &cpu.regs;
    let value = Style::default().fg(Color::White);

    let content = vec![
        Line::from(vec![
            Span::raw("PC "),
            Span::styled(format!("{:04X}", regs.pc), Style::default().fg(Color::Yellow)),
            Span::raw("  P1 "),
            Span::styled(format!("{:04X}", regs.p1), value),
            Span::raw("  P2 "),
            Span::styled(format!("{:04X}", regs.p2), value),
            Span::raw("  P3 "),
            Span::styled(format!("{:04X}", regs.p3), value),
        ]),
        Line::from(vec![
            Span::raw("AC "),
            Span::styled(format!("{:02X}", regs.ac), value),
            Span::raw("    E "),
            Span::styled(format!("{:02X}", regs.e), value),
            Span::raw("    SR "),
            Span::styled(format!("{}", regs.status), Style::default().fg(Color::Cyan)),
            Span::raw(if regs.serial_out { "  SOUT" } else { "" }),
        ]),
        Line::from(vec![
            Span::raw("Cycles: "),
            Span::styled(format!("{}", cpu.cycles), Style::default().fg(Color::Cyan)),
            Span::raw("   Last: "),
            Span::styled(
                cpu.last_op().map(|op| op.to_string()).unwrap_or_default(),
                value,
            ),
        ]),
        Line::from(vec![
            Span::raw("Key latch: "),
            Span::styled(format!("{:02X}", cpu.mem.key_latch()), value),
        ]),
    ];

    let paragraph = Paragraph::new(content)
        .block(Block::default()
            .title(" CPU ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)));

    frame.render_widget(paragraph, area);
}

/// Draw the key map.
fn draw_keys(frame: &mut Frame, area: Rect) {
    let commands: Vec<String> = CommandKey::ALL
        .iter()
        .enumerate()
        .map(|(i, cmd)| format!("F{}:{}", i + 1, cmd.label()))
        .collect();

    let help = Paragraph::new(vec![
        Line::from("0-9, a-f: hex keys"),
        Line::from(commands[..4].join("  ")),
        Line::from(commands[4..].join("  ")),
        Line::from("F9: Halt/Continue  F10: Reset  F12/Esc: Quit"),
    ])
    .style(Style::default().fg(Color::DarkGray))
    .block(Block::default()
        .title(" Keys ")
        .borders(Borders::ALL));

    frame.render_widget(help, area);
}

/// Draw status bar.
fn draw_status(frame: &mut Frame, area: Rect, app: &PanelApp) {
    let status = Paragraph::new(app.status.clone())
        .style(Style::default().fg(Color::White))
        .block(Block::default()
            .title(" Status ")
            .borders(Borders::ALL));

    frame.render_widget(status, area);
}
