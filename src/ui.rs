//! Terminal UI rendering.
//!
//! All drawing logic lives here, separated from application state ([`App`])
//! and input handling ([`crate::input`]).
//!
//! Layout, top to bottom: a two-line header naming the page and the policy,
//! the list of changes seen this session, and a one-line status bar.  An
//! unacknowledged change is drawn as a centered alert box over the list.

use ratatui::{
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::App;

/// Draw the complete UI for one frame.
pub fn draw(app: &mut App, frame: &mut Frame) {
    let [header_area, main_area, status_area] = Layout::vertical([
        Constraint::Length(2),
        Constraint::Min(1),
        Constraint::Length(1),
    ])
    .areas(frame.area());

    draw_header(app, frame, header_area);
    draw_change_list(app, frame, main_area);
    draw_status_bar(app, frame, status_area);

    if app.alert.is_some() {
        draw_alert(app, frame, main_area);
    }
}

fn draw_header(app: &App, frame: &mut Frame, area: Rect) {
    let header = Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" Checking "),
            Span::styled(
                &app.url,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::UNDERLINED),
            ),
            Span::raw(" for changes"),
        ]),
        Line::from(Span::styled(
            format!(" Alert on: {}", app.policy),
            Style::default().fg(Color::DarkGray),
        )),
    ]);
    frame.render_widget(header, area);
}

fn draw_change_list(app: &mut App, frame: &mut Frame, area: Rect) {
    let list_items: Vec<ListItem> = app
        .changes
        .iter()
        .map(|record| {
            let when = record
                .at
                .with_timezone(&chrono::Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string();

            ListItem::new(Line::from(vec![
                Span::styled(format!("{when:<20}"), Style::default().fg(Color::DarkGray)),
                Span::raw(" "),
                Span::styled(record.headline.as_str(), Style::default().fg(Color::White)),
            ]))
        })
        .collect();

    let list = List::new(list_items)
        .block(
            Block::default()
                .title(format!(" Changes ({}) ", app.total_changes))
                .borders(Borders::ALL),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::BOLD)
                .bg(Color::DarkGray),
        )
        .highlight_symbol("▸ ");

    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_alert(app: &App, frame: &mut Frame, area: Rect) {
    let Some(record) = &app.alert else {
        return;
    };

    let [row] = Layout::vertical([Constraint::Length(6)])
        .flex(Flex::Center)
        .areas(area);
    let [popup] = Layout::horizontal([Constraint::Percentage(70)])
        .flex(Flex::Center)
        .areas(row);

    let body = Paragraph::new(vec![
        Line::from(format!("Web page has changed: {}", app.url)),
        Line::from(Span::styled(
            record.headline.as_str(),
            Style::default().fg(Color::White),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "Enter: dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ])
    .wrap(Wrap { trim: true })
    .block(
        Block::default()
            .title(" Alert ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red).add_modifier(Modifier::BOLD)),
    );

    frame.render_widget(Clear, popup);
    frame.render_widget(body, popup);
}

/// Render the bottom status bar.
fn draw_status_bar(app: &App, frame: &mut Frame, area: Rect) {
    let status_style = if app.stopped.is_some() {
        Style::default().fg(Color::Red)
    } else {
        Style::default().fg(Color::Yellow)
    };

    let status = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(&app.status, status_style),
        Span::raw("  q: quit  ↑/↓: scroll  Enter: dismiss"),
    ]));
    frame.render_widget(status, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detector::ChangeEvent;
    use crate::poll::{PollMsg, Status, StatusUpdate};
    use crate::policy::ComparisonPolicy;
    use crate::source::Snapshot;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn render(app: &mut App) -> String {
        let backend = TestBackend::new(100, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(app, f)).unwrap();

        let buf = terminal.backend().buffer().clone();
        buf.content()
            .iter()
            .map(|c| c.symbol().chars().next().unwrap_or(' '))
            .collect()
    }

    fn app_with_change() -> App {
        let mut app = App::new("https://example.com/p", &ComparisonPolicy::substring("in stock"));
        app.handle_msg(PollMsg::Changed(ChangeEvent {
            url: "https://example.com/p".into(),
            snapshot: Snapshot::new("Now in stock\nBuy"),
        }));
        app
    }

    #[test]
    fn draw_does_not_panic_when_empty() {
        let mut app = App::new("https://example.com", &ComparisonPolicy::WholeText);
        let text = render(&mut app);
        assert!(text.contains("https://example.com"));
        assert!(text.contains("Changes (0)"));
    }

    #[test]
    fn header_names_policy() {
        let mut app = app_with_change();
        assert!(render(&mut app).contains("Alert on: text contains \"in stock\""));
    }

    #[test]
    fn alert_box_shows_until_acknowledged() {
        let mut app = app_with_change();
        assert!(render(&mut app).contains("Web page has changed"));

        app.acknowledge();
        let text = render(&mut app);
        assert!(!text.contains("Web page has changed"));
        assert!(text.contains("Now in stock"), "change stays in the list");
    }

    #[test]
    fn status_bar_shows_latest_status() {
        let mut app = App::new("https://example.com", &ComparisonPolicy::WholeText);
        app.handle_msg(PollMsg::Status(StatusUpdate::now(Status::Empty)));
        assert!(render(&mut app).contains("Empty page text"));
    }

    #[test]
    fn tiny_terminal_does_not_panic() {
        let mut app = app_with_change();
        let backend = TestBackend::new(10, 3);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|f| draw(&mut app, f)).unwrap();
    }
}
