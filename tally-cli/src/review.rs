//! Full-screen review gate for one transaction.
//!
//! Renders the transaction summary, the annotated suggestions, and the full
//! category list as a manual fallback selector, then waits for exactly one
//! decision. Cancelling here sets the run's shared cancel token before the
//! decision is returned.

use std::io::{self, Stdout};
use std::time::Duration;

use anyhow::{Context, Result};
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph, Wrap},
};

use tally_core::{AnnotatedSuggestion, ApprovalRequest, CancelToken, Decision, GatePhase};

use crate::session::ReviewGate;

pub struct TuiGate {
    cancel: CancelToken,
}

impl TuiGate {
    pub fn new(cancel: CancelToken) -> Self {
        Self { cancel }
    }
}

impl ReviewGate for TuiGate {
    async fn review(&mut self, request: ApprovalRequest) -> Result<Decision> {
        let cancel = self.cancel.clone();
        let decision = tokio::task::spawn_blocking(move || review_transaction(&request, &cancel))
            .await
            .context("review task")??;
        Ok(decision)
    }
}

/// Blocking raw-mode loop for one transaction.
pub fn review_transaction(request: &ApprovalRequest, cancel: &CancelToken) -> Result<Decision> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = gate_loop(&mut terminal, request);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    let decision = res?;
    if decision == Decision::Cancel {
        cancel.cancel();
    }
    Ok(decision)
}

fn gate_loop(
    terminal: &mut Terminal<CrosstermBackend<Stdout>>,
    request: &ApprovalRequest,
) -> Result<Decision> {
    let mut phase = GatePhase::Presenting;
    let mut decision = Decision::Skip;

    let mut list_state = ListState::default();
    list_state.select(
        request
            .preselected
            .and_then(|id| request.categories.iter().position(|c| c.id == id)),
    );

    while phase != GatePhase::Resolved {
        terminal.draw(|f| draw_gate(f, request, &mut list_state))?;
        if phase == GatePhase::Presenting {
            phase = GatePhase::AwaitingDecision;
        }

        if !event::poll(Duration::from_millis(50))? {
            continue;
        }
        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }

        if let Some(resolved) = handle_key(&key, request, &mut list_state) {
            decision = resolved;
            phase = GatePhase::Resolved;
        }
    }

    Ok(decision)
}

fn handle_key(
    key: &KeyEvent,
    request: &ApprovalRequest,
    list_state: &mut ListState,
) -> Option<Decision> {
    // ctrl-c behaves like an explicit cancel
    if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
        return Some(Decision::Cancel);
    }

    match key.code {
        KeyCode::Esc | KeyCode::Char('q') => Some(Decision::Cancel),
        KeyCode::Char('s') => Some(Decision::Skip),
        // save; accept is the same path. Saving with nothing selected skips.
        KeyCode::Enter | KeyCode::Char('a') => {
            match list_state.selected().and_then(|i| request.categories.get(i)) {
                Some(cat) => Some(Decision::Commit(cat.id)),
                None => Some(Decision::Skip),
            }
        }
        KeyCode::Down => {
            move_selection(list_state, request.categories.len(), 1);
            None
        }
        KeyCode::Up => {
            move_selection(list_state, request.categories.len(), -1);
            None
        }
        KeyCode::Backspace => {
            list_state.select(None);
            None
        }
        KeyCode::Char(c @ '1'..='3') => {
            let idx = (c as usize) - ('1' as usize);
            if let Some(id) = request.suggestions.get(idx).and_then(|s| s.category_id) {
                list_state.select(request.categories.iter().position(|cat| cat.id == id));
            }
            None
        }
        _ => None,
    }
}

fn move_selection(list_state: &mut ListState, len: usize, delta: i64) {
    if len == 0 {
        return;
    }
    let next = match list_state.selected() {
        None => {
            if delta >= 0 {
                0
            } else {
                len - 1
            }
        }
        Some(current) => {
            let moved = current as i64 + delta;
            moved.clamp(0, len as i64 - 1) as usize
        }
    };
    list_state.select(Some(next));
}

fn draw_gate(f: &mut ratatui::Frame, request: &ApprovalRequest, list_state: &mut ListState) {
    let suggestion_rows = request.suggestions.len().max(1) as u16;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5),
            Constraint::Length(suggestion_rows + 2),
            Constraint::Min(5),
            Constraint::Length(3),
        ])
        .split(f.area());

    // transaction summary
    let txn = &request.transaction;
    let direction = if txn.is_income() { "income" } else { "expense" };
    let mut summary_lines = vec![
        Line::from(vec![
            Span::styled(
                txn.label(),
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                "   {:.2} ({})   {}",
                txn.amount.abs(),
                direction,
                txn.date.format("%Y-%m-%d")
            )),
        ]),
        Line::from(Span::styled(
            txn.notes.clone().unwrap_or_default(),
            Style::default().fg(Color::Gray),
        )),
    ];
    if let Some(err) = &request.provider_error {
        summary_lines.push(Line::from(Span::styled(
            format!("suggestions unavailable: {err}"),
            Style::default().fg(Color::Red),
        )));
    }
    let summary = Paragraph::new(summary_lines)
        .block(Block::default().borders(Borders::ALL).title("transaction"))
        .wrap(Wrap { trim: true });
    f.render_widget(summary, chunks[0]);

    // suggestions
    let suggestion_lines: Vec<Line> = if request.suggestions.is_empty() {
        vec![Line::from(Span::styled(
            "no suggestions",
            Style::default().fg(Color::Gray),
        ))]
    } else {
        request
            .suggestions
            .iter()
            .enumerate()
            .map(|(i, s)| suggestion_line(i, s))
            .collect()
    };
    let suggestions = Paragraph::new(suggestion_lines)
        .block(Block::default().borders(Borders::ALL).title("suggestions"));
    f.render_widget(suggestions, chunks[1]);

    // manual fallback selector
    let items: Vec<ListItem> = request
        .categories
        .iter()
        .map(|cat| {
            let mut spans = vec![Span::raw(cat.name.clone())];
            if let Some(desc) = cat.description.as_deref() {
                if !desc.trim().is_empty() {
                    spans.push(Span::styled(
                        format!("  {}", desc.trim()),
                        Style::default().fg(Color::Gray),
                    ));
                }
            }
            ListItem::new(Line::from(spans))
        })
        .collect();
    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("categories"))
        .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
        .highlight_symbol("> ");
    f.render_stateful_widget(list, chunks[2], list_state);

    let help = Paragraph::new(Line::from(Span::styled(
        "enter=save  s=skip  esc=cancel  up/down=select  1-3=pick suggestion  backspace=clear",
        Style::default().fg(Color::Gray),
    )))
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(help, chunks[3]);
}

fn suggestion_line(index: usize, suggestion: &AnnotatedSuggestion) -> Line<'static> {
    let bucket_style = match suggestion.bucket {
        Some(tally_core::ConfidenceBucket::High) => Style::default().fg(Color::Green),
        Some(tally_core::ConfidenceBucket::Medium) => Style::default().fg(Color::Yellow),
        _ => Style::default().fg(Color::Gray),
    };
    let mut spans = vec![Span::raw(format!("{}. {}", index + 1, suggestion.name))];
    match (suggestion.bucket, suggestion.confidence) {
        (Some(bucket), Some(confidence)) => {
            spans.push(Span::styled(
                format!("  [{} {:.2}]", bucket.label(), confidence),
                bucket_style,
            ));
        }
        _ => spans.push(Span::styled("  [unrated]", bucket_style)),
    }
    if let Some(justification) = &suggestion.justification {
        spans.push(Span::styled(
            format!("  {justification}"),
            Style::default().fg(Color::Gray),
        ));
    }
    Line::from(spans)
}
