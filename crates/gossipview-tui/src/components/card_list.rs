use ratatui::prelude::*;
use ratatui::widgets::{Block, Borders, List, ListItem, ListState};

use crate::view::{Badge, CardsView, NodeCard, RepoRow, TaskRow, EMPTY_MESSAGE};

/// What activating a row does. Resolved from the current row table only,
/// so nothing from a previous render can fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowAction {
    ToggleTasks { node: String, repo: usize },
    ShowMore { node: String },
    OpenOutput { text: String },
}

struct Row {
    line: Line<'static>,
    action: Option<RowAction>,
    /// Whether keyboard selection stops here. Continuation lines of an
    /// output block share its action but are not stops.
    selectable: bool,
}

impl Row {
    fn plain(line: Line<'static>) -> Self {
        Self {
            line,
            action: None,
            selectable: false,
        }
    }

    fn stop(line: Line<'static>, action: RowAction) -> Self {
        Self {
            line,
            action: Some(action),
            selectable: true,
        }
    }
}

/// Scrollable, selectable rendering of a [`CardsView`].
#[derive(Default)]
pub struct CardList {
    rows: Vec<Row>,
    selected: Option<usize>,
    list_state: ListState,
    /// Inner area of the last draw, for mouse hit-testing.
    content_area: Rect,
}

impl CardList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace all rows with a fresh flattening of `view`. The selection
    /// follows the previously selected action when it still exists.
    pub fn rebuild(&mut self, view: &CardsView) {
        let previous_action = self.selected_action().cloned();
        let previous_ordinal = self.selected_ordinal();

        self.rows = flatten(view);

        let by_action = previous_action.and_then(|action| {
            self.rows
                .iter()
                .position(|r| r.selectable && r.action.as_ref() == Some(&action))
        });
        self.selected = by_action.or_else(|| {
            let stops = self.stop_indices();
            if stops.is_empty() {
                None
            } else {
                let ordinal = previous_ordinal.unwrap_or(0).min(stops.len() - 1);
                Some(stops[ordinal])
            }
        });
        self.list_state.select(self.selected);
    }

    pub fn selected_action(&self) -> Option<&RowAction> {
        self.selected
            .and_then(|i| self.rows.get(i))
            .and_then(|r| r.action.as_ref())
    }

    pub fn select_next(&mut self) {
        let stops = self.stop_indices();
        let next = match self.selected {
            Some(cur) => stops.iter().copied().find(|&i| i > cur).or(Some(cur)),
            None => stops.first().copied(),
        };
        self.set_selected(next);
    }

    pub fn select_prev(&mut self) {
        let stops = self.stop_indices();
        let prev = match self.selected {
            Some(cur) => stops.iter().rev().copied().find(|&i| i < cur).or(Some(cur)),
            None => stops.first().copied(),
        };
        self.set_selected(prev);
    }

    pub fn select_first(&mut self) {
        let first = self.stop_indices().first().copied();
        self.set_selected(first);
    }

    pub fn select_last(&mut self) {
        let last = self.stop_indices().last().copied();
        self.set_selected(last);
    }

    /// Select the first stop whose action satisfies `pred`.
    pub fn select_where(&mut self, pred: impl Fn(&RowAction) -> bool) -> bool {
        let found = self
            .rows
            .iter()
            .position(|r| r.selectable && r.action.as_ref().is_some_and(&pred));
        if found.is_some() {
            self.set_selected(found);
        }
        found.is_some()
    }

    /// Action under a screen position from the last draw.
    pub fn action_at(&self, column: u16, row: u16) -> Option<RowAction> {
        let area = self.content_area;
        if column < area.x || column >= area.x + area.width {
            return None;
        }
        if row < area.y || row >= area.y + area.height {
            return None;
        }
        let index = self.list_state.offset() + usize::from(row - area.y);
        self.rows.get(index).and_then(|r| r.action.clone())
    }

    /// Plain text of every row, top to bottom.
    pub fn text_lines(&self) -> Vec<String> {
        self.rows
            .iter()
            .map(|r| r.line.spans.iter().map(|s| s.content.as_ref()).collect())
            .collect()
    }

    pub fn render(&mut self, frame: &mut Frame, area: Rect) {
        let block = Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray));
        self.content_area = block.inner(area);

        let items: Vec<ListItem> = self
            .rows
            .iter()
            .map(|r| ListItem::new(r.line.clone()))
            .collect();
        let list = List::new(items)
            .block(block)
            .highlight_style(Style::default().bg(Color::DarkGray).bold())
            .highlight_symbol("> ");
        frame.render_stateful_widget(list, area, &mut self.list_state);
    }

    fn selected_ordinal(&self) -> Option<usize> {
        let cur = self.selected?;
        self.stop_indices().iter().position(|&i| i == cur)
    }

    fn stop_indices(&self) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, r)| r.selectable)
            .map(|(i, _)| i)
            .collect()
    }

    fn set_selected(&mut self, index: Option<usize>) {
        self.selected = index;
        self.list_state.select(index);
    }
}

fn flatten(view: &CardsView) -> Vec<Row> {
    let cards = match view {
        CardsView::Empty => {
            return vec![Row::plain(Line::styled(
                EMPTY_MESSAGE,
                Style::default().fg(Color::DarkGray),
            ))];
        }
        CardsView::Cards(cards) => cards,
    };

    let mut rows = Vec::new();
    for (i, card) in cards.iter().enumerate() {
        if i > 0 {
            rows.push(Row::plain(Line::raw("")));
        }
        flatten_card(card, &mut rows);
    }
    rows
}

fn flatten_card(card: &NodeCard, rows: &mut Vec<Row>) {
    let mut header = vec![
        Span::styled(card.title.clone(), Style::default().fg(Color::Cyan).bold()),
        Span::styled(format!("  {}", card.tooltip), Style::default().fg(Color::DarkGray)),
    ];
    header.extend(badge_spans(&card.badges));
    rows.push(Row::plain(Line::from(header)));

    if !card.last_updated.is_empty() {
        rows.push(Row::plain(Line::styled(
            format!("  {}", card.last_updated),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(err) = &card.error {
        rows.push(Row::plain(error_line(2, err)));
    }

    for (index, repo) in card.repos.iter().enumerate() {
        flatten_repo(&card.key, index, repo, rows);
    }

    if let Some(more) = card.show_more {
        rows.push(Row::stop(
            Line::styled(
                format!("  [ {} ]", more.label()),
                Style::default().fg(Color::Yellow),
            ),
            RowAction::ShowMore {
                node: card.key.clone(),
            },
        ));
    }
}

fn flatten_repo(node_key: &str, index: usize, repo: &RepoRow, rows: &mut Vec<Row>) {
    let mut title = vec![Span::styled(
        format!("  {}", repo.title),
        Style::default().bold(),
    )];
    title.extend(badge_spans(&repo.badges));
    rows.push(Row::plain(Line::from(title)));

    if !repo.meta.is_empty() {
        rows.push(Row::plain(Line::styled(
            format!("    {}", repo.meta),
            Style::default().fg(Color::DarkGray),
        )));
    }
    if let Some(err) = &repo.error {
        rows.push(Row::plain(error_line(4, err)));
    }

    let Some(disclosure) = &repo.tasks else {
        return;
    };
    let marker = if disclosure.expanded { "▾" } else { "▸" };
    rows.push(Row::stop(
        Line::raw(format!("    {marker} {}", disclosure.label())),
        RowAction::ToggleTasks {
            node: node_key.to_string(),
            repo: index,
        },
    ));
    if disclosure.expanded {
        for task in &disclosure.tasks {
            flatten_task(task, rows);
        }
    }
}

fn flatten_task(task: &TaskRow, rows: &mut Vec<Row>) {
    let mut spans = vec![Span::raw(format!("      {}", task.name))];
    spans.extend(badge_spans(&[task.badge]));
    if !task.command.is_empty() {
        spans.push(Span::styled(
            format!("  {}", task.command),
            Style::default().fg(Color::Magenta),
        ));
    }
    rows.push(Row::plain(Line::from(spans)));

    let Some(output) = &task.output else {
        return;
    };
    let action = RowAction::OpenOutput {
        text: output.clone(),
    };
    for (i, text) in output.lines().enumerate() {
        let line = Line::styled(
            format!("        │ {text}"),
            Style::default().fg(Color::Gray),
        );
        rows.push(Row {
            line,
            action: Some(action.clone()),
            selectable: i == 0,
        });
    }
}

fn error_line(indent: usize, text: &str) -> Line<'static> {
    Line::styled(
        format!("{:indent$}! {text}", ""),
        Style::default().fg(Color::Red),
    )
}

fn badge_spans(badges: &[Badge]) -> Vec<Span<'static>> {
    badges
        .iter()
        .map(|b| Span::styled(format!(" [{}]", b.label()), badge_style(*b)))
        .collect()
}

fn badge_style(badge: Badge) -> Style {
    match badge {
        Badge::Local => Style::default().fg(Color::Blue),
        Badge::FetchError | Badge::Error | Badge::TaskFail => Style::default().fg(Color::Red).bold(),
        Badge::Changed => Style::default().fg(Color::Yellow),
        Badge::Unchanged => Style::default().fg(Color::DarkGray),
        Badge::Success | Badge::TaskOk => Style::default().fg(Color::Green),
    }
}
