//! Results view: run status plus the filtered, sorted bot result table.

use crate::services::{NumericRange, ResultFilters, ResultTable, RunAggregate, SortField};
use crate::types::{BotResultSummary, Notice, SimulationRun};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Gauge, Paragraph, Row, Table, TableState},
    Frame,
};

use super::Theme;

/// Columns shown in the table, in order.
pub const COLUMNS: [SortField; 9] = [
    SortField::BotIndex,
    SortField::TotalProfit,
    SortField::WinRate,
    SortField::TotalTrades,
    SortField::AverageProfit,
    SortField::AverageLoss,
    SortField::SharpeRatio,
    SortField::MaxDrawdown,
    SortField::FinalPortfolioValue,
];

/// Filter field currently being typed into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterInput {
    Query,
    MinProfit,
    MaxProfit,
    MinWinRate,
    MaxWinRate,
    MinTrades,
    MaxTrades,
}

impl FilterInput {
    pub fn prompt(&self) -> &'static str {
        match self {
            FilterInput::Query => "Bot search",
            FilterInput::MinProfit => "Min profit",
            FilterInput::MaxProfit => "Max profit",
            FilterInput::MinWinRate => "Min win rate",
            FilterInput::MaxWinRate => "Max win rate",
            FilterInput::MinTrades => "Min trades",
            FilterInput::MaxTrades => "Max trades",
        }
    }

    /// Write the typed text into `filters`. An empty or unparseable bound
    /// clears it.
    pub fn apply(&self, text: &str, filters: &mut ResultFilters) {
        let bound = parse_bound(text);
        match self {
            FilterInput::Query => filters.query = text.trim().to_string(),
            FilterInput::MinProfit => filters.profit.min = bound,
            FilterInput::MaxProfit => filters.profit.max = bound,
            FilterInput::MinWinRate => filters.win_rate.min = bound,
            FilterInput::MaxWinRate => filters.win_rate.max = bound,
            FilterInput::MinTrades => filters.trade_count.min = bound,
            FilterInput::MaxTrades => filters.trade_count.max = bound,
        }
    }

    /// Current value of the field, as the editor's starting text.
    pub fn current(&self, filters: &ResultFilters) -> String {
        let bound = |b: Option<f64>| b.map(|v| v.to_string()).unwrap_or_default();
        match self {
            FilterInput::Query => filters.query.clone(),
            FilterInput::MinProfit => bound(filters.profit.min),
            FilterInput::MaxProfit => bound(filters.profit.max),
            FilterInput::MinWinRate => bound(filters.win_rate.min),
            FilterInput::MaxWinRate => bound(filters.win_rate.max),
            FilterInput::MinTrades => bound(filters.trade_count.min),
            FilterInput::MaxTrades => bound(filters.trade_count.max),
        }
    }
}

/// Parse a typed bound; blank or non-numeric input means "no bound".
pub fn parse_bound(text: &str) -> Option<f64> {
    text.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// One-line description of the active filters.
pub fn filter_summary(filters: &ResultFilters) -> String {
    fn range(name: &str, r: &NumericRange) -> Option<String> {
        match (r.min, r.max) {
            (Some(min), Some(max)) => Some(format!("{} {}..{}", name, min, max)),
            (Some(min), None) => Some(format!("{} ≥ {}", name, min)),
            (None, Some(max)) => Some(format!("{} ≤ {}", name, max)),
            (None, None) => None,
        }
    }

    let mut parts: Vec<String> = [
        range("profit", &filters.profit),
        range("win rate", &filters.win_rate),
        range("trades", &filters.trade_count),
    ]
    .into_iter()
    .flatten()
    .collect();
    if !filters.query.trim().is_empty() {
        parts.push(format!("bot ~ \"{}\"", filters.query.trim()));
    }

    if parts.is_empty() {
        "none".to_string()
    } else {
        parts.join(", ")
    }
}

/// Everything the Results tab draws from.
pub struct ResultsContext<'a> {
    pub run: Option<&'a SimulationRun>,
    pub table: &'a ResultTable,
    pub aggregate: &'a RunAggregate,
    pub notices: &'a [Notice],
    pub selected: usize,
    /// Field and text being edited, if any.
    pub editing: Option<(FilterInput, &'a str)>,
    pub last_refresh: Option<String>,
}

/// Render the results view.
pub fn render(frame: &mut Frame, area: Rect, ctx: &ResultsContext<'_>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(5), // Run status
            Constraint::Length(3), // Filters
            Constraint::Min(0),    // Table
        ])
        .split(area);

    render_run(frame, chunks[0], ctx, theme);
    render_filters(frame, chunks[1], ctx, theme);
    render_table(frame, chunks[2], ctx, theme);
}

fn render_run(frame: &mut Frame, area: Rect, ctx: &ResultsContext<'_>, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    let mut lines = Vec::new();
    match ctx.run {
        Some(run) => {
            let (completed, total) = run.bot_counts();
            lines.push(Line::from(vec![
                Span::styled(run.name.clone().unwrap_or_else(|| format!("Run {}", run.id)), theme.title()),
                Span::raw("  "),
                Span::styled(run.status.to_string(), status_style(run, theme)),
                Span::styled(format!("  bots {}/{}", completed, total), theme.muted()),
            ]));
            if let (Some(start), Some(end)) = (run.execution_start_date, run.execution_end_date) {
                lines.push(Line::from(Span::styled(
                    format!("{} → {}", start, end),
                    theme.muted(),
                )));
            }
            if let Some(ref message) = run.error_message {
                lines.push(Line::from(Span::styled(message.clone(), theme.error())));
            }
        }
        None => lines.push(Line::from(Span::styled("Run not loaded", theme.muted()))),
    }
    if let Some(notice) = ctx.notices.first() {
        lines.push(Line::from(Span::styled(notice.message.clone(), theme.notice(notice.level))));
    }

    let block = Paragraph::new(lines).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Simulation")
            .border_style(theme.border()),
    );
    frame.render_widget(block, chunks[0]);

    let agg = ctx.aggregate;
    let progress = ctx.run.map(SimulationRun::progress_pct).unwrap_or(0.0);
    let label = format!(
        "{:.0}%  {} profitable of {}  avg {:.2}",
        progress, agg.profitable, agg.bots, agg.mean_profit
    );
    let title = match ctx.last_refresh {
        Some(ref at) => format!("Progress (updated {})", at),
        None => "Progress".to_string(),
    };
    let gauge = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title(title).border_style(theme.border()))
        .gauge_style(theme.success())
        .ratio(progress / 100.0)
        .label(label);
    frame.render_widget(gauge, chunks[1]);
}

fn status_style(run: &SimulationRun, theme: &Theme) -> ratatui::style::Style {
    use crate::types::RunStatus;
    match run.status {
        RunStatus::Completed => theme.success(),
        RunStatus::Failed | RunStatus::Cancelled => theme.error(),
        RunStatus::Running => theme.info(),
        _ => theme.warning(),
    }
}

fn render_filters(frame: &mut Frame, area: Rect, ctx: &ResultsContext<'_>, theme: &Theme) {
    let line = match ctx.editing {
        Some((field, text)) => Line::from(vec![
            Span::styled(format!("{}: ", field.prompt()), theme.header()),
            Span::raw(text.to_string()),
            Span::styled("█", theme.muted()),
            Span::styled("  (Enter apply, Esc cancel)", theme.muted()),
        ]),
        None => Line::from(vec![
            Span::styled("Filters: ", theme.muted()),
            Span::raw(filter_summary(ctx.table.filters())),
            Span::styled(
                "   / search  p/P profit  w/W win rate  t/T trades (min/max)  x clear  s sort  r reverse",
                theme.muted(),
            ),
        ]),
    };

    let block = Paragraph::new(line).block(Block::default().borders(Borders::ALL).border_style(theme.border()));
    frame.render_widget(block, area);
}

fn render_table(frame: &mut Frame, area: Rect, ctx: &ResultsContext<'_>, theme: &Theme) {
    let sort = ctx.table.sort();
    let header = Row::new(COLUMNS.iter().map(|field| {
        let label = if *field == sort.field {
            format!("{} {}", field.label(), sort.direction.arrow())
        } else {
            field.label().to_string()
        };
        Cell::from(label).style(theme.header())
    }));

    let rows: Vec<Row> = ctx.table.visible().map(|row| result_row(row, theme)).collect();
    let widths = [
        Constraint::Length(8),
        Constraint::Length(12),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(10),
        Constraint::Length(8),
        Constraint::Length(8),
        Constraint::Min(12),
    ];

    let title = format!("Bot Results ({})", ctx.table.count_label());
    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title).border_style(theme.border()))
        .highlight_style(theme.selected());

    let mut state = TableState::default().with_selected(Some(ctx.selected));
    frame.render_stateful_widget(table, area, &mut state);
}

fn result_row<'a>(row: &BotResultSummary, theme: &Theme) -> Row<'a> {
    let cells = COLUMNS.iter().map(|field| {
        let metric = field.metric(row);
        let text = match (field, metric) {
            (SortField::BotIndex, Some(m)) => m.to_plain_string(),
            (SortField::TotalTrades, Some(m)) => format!("{:.0}", m),
            (_, Some(m)) => format!("{:.2}", m),
            (_, None) => "-".to_string(),
        };
        let style = match field {
            SortField::TotalProfit | SortField::AverageProfit | SortField::AverageLoss => {
                theme.profit(metric.and_then(|m| m.value()))
            }
            _ => ratatui::style::Style::default(),
        };
        Cell::from(text).style(style)
    });
    Row::new(cells)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound(" 100 "), Some(100.0));
        assert_eq!(parse_bound("-2.5"), Some(-2.5));
        assert_eq!(parse_bound(""), None);
        assert_eq!(parse_bound("abc"), None);
        assert_eq!(parse_bound("inf"), None);
    }

    #[test]
    fn test_filter_input_apply() {
        let mut filters = ResultFilters::default();
        FilterInput::MinProfit.apply("100", &mut filters);
        FilterInput::Query.apply(" 12 ", &mut filters);
        assert_eq!(filters.profit.min, Some(100.0));
        assert_eq!(filters.query, "12");
        assert_eq!(FilterInput::MinProfit.current(&filters), "100");

        FilterInput::MinProfit.apply("", &mut filters);
        assert_eq!(filters.profit.min, None);
    }

    #[test]
    fn test_filter_input_max_bounds() {
        let mut filters = ResultFilters::default();
        FilterInput::MinTrades.apply("10", &mut filters);
        FilterInput::MaxTrades.apply("100", &mut filters);
        FilterInput::MaxProfit.apply("-5", &mut filters);
        FilterInput::MaxWinRate.apply("abc", &mut filters);

        assert_eq!(filters.trade_count, NumericRange::between(10.0, 100.0));
        assert_eq!(filters.profit.max, Some(-5.0));
        assert_eq!(filters.profit.min, None);
        assert_eq!(filters.win_rate.max, None);
        assert_eq!(FilterInput::MaxTrades.current(&filters), "100");
        assert_eq!(filter_summary(&filters), "profit ≤ -5, trades 10..100");
    }

    #[test]
    fn test_max_bound_limits_rows() {
        let rows: Vec<BotResultSummary> = serde_json::from_value(serde_json::json!([
            {"total_trades": 5},
            {"total_trades": 50},
            {"total_trades": 500}
        ]))
        .unwrap();
        let mut table = ResultTable::new(rows);
        table.update_filters(|f| FilterInput::MaxTrades.apply("50", f));

        assert_eq!(table.count_label(), "2 of 3");
    }

    #[test]
    fn test_filter_summary() {
        assert_eq!(filter_summary(&ResultFilters::default()), "none");

        let filters = ResultFilters {
            profit: NumericRange::at_least(100.0),
            trade_count: NumericRange::between(5.0, 50.0),
            query: "7".to_string(),
            ..ResultFilters::default()
        };
        assert_eq!(filter_summary(&filters), "profit ≥ 100, trades 5..50, bot ~ \"7\"");
    }
}
