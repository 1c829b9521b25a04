use crate::app::{App, Input, Level, Panel};
use ratatui::{
    buffer::Buffer,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, Widget, Wrap},
    Frame,
};
use waste_map::braille::BrailleCanvas;
use waste_map::map::{format_tons, legend_ticks, MapLayers};
use waste_map::table::{SortKey, SortOrder};
use waste_map::types::Rgb;

const PANEL_WIDTH: u16 = 36;
const LEGEND_HEIGHT: u16 = 2;

struct Areas {
    map: Rect,
    panel: Option<Rect>,
    legend: Rect,
    status: Rect,
}

fn split(area: Rect, panel_open: bool) -> Areas {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(3),                // Map and panel
            Constraint::Length(LEGEND_HEIGHT), // Legend
            Constraint::Length(1),             // Status bar
        ])
        .split(area);

    let (map, panel) = if panel_open {
        let cols = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(PANEL_WIDTH)])
            .split(rows[0]);
        (cols[0], Some(cols[1]))
    } else {
        (rows[0], None)
    };

    Areas {
        map,
        panel,
        legend: rows[1],
        status: rows[2],
    }
}

fn map_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

/// Inner map rectangle for a terminal of `area`, shared with mouse handling
pub fn map_inner(area: Rect, panel_open: bool) -> Rect {
    map_block(String::new()).inner(split(area, panel_open).map)
}

fn rgb(c: Rgb) -> Color {
    Color::Rgb(c.r, c.g, c.b)
}

/// Render the UI
pub fn render(frame: &mut Frame, app: &App) {
    let areas = split(frame.area(), app.panel_open());

    if app.show_table {
        render_table(frame, app, areas.map);
    } else {
        render_map(frame, app, areas.map);
    }
    if let Some(panel) = areas.panel {
        render_panel(frame, app, panel);
    }
    render_legend(frame, app, areas.legend);
    render_status_bar(frame, app, areas.status);

    if let Some(company) = &app.open_company {
        render_company_card(frame, company, areas.map);
    }
}

fn render_map(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" {} · {} ", app.level.title(), app.kind.label());
    let block = map_block(title);
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut viewport = app.viewport.clone();
    // Braille gives 2x4 resolution per character
    viewport.width = inner.width as usize * 2;
    viewport.height = inner.height as usize * 4;

    let layers = app
        .map_renderer
        .render(inner.width as usize, inner.height as usize, &viewport, &app.overlay());

    let tooltip = app.mouse_pos.and_then(|(col, row)| {
        let text = app.tooltip()?;
        let cx = col.checked_sub(inner.x)?;
        let cy = row.checked_sub(inner.y)?;
        (cx < inner.width && cy < inner.height).then_some((cx, cy, text))
    });

    frame.render_widget(MapWidget { layers, tooltip }, inner);
}

/// Braille map with text labels and the hover tooltip overlaid
struct MapWidget {
    layers: MapLayers,
    tooltip: Option<(u16, u16, String)>,
}

impl MapWidget {
    /// Render a braille canvas layer with a specific color
    fn render_layer(&self, canvas: &BrailleCanvas, style: Style, area: Rect, buf: &mut Buffer) {
        for (row_idx, row_str) in canvas.rows().enumerate() {
            if row_idx >= area.height as usize {
                break;
            }
            let y = area.y + row_idx as u16;

            for (col_idx, ch) in row_str.chars().enumerate() {
                if col_idx >= area.width as usize {
                    break;
                }
                // Skip empty braille characters (U+2800)
                if ch == '\u{2800}' {
                    continue;
                }
                let x = area.x + col_idx as u16;
                buf[(x, y)].set_char(ch).set_style(style);
            }
        }
    }
}

impl Widget for MapWidget {
    fn render(self, area: Rect, buf: &mut Buffer) {
        for fill in &self.layers.fills {
            self.render_layer(&fill.canvas, Style::default().fg(rgb(fill.color)), area, buf);
        }
        self.render_layer(&self.layers.borders, Style::default().fg(Color::DarkGray), area, buf);
        self.render_layer(
            &self.layers.highlight,
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            area,
            buf,
        );
        self.render_layer(&self.layers.companies, Style::default().fg(Color::Blue), area, buf);
        self.render_layer(&self.layers.matches, Style::default().fg(Color::Magenta), area, buf);
        self.render_layer(&self.layers.user, Style::default().fg(Color::Red), area, buf);

        let label_style = Style::default().fg(Color::Black).add_modifier(Modifier::BOLD);
        for (lx, ly, text) in &self.layers.labels {
            if *ly >= area.height {
                continue;
            }
            let width = Span::raw(text.as_str()).width() as u16;
            let x = lx.saturating_sub(width / 2);
            if x >= area.width {
                continue;
            }
            let max = (area.width - x) as usize;
            buf.set_stringn(area.x + x, area.y + ly, text, max, label_style);
        }

        if let Some((cx, cy, text)) = &self.tooltip {
            let lines: Vec<&str> = text.lines().collect();
            let width = lines.iter().map(|l| Span::raw(*l).width()).max().unwrap_or(0) as u16 + 2;
            let height = lines.len() as u16;
            // below-right of the cursor, flipped when it would leave the map
            let x = if cx + 1 + width <= area.width { cx + 1 } else { cx.saturating_sub(width) };
            let y = if cy + 1 + height <= area.height { cy + 1 } else { cy.saturating_sub(height) };
            let style = Style::default().fg(Color::White).bg(Color::DarkGray);
            for (i, line) in lines.iter().enumerate() {
                let row = area.y + y + i as u16;
                if row >= area.y + area.height {
                    break;
                }
                let pad = (width as usize - 1).saturating_sub(Span::raw(*line).width());
                let padded = format!(" {}{}", line, " ".repeat(pad));
                buf.set_stringn(area.x + x, row, padded, (area.width - x) as usize, style);
            }
            buf[(area.x + cx, area.y + cy)].set_char('╋').set_fg(Color::Red);
        }
    }
}

fn render_table(frame: &mut Frame, app: &App, area: Rect) {
    let arrow = |key: SortKey| {
        if app.table.key != key {
            ""
        } else if app.table.order == SortOrder::Ascending {
            " ▲"
        } else {
            " ▼"
        }
    };
    let searching = app.input == Some(Input::TableSearch);
    let title = format!(
        " {} · {} · 검색: {}{} ",
        app.level.title(),
        app.kind.label(),
        app.table.search,
        if searching { "▏" } else { "" }
    );

    let header = Row::new(vec![
        Cell::from(format!("지역{}", arrow(SortKey::Name))),
        Cell::from(format!("폐기물량{}", arrow(SortKey::Value))),
    ])
    .style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));

    let rows = app.table.rows(&app.stats).into_iter().map(|(name, value)| {
        let style = if app.selected.as_deref() == Some(name.as_str()) {
            Style::default().fg(Color::Yellow)
        } else {
            Style::default()
        };
        Row::new(vec![Cell::from(name.clone()), Cell::from(format_tons(*value))]).style(style)
    });

    let table = Table::new(rows, [Constraint::Percentage(50), Constraint::Percentage(50)])
        .header(header)
        .block(map_block(title));
    frame.render_widget(table, area);
}

fn render_panel(frame: &mut Frame, app: &App, area: Rect) {
    let heading = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let dim = Style::default().fg(Color::DarkGray);

    let (title, lines): (String, Vec<Line>) = match &app.panel {
        Panel::Closed => return,
        Panel::Nearby(hits) => (
            format!(" 반경 {:.1}km 내 업체 {} ", app.config.nearby.radius_km, hits.len()),
            hits.iter()
                .map(|(e, d)| {
                    Line::from(vec![
                        Span::raw(e.name.clone()),
                        Span::styled(format!(" {:.2}km", d), dim),
                    ])
                })
                .collect(),
        ),
        Panel::InRegion { region, companies } => (
            format!(" {} 업체 {} ", region, companies.len()),
            companies
                .iter()
                .map(|e| {
                    Line::from(vec![
                        Span::raw(e.name.clone()),
                        Span::styled(format!(" {}", e.waste_type), dim),
                    ])
                })
                .collect(),
        ),
        Panel::Regions(names) => (
            format!(" 지역 목록 {} ", names.len()),
            names
                .iter()
                .map(|n| {
                    if app.selected.as_deref() == Some(n.as_str()) {
                        Line::from(Span::styled(n.clone(), Style::default().fg(Color::Yellow)))
                    } else {
                        Line::from(n.clone())
                    }
                })
                .collect(),
        ),
    };

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(dim)
        .title(Span::styled(title, heading));
    let lines = if lines.is_empty() {
        vec![Line::from(Span::styled("결과 없음", dim))]
    } else {
        lines
    };
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_company_card(frame: &mut Frame, company: &waste_map::types::Entity, map: Rect) {
    let width = 40.min(map.width);
    let height = 7.min(map.height);
    let area = Rect::new(
        map.x + (map.width - width) / 2,
        map.y + (map.height - height) / 2,
        width,
        height,
    );
    let label = Style::default().fg(Color::DarkGray);
    let lines = vec![
        Line::from(vec![Span::styled("대표자 ", label), Span::raw(company.representative.clone())]),
        Line::from(vec![Span::styled("연락처 ", label), Span::raw(company.phone.clone())]),
        Line::from(vec![Span::styled("폐기물 ", label), Span::raw(company.waste_type.clone())]),
        Line::from(vec![
            Span::styled("위치   ", label),
            Span::raw(format!("{:.5}, {:.5}", company.coordinate.lat, company.coordinate.lng)),
        ]),
    ];
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Magenta))
        .title(Span::styled(
            format!(" {} ", company.name),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        ));
    frame.render_widget(Clear, area);
    frame.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

/// Color bar across the scale's domain with tick labels underneath
fn render_legend(frame: &mut Frame, app: &App, area: Rect) {
    let Some(scale) = app.map_renderer.choropleth.as_ref().and_then(|c| c.scale.as_ref()) else {
        let text = if app.is_loading() { " 불러오는 중…" } else { " 데이터 없음" };
        frame.render_widget(Paragraph::new(Span::styled(text, Style::default().fg(Color::DarkGray))), area);
        return;
    };

    let fallback = app.config.scale.fallback;
    let no_data = " 데이터 없음 ";
    let no_data_width = Span::raw(no_data).width() as u16 + 2;
    let bar_width = area.width.saturating_sub(no_data_width + 2).max(1);

    let stops = scale.stops();
    let mut bar: Vec<Span> = vec![Span::raw(" ")];
    for i in 0..bar_width {
        let bucket = (i as usize * stops.len() / bar_width as usize).min(stops.len() - 1);
        bar.push(Span::styled("█", Style::default().fg(rgb(stops[bucket]))));
    }
    bar.push(Span::raw(" "));
    bar.push(Span::styled("██", Style::default().fg(rgb(fallback))));
    bar.push(Span::styled(no_data, Style::default().fg(Color::DarkGray)));

    let count = match app.level {
        Level::National => app.config.scale.province_ticks,
        Level::District { .. } => app.config.scale.district_ticks,
    };
    let mut tick_line = String::new();
    let mut cursor = 0usize;
    for tick in legend_ticks(scale, count) {
        let width = Span::raw(tick.label.as_str()).width();
        let anchor = 1 + (tick.position * (bar_width.saturating_sub(1)) as f64).round() as usize;
        let start = anchor.saturating_sub(width / 2).min((bar_width as usize + 1).saturating_sub(width));
        if start < cursor {
            continue;
        }
        tick_line.push_str(&" ".repeat(start - cursor));
        tick_line.push_str(&tick.label);
        cursor = start + width;
    }

    let lines = vec![
        Line::from(bar),
        Line::from(Span::styled(tick_line, Style::default().fg(Color::Gray))),
    ];
    frame.render_widget(Paragraph::new(lines), area);
}

fn render_status_bar(frame: &mut Frame, app: &App, area: Rect) {
    if app.input == Some(Input::CompanySearch) {
        let prompt = Line::from(vec![
            Span::styled(" 업체명: ", Style::default().fg(Color::Yellow)),
            Span::raw(app.company_query.clone()),
            Span::styled("▏ Enter:찾기 Esc:취소", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(prompt), area);
        return;
    }

    let settings = &app.map_renderer.settings;
    let toggle = |on: bool, on_text: &'static str, off_text: &'static str| {
        Span::styled(
            if on { on_text } else { off_text },
            Style::default().fg(if on { Color::Green } else { Color::DarkGray }),
        )
    };

    let help = if app.show_table {
        " | n/v:정렬 /:검색 Tab:지도 q:종료"
    } else {
        " | t:유형 Enter:시군구 ⌫:전국 [/]:지역 g:목록 Tab:표 /:업체 e:CSV q:종료"
    };

    let status = Line::from(vec![
        Span::styled(format!(" {} ", app.kind.label()), Style::default().fg(Color::Black).bg(Color::Cyan)),
        Span::styled(" Zoom: ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.zoom_level(), Style::default().fg(Color::Yellow)),
        Span::raw(" "),
        toggle(settings.show_fills, "[F]ill ", "[f]ill "),
        toggle(settings.show_borders, "[B]order ", "[b]order "),
        toggle(settings.show_labels, "[L]abel ", "[l]abel "),
        toggle(settings.show_companies, "[C]ompany ", "[c]ompany "),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.center_coords(), Style::default().fg(Color::Cyan)),
        Span::styled(" | ", Style::default().fg(Color::DarkGray)),
        Span::styled(app.status.clone(), Style::default().fg(Color::White)),
        Span::styled(help, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(status), area);
}
