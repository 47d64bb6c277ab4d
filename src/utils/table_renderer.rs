use resvg::tiny_skia::{Pixmap, Transform};
use resvg::usvg::{self, fontdb, Options as UsvgOptions};
use std::fmt::Write;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use crate::models::chart::Difficulty;
use crate::utils::error::{AppError, AppResult};

// 配色
const BACKGROUND: &str = "#e0fbfc";
const HEADER_FILL: &str = "#3d5a80";
const GRID: &str = "#98c1d9";
const TEXT: &str = "#293241";
const ACCENT: &str = "#ee6c4d";
const CELL_FILL: &str = "#fff";

// 布局
const ROW_HEIGHT: u32 = 38;
const TITLE_AREA: u32 = 60;
const SIDE_MARGIN: u32 = 18;
const BOTTOM_AREA: u32 = 60;
const BORDER_WIDTH: u32 = 12;
const CELL_TEXT_PADDING: f64 = 8.0;

const MAIN_FONT_FAMILY: &str = "Noto Sans CJK JP";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Start,
    Middle,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SegmentBar {
    /// (比例, 颜色)。每段各自截断到 [0, 1]，按顺序叠画
    pub segments: Vec<(f64, String)>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CellContent {
    Text(String),
    Bar(SegmentBar),
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableCell {
    pub content: CellContent,
    pub fill: String,
    pub color: String,
    pub bold: bool,
    pub font_size: u32,
    pub align: Align,
}

impl TableCell {
    pub fn text(s: impl Into<String>) -> Self {
        Self {
            content: CellContent::Text(s.into()),
            fill: CELL_FILL.to_string(),
            color: TEXT.to_string(),
            bold: false,
            font_size: 18,
            align: Align::Middle,
        }
    }

    pub fn bar(bar: SegmentBar) -> Self {
        Self {
            content: CellContent::Bar(bar),
            ..Self::text("")
        }
    }

    pub fn bold(mut self) -> Self {
        self.bold = true;
        self
    }

    pub fn align_start(mut self) -> Self {
        self.align = Align::Start;
        self
    }

    pub fn fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = fill.into();
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = color.into();
        self
    }

    pub fn font_size(mut self, size: u32) -> Self {
        self.font_size = size;
        self
    }

    /// 曲名格：按难度着色背景
    pub fn title_for(name: &str, difficulty: Option<Difficulty>) -> Self {
        Self::text(name)
            .bold()
            .align_start()
            .fill(difficulty_fill(difficulty))
    }

    /// 难度格：按难度着色文字
    pub fn difficulty_for(label: &str, difficulty: Option<Difficulty>) -> Self {
        Self::text(label).bold().color(difficulty_color(difficulty))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    pub header: String,
    /// 列宽比例
    pub ratio: u32,
}

impl TableColumn {
    pub fn new(header: impl Into<String>, ratio: u32) -> Self {
        Self {
            header: header.into(),
            ratio,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TableImage {
    pub title: String,
    pub width: u32,
    pub columns: Vec<TableColumn>,
    pub rows: Vec<Vec<TableCell>>,
    pub footer: Option<String>,
}

impl TableImage {
    pub fn height(&self) -> u32 {
        TITLE_AREA + ROW_HEIGHT * (self.rows.len() as u32 + 1) + BOTTOM_AREA
    }

    /// 各列像素宽度，最后一列吃掉取整误差
    fn column_widths(&self) -> Vec<u32> {
        let inner = self.width.saturating_sub(SIDE_MARGIN * 2);
        let total: u32 = self.columns.iter().map(|c| c.ratio).sum::<u32>().max(1);
        let mut widths: Vec<u32> = self
            .columns
            .iter()
            .map(|c| ((inner as f64) * c.ratio as f64 / total as f64).round() as u32)
            .collect();
        let used: u32 = widths.iter().sum();
        if let Some(last) = widths.last_mut() {
            *last = (*last + inner).saturating_sub(used);
        }
        widths
    }
}

pub fn difficulty_fill(difficulty: Option<Difficulty>) -> &'static str {
    match difficulty {
        Some(Difficulty::Master) => "#f3e6fa",
        Some(Difficulty::Expert) => "#fde6f3",
        Some(Difficulty::Advanced) => "#fff2e0",
        Some(Difficulty::Basic) => "#e6fae6",
        Some(Difficulty::Lunatic) => "#f3f3f3",
        None => CELL_FILL,
    }
}

pub fn difficulty_color(difficulty: Option<Difficulty>) -> &'static str {
    match difficulty {
        Some(Difficulty::Master) => "#a259e6",
        Some(Difficulty::Expert) => "#e0408a",
        Some(Difficulty::Advanced) => "#ff9800",
        Some(Difficulty::Basic) => "#7ed957",
        Some(Difficulty::Lunatic) => "#222",
        None => TEXT,
    }
}

/// 白 -> 黄 的热度色，ratio 超出范围时截断
pub fn heat_color(ratio: f64) -> String {
    let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
    let b = (255.0 * (1.0 - ratio)).round() as u8;
    format!("rgb(255,255,{b})")
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

/// 估算文字宽度：全角按字号算，半角按一半多一点
fn estimate_text_width(text: &str, font_size: u32) -> f64 {
    fn is_full_width(ch: char) -> bool {
        ('\u{3000}'..='\u{30FF}').contains(&ch)
            || ('\u{4E00}'..='\u{9FFF}').contains(&ch)
            || ('\u{FF00}'..='\u{FFEF}').contains(&ch)
            || ('\u{2600}'..='\u{27BF}').contains(&ch)
    }
    let size = font_size as f64;
    text.chars()
        .map(|ch| if is_full_width(ch) { size } else { size * 0.55 })
        .sum()
}

fn write_border(svg: &mut String, y: u32, width: u32) -> std::fmt::Result {
    let split = (width as f64 * 0.3).floor() as u32;
    writeln!(
        svg,
        r#"<line x1="0" y1="{y}" x2="{split}" y2="{y}" stroke="{ACCENT}" stroke-width="{BORDER_WIDTH}" />"#
    )?;
    writeln!(
        svg,
        r#"<line x1="{split}" y1="{y}" x2="{width}" y2="{y}" stroke="{HEADER_FILL}" stroke-width="{BORDER_WIDTH}" />"#
    )
}

fn write_text(
    svg: &mut String,
    text: &str,
    x: f64,
    cell_width: f64,
    center_y: f64,
    cell: &TableCell,
) -> std::fmt::Result {
    if text.is_empty() {
        return Ok(());
    }
    let max_width = (cell_width - CELL_TEXT_PADDING * 2.0).max(1.0);
    let (anchor, tx) = match cell.align {
        Align::Start => ("start", x + CELL_TEXT_PADDING + 4.0),
        Align::Middle => ("middle", x + cell_width / 2.0),
    };
    let weight = if cell.bold { "bold" } else { "normal" };
    let squeeze = if estimate_text_width(text, cell.font_size) > max_width {
        let avail = match cell.align {
            Align::Start => max_width - 4.0,
            Align::Middle => max_width,
        };
        format!(r#" textLength="{avail:.1}" lengthAdjust="spacingAndGlyphs""#)
    } else {
        String::new()
    };
    writeln!(
        svg,
        r#"<text x="{tx:.1}" y="{center_y:.1}" dominant-baseline="central" text-anchor="{anchor}" font-size="{}" font-weight="{weight}" fill="{}"{squeeze}>{}</text>"#,
        cell.font_size,
        cell.color,
        escape_xml(text)
    )
}

fn write_bar(svg: &mut String, bar: &SegmentBar, x: f64, y: f64, w: f64, h: f64) -> std::fmt::Result {
    let bar_x = x + CELL_TEXT_PADDING;
    let bar_w = (w - CELL_TEXT_PADDING * 2.0).max(0.0);
    let bar_h = (h * 0.4).round();
    let bar_y = y + (h - bar_h) / 2.0;
    writeln!(
        svg,
        r##"<rect x="{bar_x:.1}" y="{bar_y:.1}" width="{bar_w:.1}" height="{bar_h:.1}" fill="#eef3f7" />"##
    )?;
    for (ratio, color) in &bar.segments {
        let ratio = if ratio.is_finite() { ratio.clamp(0.0, 1.0) } else { 0.0 };
        if ratio == 0.0 {
            continue;
        }
        let seg_w = bar_w * ratio;
        writeln!(
            svg,
            r#"<rect x="{bar_x:.1}" y="{bar_y:.1}" width="{seg_w:.1}" height="{bar_h:.1}" fill="{color}" />"#
        )?;
    }
    Ok(())
}

/// 生成表格 SVG
pub fn generate_table_svg(table: &TableImage) -> AppResult<String> {
    let fmt_err = |e: std::fmt::Error| AppError::RenderError(format!("SVG formatting error: {e}"));

    let width = table.width;
    let height = table.height();
    let widths = table.column_widths();

    let mut svg = String::with_capacity(4096 + table.rows.len() * 1024);
    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}" font-family="{MAIN_FONT_FAMILY}, sans-serif">"#
    )
    .map_err(fmt_err)?;
    writeln!(svg, r#"<rect width="{width}" height="{height}" fill="{BACKGROUND}" />"#).map_err(fmt_err)?;

    write_border(&mut svg, 0, width).map_err(fmt_err)?;
    write_border(&mut svg, height.saturating_sub(1), width).map_err(fmt_err)?;

    // 标题
    writeln!(
        svg,
        r#"<text x="{SIDE_MARGIN}" y="{:.1}" dominant-baseline="central" font-size="22" font-weight="bold" fill="{TEXT}">{}</text>"#,
        (BORDER_WIDTH + TITLE_AREA) as f64 / 2.0,
        escape_xml(&table.title)
    )
    .map_err(fmt_err)?;

    // 表头
    let mut x = SIDE_MARGIN as f64;
    for (col, w) in table.columns.iter().zip(&widths) {
        let w = *w as f64;
        writeln!(
            svg,
            r#"<rect x="{x:.1}" y="{TITLE_AREA}" width="{w:.1}" height="{ROW_HEIGHT}" fill="{HEADER_FILL}" stroke="{GRID}" />"#
        )
        .map_err(fmt_err)?;
        let header_cell = TableCell::text(col.header.as_str())
            .bold()
            .color("#fff")
            .font_size(16);
        write_text(
            &mut svg,
            &col.header,
            x,
            w,
            TITLE_AREA as f64 + ROW_HEIGHT as f64 / 2.0,
            &header_cell,
        )
        .map_err(fmt_err)?;
        x += w;
    }

    // 正文
    for (r, row) in table.rows.iter().enumerate() {
        let y = (TITLE_AREA + ROW_HEIGHT * (r as u32 + 1)) as f64;
        let mut x = SIDE_MARGIN as f64;
        for (cell, w) in row.iter().zip(&widths) {
            let w = *w as f64;
            writeln!(
                svg,
                r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{ROW_HEIGHT}" fill="{}" stroke="{GRID}" />"#,
                cell.fill
            )
            .map_err(fmt_err)?;
            match &cell.content {
                CellContent::Text(text) => {
                    write_text(&mut svg, text, x, w, y + ROW_HEIGHT as f64 / 2.0, cell)
                        .map_err(fmt_err)?
                }
                CellContent::Bar(bar) => {
                    write_bar(&mut svg, bar, x, y, w, ROW_HEIGHT as f64).map_err(fmt_err)?
                }
            }
            x += w;
        }
    }

    if let Some(footer) = &table.footer {
        writeln!(
            svg,
            r#"<text x="{}" y="{}" text-anchor="end" font-size="14" fill="{GRID}">{}</text>"#,
            width - SIDE_MARGIN,
            height - BORDER_WIDTH - 16,
            escape_xml(footer)
        )
        .map_err(fmt_err)?;
    }

    writeln!(svg, "</svg>").map_err(fmt_err)?;
    Ok(svg)
}

/// 加载系统字体和自定义字体目录下的 ttf/otf
pub fn load_font_db(fonts_dir: &Path) -> Arc<fontdb::Database> {
    let mut font_db = fontdb::Database::new();
    font_db.load_system_fonts();

    if let Ok(entries) = fs::read_dir(fonts_dir) {
        for entry in entries.flatten() {
            let path = entry.path();
            let is_font = path
                .extension()
                .and_then(|e| e.to_str())
                .is_some_and(|e| e.eq_ignore_ascii_case("ttf") || e.eq_ignore_ascii_case("otf"));
            if path.is_file() && is_font {
                if let Err(e) = font_db.load_font_file(&path) {
                    log::error!("加载字体文件失败 '{}': {}", path.display(), e);
                }
            }
        }
    } else {
        log::warn!("字体目录不存在: {}", fonts_dir.display());
    }

    log::info!("字体数据库初始化完成，共 {} 个字体", font_db.len());
    Arc::new(font_db)
}

pub fn render_svg_to_png(svg_data: &str, font_db: Arc<fontdb::Database>) -> AppResult<Vec<u8>> {
    let opts = UsvgOptions {
        fontdb: font_db,
        font_family: MAIN_FONT_FAMILY.to_string(),
        font_size: 16.0,
        languages: vec!["ja".to_string(), "en".to_string()],
        shape_rendering: usvg::ShapeRendering::GeometricPrecision,
        text_rendering: usvg::TextRendering::OptimizeLegibility,
        image_rendering: usvg::ImageRendering::OptimizeQuality,
        ..Default::default()
    };

    let tree = usvg::Tree::from_data(svg_data.as_bytes(), &opts)
        .map_err(|e| AppError::RenderError(format!("Failed to parse SVG: {e}")))?;

    let size = tree.size().to_int_size();
    // 画布分配失败相当于 canvas 不可用
    let mut pixmap = Pixmap::new(size.width(), size.height())
        .ok_or_else(|| AppError::RenderError("Failed to create pixmap".to_string()))?;

    resvg::render(&tree, Transform::default(), &mut pixmap.as_mut());

    pixmap
        .encode_png()
        .map_err(|e| AppError::RenderError(format!("Failed to encode PNG: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> TableImage {
        TableImage {
            title: "Sample <&>".to_string(),
            width: 900,
            columns: vec![TableColumn::new("Title", 8), TableColumn::new("Diff", 3)],
            rows: vec![vec![
                TableCell::title_for(&"とても長い曲名".repeat(6), Some(Difficulty::Master)),
                TableCell::difficulty_for("MASTER", Some(Difficulty::Master)),
            ]],
            footer: Some("footer".to_string()),
        }
    }

    #[test]
    fn svg_contains_banding_borders_and_escaped_text() {
        let svg = generate_table_svg(&sample()).unwrap();
        assert!(svg.contains("#f3e6fa"));
        assert!(svg.contains("#a259e6"));
        assert!(svg.contains(ACCENT));
        assert!(svg.contains("Sample &lt;&amp;&gt;"));
        assert!(svg.contains("textLength"));
        assert!(svg.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn wide_text_is_compressed_to_cell() {
        let cell = TableCell::text("ABCDEFGHIJKLMNOPQRSTUVWXYZ");
        let mut svg = String::new();
        write_text(&mut svg, "ABCDEFGHIJKLMNOPQRSTUVWXYZ", 0.0, 100.0, 19.0, &cell).unwrap();
        assert!(svg.contains(r#"textLength="84.0" lengthAdjust="spacingAndGlyphs""#));

        let mut start = String::new();
        let cell = cell.align_start();
        write_text(&mut start, "ABCDEFGHIJKLMNOPQRSTUVWXYZ", 0.0, 100.0, 19.0, &cell).unwrap();
        assert!(start.contains(r#"textLength="80.0""#));

        let mut short = String::new();
        write_text(&mut short, "AB", 0.0, 100.0, 19.0, &TableCell::text("AB")).unwrap();
        assert!(!short.contains("textLength"));
    }

    #[test]
    fn svg_is_deterministic() {
        assert_eq!(
            generate_table_svg(&sample()).unwrap(),
            generate_table_svg(&sample()).unwrap()
        );
    }

    #[test]
    fn column_widths_fill_inner_width() {
        let mut table = sample();
        table.columns = vec![
            TableColumn::new("a", 8),
            TableColumn::new("b", 3),
            TableColumn::new("c", 2),
            TableColumn::new("d", 3),
        ];
        let widths = table.column_widths();
        assert_eq!(widths.iter().sum::<u32>(), 900 - SIDE_MARGIN * 2);
    }

    #[test]
    fn bar_segments_are_clamped_independently() {
        let bar = SegmentBar {
            segments: vec![(1.7, "#111".to_string()), (-0.2, "#222".to_string()), (0.5, "#333".to_string())],
        };
        let mut svg = String::new();
        write_bar(&mut svg, &bar, 0.0, 0.0, 116.0, 38.0).unwrap();
        assert!(svg.contains(r##"width="100.0" height="15.0" fill="#111""##));
        assert!(!svg.contains("#222"));
        assert!(svg.contains(r##"width="50.0" height="15.0" fill="#333""##));
    }

    #[test]
    fn heat_color_runs_white_to_yellow() {
        assert_eq!(heat_color(0.0), "rgb(255,255,255)");
        assert_eq!(heat_color(1.0), "rgb(255,255,0)");
        assert_eq!(heat_color(5.0), "rgb(255,255,0)");
    }

    #[test]
    fn png_render_produces_png_bytes() {
        let svg = generate_table_svg(&sample()).unwrap();
        let png = render_svg_to_png(&svg, Arc::new(fontdb::Database::new())).unwrap();
        assert_eq!(&png[..8], b"\x89PNG\r\n\x1a\n");
    }
}
