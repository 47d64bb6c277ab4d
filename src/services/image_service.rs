use actix_web::web;
use moka::future::Cache;
use resvg::usvg::fontdb;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use crate::models::chart::{ChartRecord, StarTier};
use crate::models::listing::{RankingEntry, RankingKind};
use crate::models::recommend::{RecommendResponse, TierRecommendation};
use crate::utils::error::{AppError, AppResult};
use crate::utils::table_renderer::{
    self, heat_color, SegmentBar, TableCell, TableColumn, TableImage,
};

const TABLE_WIDTH: u32 = 1200;
const RANKING_WIDTH: u32 = 900;

/// ☆1 .. ☆5(虹) 的分布条颜色
const STAR_COLORS: [&str; 6] = ["#cfd8dc", "#90caf9", "#81c784", "#ffb74d", "#f06292", "#ba68c8"];

pub struct ImageService {
    font_db: Arc<fontdb::Database>,
    ranking_image_cache: Cache<(RankingKind, u64), Arc<Vec<u8>>>,
    render_semaphore: Arc<Semaphore>,
}

impl ImageService {
    pub fn new(fonts_dir: &Path, max_concurrent_renders: usize, ranking_ttl: Duration) -> Self {
        Self {
            font_db: table_renderer::load_font_db(fonts_dir),
            // 按 (种类, 谱面数据代号) 缓存，数据重新加载后旧图不再命中
            ranking_image_cache: Cache::builder()
                .max_capacity(8)
                .time_to_live(ranking_ttl)
                .build(),
            render_semaphore: Arc::new(Semaphore::new(max_concurrent_renders.max(1))),
        }
    }

    pub async fn recommend_image(
        &self,
        response: &RecommendResponse,
        tier: StarTier,
    ) -> AppResult<Vec<u8>> {
        let section = response
            .tiers
            .iter()
            .find(|t| t.tier == tier)
            .ok_or_else(|| AppError::InternalError(format!("没有 ☆{} 的选出结果", tier.value())))?;
        let table = recommend_table(response, section);
        self.render(table).await
    }

    pub async fn database_image(&self, rows: &[ChartRecord]) -> AppResult<Vec<u8>> {
        self.render(database_table(rows)).await
    }

    /// 排行图按种类和谱面数据代号缓存
    pub async fn ranking_image(
        &self,
        kind: RankingKind,
        generation: u64,
        entries: Vec<RankingEntry>,
    ) -> AppResult<Vec<u8>> {
        let key = (kind, generation);
        if let Some(cached) = self.ranking_image_cache.get(&key).await {
            log::debug!("排行图片缓存命中: {kind:?} 代号 {generation}");
            return Ok(cached.to_vec());
        }

        let bytes = self
            .ranking_image_cache
            .try_get_with(key, async {
                let png = self.render(ranking_table(kind, &entries)).await?;
                Ok::<_, AppError>(Arc::new(png))
            })
            .await
            .map_err(|e: Arc<AppError>| AppError::RenderError(e.to_string()))?;
        Ok(bytes.to_vec())
    }

    /// SVG 生成和光栅化都在阻塞线程池里做，并发数受信号量限制
    async fn render(&self, table: TableImage) -> AppResult<Vec<u8>> {
        let start = std::time::Instant::now();
        let permit = self
            .render_semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::InternalError(format!("Failed to acquire semaphore permit: {e}")))?;

        let font_db = self.font_db.clone();
        let rows = table.rows.len();
        let png = web::block(move || {
            let _permit = permit;
            let svg = table_renderer::generate_table_svg(&table)?;
            table_renderer::render_svg_to_png(&svg, font_db)
        })
        .await
        .map_err(|e| AppError::InternalError(format!("Blocking task join error: {e}")))??;

        log::info!("表格图片生成完成: {rows} 行, 耗时 {:?}", start.elapsed());
        Ok(png)
    }
}

fn star_bar(chart: &ChartRecord) -> SegmentBar {
    let counts = chart.star_counts();
    let total = chart.ps5_total_count.max(1) as f64;
    SegmentBar {
        segments: counts
            .iter()
            .zip(STAR_COLORS)
            .map(|(c, color)| (*c as f64 / total, color.to_string()))
            .collect(),
    }
}

pub fn recommend_table(response: &RecommendResponse, section: &TierRecommendation) -> TableImage {
    let tier = section.tier.value();
    let columns = vec![
        TableColumn::new("楽曲名", 8),
        TableColumn::new("難易度", 3),
        TableColumn::new("レベル", 2),
        TableColumn::new("譜面定数", 2),
        TableColumn::new(format!("☆{tier} rating"), 3),
        TableColumn::new("上昇量", 2),
        TableColumn::new("☆分布", 4),
    ];
    let rows = section
        .entries
        .iter()
        .map(|e| {
            let d = e.chart.difficulty_tier();
            vec![
                TableCell::title_for(&e.chart.music_name, d),
                TableCell::difficulty_for(&e.chart.difficulty, d),
                TableCell::text(&e.chart.level),
                TableCell::text(format!("{:.1}", e.chart.chart_const)),
                TableCell::text(format!("{:.3}", e.tier_rating)),
                TableCell::text(&e.expected_rise_text).bold(),
                TableCell::bar(star_bar(&e.chart)),
            ]
        })
        .collect();

    TableImage {
        title: format!(
            "{} ☆{tier} おすすめ曲 ({:.3} ～ {:.3})",
            response.player.name, response.band.min, response.band.max
        ),
        width: TABLE_WIDTH,
        columns,
        rows,
        footer: Some(format!("rating {:.3}", response.player.rating)),
    }
}

pub fn database_table(rows: &[ChartRecord]) -> TableImage {
    let headers = [
        ("楽曲名", 8),
        ("難易度", 3),
        ("レベル", 2),
        ("☆5(虹)", 2),
        ("☆5", 2),
        ("☆4", 2),
        ("☆3", 2),
        ("☆2", 2),
        ("☆1", 2),
        ("☆5合計", 2),
        ("譜面定数", 2),
        ("TS1位理論値回数", 3),
    ];
    let body = rows
        .iter()
        .map(|c| {
            let d = c.difficulty_tier();
            vec![
                TableCell::title_for(&c.music_name, d).font_size(15),
                TableCell::difficulty_for(&c.difficulty, d).font_size(15),
                TableCell::text(&c.level).font_size(15),
                TableCell::text(c.ps5_rainbow_count.to_string()).font_size(15),
                TableCell::text(c.ps5_count.to_string()).font_size(15),
                TableCell::text(c.ps4_count.to_string()).font_size(15),
                TableCell::text(c.ps3_count.to_string()).font_size(15),
                TableCell::text(c.ps2_count.to_string()).font_size(15),
                TableCell::text(c.ps1_count.to_string()).font_size(15),
                TableCell::text(c.ps5_total_count.to_string()).font_size(15).bold(),
                TableCell::text(format!("{:.1}", c.chart_const)).font_size(15),
                TableCell::text(c.ts1_theory_count.to_string()).font_size(15),
            ]
        })
        .collect();

    TableImage {
        title: format!("☆獲得人数一覧 ({}譜面)", rows.len()),
        width: TABLE_WIDTH,
        columns: headers
            .iter()
            .map(|(h, r)| TableColumn::new(*h, *r))
            .collect(),
        rows: body,
        footer: None,
    }
}

/// 次数格的背景色和文字色
fn count_colors(kind: RankingKind, count: u32, observed: (u32, u32)) -> (String, &'static str) {
    const TEXT: &str = "#293241";
    match kind {
        RankingKind::Ts1 if count >= 1000 => ("#222".to_string(), "#fff"),
        RankingKind::Ts1 => (heat_color((count as f64 - 10.0) / (999.0 - 10.0)), TEXT),
        RankingKind::Ps => {
            let (min, max) = observed;
            if max > min {
                (heat_color((count - min) as f64 / (max - min) as f64), TEXT)
            } else {
                ("#fff".to_string(), TEXT)
            }
        }
    }
}

pub fn ranking_table(kind: RankingKind, entries: &[RankingEntry]) -> TableImage {
    let observed = entries
        .iter()
        .map(|e| e.count)
        .fold(None, |acc: Option<(u32, u32)>, c| match acc {
            None => Some((c, c)),
            Some((lo, hi)) => Some((lo.min(c), hi.max(c))),
        })
        .unwrap_or((0, 0));

    let rows = entries
        .iter()
        .map(|e| {
            let d = e.chart.difficulty_tier();
            let (bg, fg) = count_colors(kind, e.count, observed);
            vec![
                TableCell::title_for(&e.chart.music_name, d),
                TableCell::difficulty_for(&e.chart.difficulty, d),
                TableCell::text(&e.chart.level),
                TableCell::text(e.count.to_string())
                    .bold()
                    .font_size(20)
                    .fill(bg)
                    .color(fg),
            ]
        })
        .collect();

    let title = match kind {
        RankingKind::Ts1 => "TS1位理論値回数ランキング",
        RankingKind::Ps => "PS理論値人数ランキング",
    };

    TableImage {
        title: title.to_string(),
        width: RANKING_WIDTH,
        columns: vec![
            TableColumn::new("Title", 8),
            TableColumn::new("Diff", 3),
            TableColumn::new("Lev", 2),
            TableColumn::new(kind.count_header(), 3),
        ],
        rows,
        footer: None,
    }
}
