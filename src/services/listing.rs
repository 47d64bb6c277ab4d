use std::cmp::Ordering;
use std::sync::Arc;

use crate::models::chart::ChartRecord;
use crate::models::listing::{
    ListingQuery, ListingSort, RankingEntry, RankingKind, SortOrder, LEVELS, MAX_LISTING_ROWS,
};
use crate::services::catalog::CatalogService;
use crate::utils::error::{AppError, AppResult};

/// ☆人数一览和理论值排行
pub struct ListingService {
    catalog: Arc<CatalogService>,
}

impl ListingService {
    pub fn new(catalog: Arc<CatalogService>) -> Self {
        Self { catalog }
    }

    pub async fn database(&self, query: &ListingQuery) -> AppResult<Vec<ChartRecord>> {
        validate_levels(&query.levels)?;
        let catalog = self.catalog.load().await?;
        build_database(&catalog, query)
    }

    pub async fn ranking(&self, kind: RankingKind) -> AppResult<Vec<RankingEntry>> {
        Ok(self.ranking_with_generation(kind).await?.1)
    }

    /// 排行连同所依据的谱面数据代号一起返回
    pub async fn ranking_with_generation(
        &self,
        kind: RankingKind,
    ) -> AppResult<(u64, Vec<RankingEntry>)> {
        let (generation, catalog) = self.catalog.load_with_generation().await?;
        Ok((generation, build_ranking(&catalog, kind)))
    }
}

pub fn validate_levels(levels: &[String]) -> AppResult<()> {
    if levels.is_empty() {
        return Err(AppError::NoLevelSelected);
    }
    if let Some(unknown) = levels.iter().find(|l| !LEVELS.contains(&l.as_str())) {
        return Err(AppError::ValidationError(format!("不明なレベルです: {unknown}")));
    }
    Ok(())
}

fn sort_keys(chart: &ChartRecord, sort: ListingSort) -> [f64; 8] {
    let c = chart;
    match sort {
        ListingSort::Star => [
            c.ps5_total_count as f64,
            c.ps4_count as f64,
            c.ps3_count as f64,
            c.ps2_count as f64,
            c.ps1_count as f64,
            c.ps5_rainbow_count as f64,
            c.chart_const,
            c.ts1_theory_count as f64,
        ],
        ListingSort::Const => [
            c.chart_const,
            c.ps5_total_count as f64,
            c.ps4_count as f64,
            c.ps3_count as f64,
            c.ps2_count as f64,
            c.ps1_count as f64,
            c.ps5_rainbow_count as f64,
            c.ts1_theory_count as f64,
        ],
    }
}

/// 按等级过滤后多键排序，排序方向对每个键都生效
pub fn build_database(catalog: &[ChartRecord], query: &ListingQuery) -> AppResult<Vec<ChartRecord>> {
    validate_levels(&query.levels)?;

    let mut rows: Vec<&ChartRecord> = catalog
        .iter()
        .filter(|c| query.levels.iter().any(|l| *l == c.level))
        .filter(|c| !(query.exclude_technical && c.tech_flag))
        .collect();

    if rows.len() > MAX_LISTING_ROWS {
        return Err(AppError::TooManyRows(rows.len()));
    }

    rows.sort_by(|a, b| {
        let ka = sort_keys(a, query.sort);
        let kb = sort_keys(b, query.sort);
        let ord = ka
            .iter()
            .zip(kb.iter())
            .map(|(x, y)| x.total_cmp(y))
            .find(|o| *o != Ordering::Equal)
            .unwrap_or(Ordering::Equal);
        match query.order {
            SortOrder::Desc => ord.reverse(),
            SortOrder::Asc => ord,
        }
    });

    log::debug!(
        "一览生成: levels={:?}, sort={:?}, order={:?}, {} 行",
        query.levels,
        query.sort,
        query.order,
        rows.len()
    );
    Ok(rows.into_iter().cloned().collect())
}

/// 次数达到门槛的谱面，次数降序、定数降序
pub fn build_ranking(catalog: &[ChartRecord], kind: RankingKind) -> Vec<RankingEntry> {
    let mut picked: Vec<&ChartRecord> = catalog
        .iter()
        .filter(|c| kind.count_of(c) >= kind.threshold())
        .collect();
    picked.sort_by(|a, b| {
        kind.count_of(b)
            .cmp(&kind.count_of(a))
            .then_with(|| b.chart_const.total_cmp(&a.chart_const))
    });
    picked
        .into_iter()
        .enumerate()
        .map(|(i, chart)| RankingEntry {
            rank: i + 1,
            count: kind.count_of(chart),
            chart: chart.clone(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chart(name: &str, level: &str, ps5_total: u32, constant: f64) -> ChartRecord {
        ChartRecord {
            music_name: name.to_string(),
            difficulty: "MASTER".to_string(),
            level: level.to_string(),
            chart_const: constant,
            ps5_total_count: ps5_total,
            ..Default::default()
        }
    }

    fn query(levels: &[&str], sort: ListingSort, order: SortOrder) -> ListingQuery {
        ListingQuery {
            levels: levels.iter().map(|l| l.to_string()).collect(),
            sort,
            order,
            ..Default::default()
        }
    }

    fn names(rows: &[ChartRecord]) -> Vec<&str> {
        rows.iter().map(|c| c.music_name.as_str()).collect()
    }

    #[test]
    fn empty_selection_is_rejected() {
        let err = build_database(&[], &query(&[], ListingSort::Star, SortOrder::Desc)).unwrap_err();
        assert!(matches!(err, AppError::NoLevelSelected));
        assert_eq!(err.to_string(), "レベルが選択されていません");
        assert!(build_database(&[], &query(&["16"], ListingSort::Star, SortOrder::Desc)).is_err());
    }

    #[test]
    fn star_sort_uses_const_as_tiebreak_and_order_flips_all_keys() {
        let catalog = vec![
            chart("low", "14", 5, 14.5),
            chart("high", "14", 50, 14.0),
            chart("tie-big-const", "14", 5, 14.9),
            chart("other-level", "13", 99, 13.0),
        ];
        let desc = build_database(&catalog, &query(&["14"], ListingSort::Star, SortOrder::Desc)).unwrap();
        assert_eq!(names(&desc), vec!["high", "tie-big-const", "low"]);

        let asc = build_database(&catalog, &query(&["14"], ListingSort::Star, SortOrder::Asc)).unwrap();
        assert_eq!(names(&asc), vec!["low", "tie-big-const", "high"]);
    }

    #[test]
    fn const_sort_leads_with_chart_constant() {
        let catalog = vec![chart("a", "14", 50, 14.0), chart("b", "14", 1, 14.7)];
        let rows = build_database(&catalog, &query(&["14"], ListingSort::Const, SortOrder::Desc)).unwrap();
        assert_eq!(names(&rows), vec!["b", "a"]);
    }

    #[test]
    fn technical_charts_can_be_excluded() {
        let mut tech = chart("tech", "14", 1, 14.0);
        tech.tech_flag = true;
        let catalog = vec![tech, chart("plain", "14", 1, 14.0)];
        let mut q = query(&["14"], ListingSort::Star, SortOrder::Desc);
        q.exclude_technical = true;
        assert_eq!(names(&build_database(&catalog, &q).unwrap()), vec!["plain"]);
    }

    #[test]
    fn oversized_result_asks_for_narrower_selection() {
        let catalog: Vec<ChartRecord> = (0..=MAX_LISTING_ROWS)
            .map(|i| chart(&format!("s{i}"), "13", 1, 13.0))
            .collect();
        let err = build_database(&catalog, &query(&["13"], ListingSort::Star, SortOrder::Desc)).unwrap_err();
        assert!(matches!(err, AppError::TooManyRows(n) if n == MAX_LISTING_ROWS + 1));
    }

    #[test]
    fn ranking_applies_threshold_and_order() {
        let mut a = chart("a", "14", 0, 14.0);
        a.ts1_theory_count = 9;
        let mut b = chart("b", "14", 0, 14.0);
        b.ts1_theory_count = 30;
        let mut c = chart("c", "14", 0, 14.5);
        c.ts1_theory_count = 30;
        c.ps_theory_count = 1;

        let ts1 = build_ranking(&[a.clone(), b.clone(), c.clone()], RankingKind::Ts1);
        let order: Vec<(&str, usize)> = ts1.iter().map(|e| (e.chart.music_name.as_str(), e.rank)).collect();
        assert_eq!(order, vec![("c", 1), ("b", 2)]);

        let ps = build_ranking(&[a, b, c], RankingKind::Ps);
        assert_eq!(ps.len(), 1);
        assert_eq!(ps[0].count, 1);
    }
}
