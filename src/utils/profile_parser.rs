use scraper::{ElementRef, Html, Selector};

use crate::models::player::{PlayerProfile, PlayerSlotEntry};
use crate::utils::error::{AppError, AppResult};

const NAME_SELECTOR: &str = ".player-name";
const STAT_ROW_SELECTOR: &str = "tr";
const SLOT_ROW_SELECTOR: &str = "table.platinum-score tbody tr";
const RATING_LABELS: [&str; 2] = ["レーティング", "rating"];

/// 玩家 rating 页面解析器
///
/// 页面结构由第三方决定，这里只依赖三处：玩家名、统计表里的 rating 行、P 分数枠表格。
/// 任意一处缺失都视为解析失败，不返回部分结果。
pub struct ProfileParser {
    name: Selector,
    stat_row: Selector,
    slot_row: Selector,
    th: Selector,
    td: Selector,
}

fn selector(css: &str) -> AppResult<Selector> {
    Selector::parse(css).map_err(|e| AppError::InternalError(format!("无效的选择器 '{css}': {e}")))
}

impl ProfileParser {
    pub fn new() -> AppResult<Self> {
        Ok(Self {
            name: selector(NAME_SELECTOR)?,
            stat_row: selector(STAT_ROW_SELECTOR)?,
            slot_row: selector(SLOT_ROW_SELECTOR)?,
            th: selector("th")?,
            td: selector("td")?,
        })
    }

    pub fn parse(&self, html: &str) -> AppResult<PlayerProfile> {
        let doc = Html::parse_document(html);

        let name = doc
            .select(&self.name)
            .map(|el| element_text(&el))
            .find(|s| !s.is_empty())
            .ok_or_else(|| AppError::ProfileParseFailed("找不到玩家名".to_string()))?;

        let rating = self
            .aggregate_rating(&doc)
            .ok_or_else(|| AppError::ProfileParseFailed(format!("找不到玩家 '{name}' 的 rating")))?;

        let slots: Vec<PlayerSlotEntry> = doc
            .select(&self.slot_row)
            .enumerate()
            .filter_map(|(i, row)| self.parse_slot_row(i, &row))
            .collect();

        if slots.is_empty() {
            return Err(AppError::ProfileParseFailed(format!(
                "玩家 '{name}' 的 P 分数枠为空"
            )));
        }

        log::debug!(
            "解析玩家页面完成: name={name}, rating={rating:.3}, 枠内 {} 项",
            slots.len()
        );

        Ok(PlayerProfile { name, rating, slots })
    }

    fn aggregate_rating(&self, doc: &Html) -> Option<f64> {
        doc.select(&self.stat_row).find_map(|row| {
            let label = row.select(&self.th).next().map(|th| element_text(&th))?;
            let label = label.to_lowercase();
            if !RATING_LABELS.iter().any(|l| label.contains(l)) {
                return None;
            }
            row.select(&self.td)
                .next()
                .and_then(|td| first_number(&element_text(&td)))
        })
    }

    fn parse_slot_row(&self, index: usize, row: &ElementRef<'_>) -> Option<PlayerSlotEntry> {
        let cells: Vec<String> = row.select(&self.td).map(|td| element_text(&td)).collect();
        if cells.len() < 6 {
            log::trace!("跳过列数不足的行: {cells:?}");
            return None;
        }
        let title = cells[1].clone();
        if title.is_empty() {
            return None;
        }
        let rank = first_number(&cells[0])
            .filter(|n| *n >= 1.0)
            .map(|n| n as u32)
            .unwrap_or(index as u32 + 1);

        Some(PlayerSlotEntry {
            rank,
            title,
            difficulty: cells[2].clone(),
            level: cells[3].clone(),
            star: parse_star(&cells[4]),
            rating: first_number(&cells[5]),
        })
    }
}

/// 元素内全部文本，空白压缩为单个空格
fn element_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

/// 取文本中的第一个数字，例如 "15.123 (MAX 15.2)" -> 15.123
fn first_number(s: &str) -> Option<f64> {
    let start = s.find(|c: char| c.is_ascii_digit())?;
    let rest = &s[start..];
    let end = rest
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(rest.len());
    rest[..end].trim_end_matches('.').parse().ok()
}

/// "☆5" / "5" / "★★★" 都接受，空白返回 None
fn parse_star(s: &str) -> Option<u8> {
    if let Some(n) = first_number(s) {
        return u8::try_from(n as u64).ok();
    }
    let filled = s.chars().filter(|c| *c == '★').count();
    if filled > 0 {
        u8::try_from(filled).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(slots: &str) -> String {
        format!(
            r#"<html><body>
            <article class="user-info">
              <h2 class="player-name">  ＰＬＡＹＥＲ  </h2>
              <table class="rating-stats">
                <tr><th>Battle Point</th><td>12345</td></tr>
                <tr><th>レーティング</th><td>15.432 (MAX 15.500)</td></tr>
              </table>
            </article>
            <table class="platinum-score">
              <thead><tr><th>#</th><th>Title</th><th>Diff</th><th>Lv</th><th>Star</th><th>Rating</th></tr></thead>
              <tbody>{slots}</tbody>
            </table>
            </body></html>"#
        )
    }

    #[test]
    fn parses_name_rating_and_slots() {
        let html = page(
            r#"<tr><td>1</td><td>Singularity</td><td>MAS</td><td>14+</td><td>☆5</td><td>1.314</td></tr>
               <tr><td>2</td><td>Song B</td><td>EXP</td><td>13</td><td></td><td>-</td></tr>
               <tr><td>3</td><td>Song C</td><td>MAS</td><td>14</td><td>★★★</td><td>1.002</td></tr>"#,
        );
        let profile = ProfileParser::new().unwrap().parse(&html).unwrap();
        assert_eq!(profile.name, "ＰＬＡＹＥＲ");
        assert!((profile.rating - 15.432).abs() < 1e-9);
        assert_eq!(profile.slots.len(), 3);
        assert_eq!(profile.slots[0].star, Some(5));
        assert_eq!(profile.slots[0].rating, Some(1.314));
        assert_eq!(profile.slots[1].star, None);
        assert_eq!(profile.slots[1].rating, None);
        assert_eq!(profile.slots[2].star, Some(3));
        assert_eq!(profile.slots[2].difficulty, "MAS");
    }

    #[test]
    fn empty_slot_table_fails_whole_parse() {
        let err = ProfileParser::new().unwrap().parse(&page("")).unwrap_err();
        assert!(matches!(err, AppError::ProfileParseFailed(_)));
    }

    #[test]
    fn missing_name_fails() {
        let html = page(r#"<tr><td>1</td><td>A</td><td>MAS</td><td>14</td><td>5</td><td>1.0</td></tr>"#)
            .replace("player-name", "someone-else");
        assert!(ProfileParser::new().unwrap().parse(&html).is_err());
    }

    #[test]
    fn missing_rating_fails() {
        let html = page(r#"<tr><td>1</td><td>A</td><td>MAS</td><td>14</td><td>5</td><td>1.0</td></tr>"#)
            .replace("レーティング", "Money");
        assert!(ProfileParser::new().unwrap().parse(&html).is_err());
    }

    #[test]
    fn number_helpers() {
        assert_eq!(first_number("abc 12.5 def"), Some(12.5));
        assert_eq!(first_number("3."), Some(3.0));
        assert_eq!(first_number("-"), None);
        assert_eq!(parse_star("☆4"), Some(4));
        assert_eq!(parse_star(" "), None);
    }
}
