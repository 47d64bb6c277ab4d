use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

use crate::models::chart::StarTier;
use crate::models::listing::{ListingSort, SortOrder, LEVELS};
use crate::models::recommend::{DEFAULT_RESULT_COUNT, MAX_RESULT_COUNT, MIN_RESULT_COUNT};

/// 冒险地图的显示类别
pub const MAP_OPTION_KEYS: [&str; 7] = ["music", "card", "story", "keydoor", "plate", "drop", "other"];
const DEFAULT_MAP_SCALE: f64 = 0.67;
const DEFAULT_MAP_OFFSETS: [f64; 2] = [-954.0, -987.0];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct RecommendPreferences {
    pub exclude_technical: bool,
    pub count: u32,
    #[schema(value_type = u8)]
    pub tier: StarTier,
    pub band_floor: Option<f64>,
    pub exclude_lowest: Option<usize>,
}

impl Default for RecommendPreferences {
    fn default() -> Self {
        Self {
            exclude_technical: false,
            count: DEFAULT_RESULT_COUNT,
            tier: StarTier::Five,
            band_floor: None,
            exclude_lowest: None,
        }
    }
}

/// 地图的显示类别、已走过的格子、缩放和平移
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct MapPreferences {
    pub options: Vec<String>,
    pub actives: Vec<u32>,
    pub scale: f64,
    pub offsets: [f64; 2],
}

impl Default for MapPreferences {
    fn default() -> Self {
        Self {
            options: MAP_OPTION_KEYS.iter().map(|k| k.to_string()).collect(),
            actives: Vec::new(),
            scale: DEFAULT_MAP_SCALE,
            offsets: DEFAULT_MAP_OFFSETS,
        }
    }
}

impl MapPreferences {
    fn from_stored(raw: Option<&Value>) -> Self {
        let defaults = Self::default();
        let options = raw
            .and_then(|m| m.get("options"))
            .and_then(Value::as_array)
            .map(|arr| normalize_map_options(arr.iter().filter_map(Value::as_str)))
            .unwrap_or(defaults.options);
        let actives = raw
            .and_then(|m| m.get("actives"))
            .and_then(Value::as_array)
            .map(|arr| {
                normalize_actives(
                    arr.iter()
                        .filter_map(Value::as_u64)
                        .filter_map(|id| u32::try_from(id).ok())
                        .collect(),
                )
            })
            .unwrap_or(defaults.actives);
        let scale = raw
            .and_then(|m| m.get("scale"))
            .and_then(Value::as_f64)
            .filter(|s| s.is_finite() && *s > 0.0)
            .unwrap_or(defaults.scale);
        let offsets = raw
            .and_then(|m| m.get("offsets"))
            .and_then(Value::as_array)
            .and_then(|arr| match arr.as_slice() {
                [x, y] => Some([x.as_f64()?, y.as_f64()?]),
                _ => None,
            })
            .filter(|o| o.iter().all(|v| v.is_finite()))
            .unwrap_or(defaults.offsets);
        Self {
            options,
            actives,
            scale,
            offsets,
        }
    }

    fn normalized(mut self) -> Self {
        self.options = normalize_map_options(self.options.iter().map(String::as_str));
        self.actives = normalize_actives(self.actives);
        if !(self.scale.is_finite() && self.scale > 0.0) {
            self.scale = DEFAULT_MAP_SCALE;
        }
        if !self.offsets.iter().all(|v| v.is_finite()) {
            self.offsets = DEFAULT_MAP_OFFSETS;
        }
        self
    }
}

/// 页面上的筛选设置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct Preferences {
    pub levels: Vec<String>,
    pub sort: ListingSort,
    pub order: SortOrder,
    pub exclude_technical: bool,
    pub recommend: RecommendPreferences,
    pub map: MapPreferences,
}

impl Preferences {
    /// 从保存的 JSON 恢复。旧格式或损坏的字段逐个回退到默认值，不会整体报错
    pub fn from_stored(raw: &Value) -> Self {
        let defaults = Self::default();

        let levels = raw
            .get("levels")
            .and_then(Value::as_array)
            .map(|arr| normalize_levels(arr.iter().filter_map(Value::as_str)))
            .unwrap_or(defaults.levels);

        let sort = raw
            .get("sort")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(defaults.sort);
        let order = raw
            .get("order")
            .and_then(|v| serde_json::from_value(v.clone()).ok())
            .unwrap_or(defaults.order);
        let exclude_technical = raw
            .get("exclude_technical")
            .and_then(Value::as_bool)
            .unwrap_or(defaults.exclude_technical);

        let rec = raw.get("recommend");
        let rec_defaults = RecommendPreferences::default();
        let recommend = RecommendPreferences {
            exclude_technical: rec
                .and_then(|r| r.get("exclude_technical"))
                .and_then(Value::as_bool)
                .unwrap_or(rec_defaults.exclude_technical),
            count: rec
                .and_then(|r| r.get("count"))
                .and_then(Value::as_u64)
                .filter(|c| (MIN_RESULT_COUNT as u64..=MAX_RESULT_COUNT as u64).contains(c))
                .map(|c| c as u32)
                .unwrap_or(rec_defaults.count),
            tier: rec
                .and_then(|r| r.get("tier"))
                .and_then(Value::as_u64)
                .and_then(|t| u8::try_from(t).ok())
                .and_then(|t| StarTier::try_from(t).ok())
                .unwrap_or(rec_defaults.tier),
            band_floor: rec
                .and_then(|r| r.get("band_floor"))
                .and_then(Value::as_f64)
                .filter(|f| f.is_finite()),
            exclude_lowest: rec
                .and_then(|r| r.get("exclude_lowest"))
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok()),
        };

        Self {
            levels,
            sort,
            order,
            exclude_technical,
            recommend,
            map: MapPreferences::from_stored(raw.get("map")),
        }
    }

    /// 保存前的整理：去掉未知等级并按一览顺序排列
    pub fn normalized(mut self) -> Self {
        self.levels = normalize_levels(self.levels.iter().map(String::as_str));
        self.recommend.count = self.recommend.count.clamp(MIN_RESULT_COUNT, MAX_RESULT_COUNT);
        self.recommend.band_floor = self.recommend.band_floor.filter(|f| f.is_finite());
        self.map = self.map.normalized();
        self
    }
}

fn normalize_levels<'a, I: Iterator<Item = &'a str>>(levels: I) -> Vec<String> {
    let picked: Vec<&str> = levels.collect();
    LEVELS
        .iter()
        .filter(|l| picked.contains(l))
        .map(|l| l.to_string())
        .collect()
}

fn normalize_map_options<'a, I: Iterator<Item = &'a str>>(options: I) -> Vec<String> {
    let picked: Vec<&str> = options.collect();
    MAP_OPTION_KEYS
        .iter()
        .filter(|k| picked.contains(k))
        .map(|k| k.to_string())
        .collect()
}

fn normalize_actives(mut actives: Vec<u32>) -> Vec<u32> {
    actives.sort_unstable();
    actives.dedup();
    actives
}
