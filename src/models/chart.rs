use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// 难度，按从低到高排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Difficulty {
    Basic,
    Advanced,
    Expert,
    Master,
    Lunatic,
}

impl Difficulty {
    pub const ALL: [Difficulty; 5] = [
        Difficulty::Basic,
        Difficulty::Advanced,
        Difficulty::Expert,
        Difficulty::Master,
        Difficulty::Lunatic,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Basic => "BASIC",
            Difficulty::Advanced => "ADVANCED",
            Difficulty::Expert => "EXPERT",
            Difficulty::Master => "MASTER",
            Difficulty::Lunatic => "LUNATIC",
        }
    }

    /// 接受完整名称或三字母缩写 (MAS / EXP / ...)，忽略大小写
    pub fn parse(s: &str) -> Option<Self> {
        let key = difficulty_prefix(s);
        Self::ALL
            .into_iter()
            .find(|d| d.as_str().starts_with(&key) && !key.is_empty())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 难度名前三个字符（大写），用于和玩家页面上的缩写对齐
pub fn difficulty_prefix(s: &str) -> String {
    s.trim().chars().take(3).collect::<String>().to_uppercase()
}

/// 目标星级，只支持 ☆3 / ☆4 / ☆5
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum StarTier {
    Three,
    Four,
    Five,
}

impl StarTier {
    pub const ALL_DESC: [StarTier; 3] = [StarTier::Five, StarTier::Four, StarTier::Three];

    pub fn value(self) -> u8 {
        match self {
            StarTier::Three => 3,
            StarTier::Four => 4,
            StarTier::Five => 5,
        }
    }
}

impl TryFrom<u8> for StarTier {
    type Error = String;

    fn try_from(v: u8) -> Result<Self, Self::Error> {
        match v {
            3 => Ok(StarTier::Three),
            4 => Ok(StarTier::Four),
            5 => Ok(StarTier::Five),
            other => Err(format!("対象の☆は3/4/5のいずれかです: {other}")),
        }
    }
}

impl From<StarTier> for u8 {
    fn from(t: StarTier) -> u8 {
        t.value()
    }
}

/// 曲目数据库中的一个谱面
///
/// 数据源没有严格的 schema，缺失的数值字段一律按 0 处理，字符串按空串处理。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct ChartRecord {
    #[serde(deserialize_with = "lenient_string")]
    pub music_name: String,
    #[serde(deserialize_with = "lenient_string")]
    pub difficulty: String,
    #[serde(deserialize_with = "lenient_string")]
    pub level: String,
    #[serde(deserialize_with = "lenient_f64")]
    pub chart_const: f64,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps5_rainbow_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps5_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps4_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps3_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps2_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps1_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps5_total_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ts1_theory_count: u32,
    #[serde(deserialize_with = "lenient_u32")]
    pub ps_theory_count: u32,
    #[serde(deserialize_with = "lenient_f64")]
    pub ps3_rating: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ps4_rating: f64,
    #[serde(deserialize_with = "lenient_f64")]
    pub ps5_rating: f64,
    #[serde(deserialize_with = "lenient_bool")]
    pub tech_flag: bool,
}

impl ChartRecord {
    pub fn tier_rating(&self, tier: StarTier) -> f64 {
        match tier {
            StarTier::Three => self.ps3_rating,
            StarTier::Four => self.ps4_rating,
            StarTier::Five => self.ps5_rating,
        }
    }

    pub fn difficulty_tier(&self) -> Option<Difficulty> {
        Difficulty::parse(&self.difficulty)
    }

    /// ソロver. 等别版本谱面
    pub fn is_solo_variant(&self) -> bool {
        self.music_name.contains("ソロver")
            || self.music_name.to_lowercase().contains("solo ver")
    }

    /// (曲名, 难度前缀)，和玩家成绩列表对齐时使用
    pub fn slot_key(&self) -> (String, String) {
        (self.music_name.clone(), difficulty_prefix(&self.difficulty))
    }

    /// 各星级人数，从 ☆1 到 ☆5(虹)
    pub fn star_counts(&self) -> [u32; 6] {
        [
            self.ps1_count,
            self.ps2_count,
            self.ps3_count,
            self.ps4_count,
            self.ps5_count,
            self.ps5_rainbow_count,
        ]
    }
}

// --- 宽松的反序列化：数字、数字字符串、null 都接受 ---

#[derive(Deserialize)]
#[serde(untagged)]
enum Loose {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

fn lenient_f64<'de, D: Deserializer<'de>>(de: D) -> Result<f64, D::Error> {
    Ok(match Option::<Loose>::deserialize(de)? {
        Some(Loose::Int(i)) => i as f64,
        Some(Loose::Float(f)) if f.is_finite() => f,
        Some(Loose::Str(s)) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()).unwrap_or(0.0),
        _ => 0.0,
    })
}

fn lenient_u32<'de, D: Deserializer<'de>>(de: D) -> Result<u32, D::Error> {
    let v = match Option::<Loose>::deserialize(de)? {
        Some(Loose::Int(i)) => i as f64,
        Some(Loose::Float(f)) => f,
        Some(Loose::Str(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if v.is_finite() && v > 0.0 {
        Ok(v.min(u32::MAX as f64) as u32)
    } else {
        Ok(0)
    }
}

fn lenient_string<'de, D: Deserializer<'de>>(de: D) -> Result<String, D::Error> {
    Ok(match Option::<Loose>::deserialize(de)? {
        Some(Loose::Str(s)) => s,
        Some(Loose::Int(i)) => i.to_string(),
        Some(Loose::Float(f)) => f.to_string(),
        Some(Loose::Bool(b)) => b.to_string(),
        _ => String::new(),
    })
}

fn lenient_bool<'de, D: Deserializer<'de>>(de: D) -> Result<bool, D::Error> {
    Ok(match Option::<Loose>::deserialize(de)? {
        Some(Loose::Bool(b)) => b,
        Some(Loose::Int(i)) => i != 0,
        Some(Loose::Str(s)) => matches!(s.trim().to_lowercase().as_str(), "true" | "1" | "yes"),
        _ => false,
    })
}
