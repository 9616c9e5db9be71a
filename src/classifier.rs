use crate::armor::ArmorRecord;
use crate::datatypes::BipedFlags;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 护甲槽位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SlotTag {
    Head,
    Body,
    Hands,
    Feet,
    Shield,
    Unknown,
}

impl SlotTag {
    /// 全部槽位，也是多重匹配时的优先顺序
    pub const ALL: [SlotTag; 6] = [
        SlotTag::Head,
        SlotTag::Body,
        SlotTag::Hands,
        SlotTag::Feet,
        SlotTag::Shield,
        SlotTag::Unknown,
    ];
}

impl fmt::Display for SlotTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SlotTag::Head => "头部 (Head)",
            SlotTag::Body => "身体 (Body)",
            SlotTag::Hands => "手部 (Hands)",
            SlotTag::Feet => "脚部 (Feet)",
            SlotTag::Shield => "盾牌 (Shield)",
            SlotTag::Unknown => "未知 (Unknown)",
        };
        write!(f, "{}", label)
    }
}

/// 护甲分类器 trait
///
/// 纯函数：不能失败，无法判断时返回 `SlotTag::Unknown`。
/// 分类只用于分组展示，`Unknown` 记录同样展示给操作员。
pub trait Classifier: Send + Sync {
    fn classify(&self, record: &ArmorRecord) -> SlotTag;
}

impl<F> Classifier for F
where
    F: Fn(&ArmorRecord) -> SlotTag + Send + Sync,
{
    fn classify(&self, record: &ArmorRecord) -> SlotTag {
        self(record)
    }
}

/// 分类策略（配置文件中的 `classifier` 字段）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    #[default]
    Keyword,
    Biped,
}

impl ClassifierKind {
    pub fn build(self) -> Box<dyn Classifier> {
        match self {
            ClassifierKind::Keyword => Box::new(KeywordClassifier::default()),
            ClassifierKind::Biped => Box::new(BipedSlotClassifier),
        }
    }
}

/// 各槽位关键词（小写）
const HEAD_KEYWORDS: &[&str] = &["helm", "hood", "circlet", "crown", "mask", "cowl", "head"];
const BODY_KEYWORDS: &[&str] = &[
    "cuirass", "robe", "body", "chest", "outfit", "dress", "clothes", "hauberk", "jerkin", "tunic",
];
const HANDS_KEYWORDS: &[&str] = &["gauntlet", "glove", "bracer", "hand"];
const FEET_KEYWORDS: &[&str] = &["boot", "shoe", "feet", "foot", "greave", "sabaton", "sandal"];
const SHIELD_KEYWORDS: &[&str] = &["shield", "buckler"];

/// 基于名称关键词的默认分类器
///
/// 对显示标识做大小写不敏感的子串匹配，按 Head → Body → Hands → Feet → Shield
/// 的顺序取第一个命中的槽位。
#[derive(Debug, Clone)]
pub struct KeywordClassifier {
    table: Vec<(SlotTag, Vec<String>)>,
}

impl Default for KeywordClassifier {
    fn default() -> Self {
        let owned = |words: &[&str]| words.iter().map(|w| w.to_string()).collect();
        KeywordClassifier {
            table: vec![
                (SlotTag::Head, owned(HEAD_KEYWORDS)),
                (SlotTag::Body, owned(BODY_KEYWORDS)),
                (SlotTag::Hands, owned(HANDS_KEYWORDS)),
                (SlotTag::Feet, owned(FEET_KEYWORDS)),
                (SlotTag::Shield, owned(SHIELD_KEYWORDS)),
            ],
        }
    }
}

impl KeywordClassifier {
    /// 使用自定义关键词表（表顺序即优先顺序，关键词会转为小写）
    pub fn with_table(table: Vec<(SlotTag, Vec<String>)>) -> Self {
        let table = table
            .into_iter()
            .map(|(tag, words)| (tag, words.into_iter().map(|w| w.to_lowercase()).collect()))
            .collect();
        KeywordClassifier { table }
    }

    /// 按名称分类
    pub fn classify_name(&self, name: &str) -> SlotTag {
        let name = name.to_lowercase();
        self.table
            .iter()
            .find(|(_, words)| words.iter().any(|w| !w.is_empty() && name.contains(w.as_str())))
            .map(|(tag, _)| *tag)
            .unwrap_or(SlotTag::Unknown)
    }
}

impl Classifier for KeywordClassifier {
    fn classify(&self, record: &ArmorRecord) -> SlotTag {
        self.classify_name(&record.display_name())
    }
}

/// 基于 BOD2/BODT Biped 槽位标志的分类器
///
/// 没有槽位信息的记录归为 `Unknown`。
#[derive(Debug, Clone, Default)]
pub struct BipedSlotClassifier;

impl BipedSlotClassifier {
    pub fn classify_flags(flags: BipedFlags) -> SlotTag {
        if flags.intersects(BipedFlags::HEAD | BipedFlags::HAIR | BipedFlags::CIRCLET) {
            SlotTag::Head
        } else if flags.contains(BipedFlags::BODY) {
            SlotTag::Body
        } else if flags.intersects(BipedFlags::HANDS | BipedFlags::FOREARMS) {
            SlotTag::Hands
        } else if flags.intersects(BipedFlags::FEET | BipedFlags::CALVES) {
            SlotTag::Feet
        } else if flags.contains(BipedFlags::SHIELD) {
            SlotTag::Shield
        } else {
            SlotTag::Unknown
        }
    }
}

impl Classifier for BipedSlotClassifier {
    fn classify(&self, record: &ArmorRecord) -> SlotTag {
        record
            .biped_flags()
            .map(Self::classify_flags)
            .unwrap_or(SlotTag::Unknown)
    }
}
