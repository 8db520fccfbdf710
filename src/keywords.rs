//! Keyword predicates and the fixed data tables they match against.
//!
//! Latin keywords compare ASCII case-insensitively; CJK keywords compare exactly.
//! Every function expects an already normalized message (see [`normalize`]).

/// Strip all whitespace and fold the regional variant `台` into `臺`.
pub fn normalize(text: &str) -> String {
    text.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == '台' { '臺' } else { c })
        .collect()
}

/// Byte offset of the first occurrence of `keyword` in `msg`.
pub fn find_keyword(msg: &str, keyword: &str) -> Option<usize> {
    if keyword.is_ascii() {
        // ASCII lowercasing keeps byte offsets intact, so the index maps back onto `msg`.
        msg.to_ascii_lowercase()
            .find(&keyword.to_ascii_lowercase())
    } else {
        msg.find(keyword)
    }
}

pub fn contains_keyword(msg: &str, keyword: &str) -> bool {
    find_keyword(msg, keyword).is_some()
}

pub fn contains_any(msg: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|k| contains_keyword(msg, k))
}

/// The part of `msg` preceding the first `keyword`, used as a lookup key.
pub fn prefix_before<'a>(msg: &'a str, keyword: &str) -> Option<&'a str> {
    find_keyword(msg, keyword).map(|idx| &msg[..idx])
}

const WEATHER_KEYWORDS: &[&str] = &["天氣", "氣溫", "溫度", "下雨", "降雨", "weather"];

const AIR_KEYWORDS: &[&str] = &["空氣", "空汙", "空污", "pm2.5", "aqi", "霾"];

/// Returns the weather keyword found in the message, if any.
pub fn is_weather(msg: &str) -> Option<&'static str> {
    WEATHER_KEYWORDS
        .iter()
        .copied()
        .find(|k| contains_keyword(msg, k))
}

pub fn is_air(msg: &str) -> bool {
    contains_any(msg, AIR_KEYWORDS)
}

/// EPA air-quality monitoring sites (normalized spelling).
pub const AIR_STATIONS: &[&str] = &[
    "基隆", "汐止", "萬里", "新店", "土城", "板橋", "新莊", "菜寮", "林口", "淡水",
    "三重", "永和", "士林", "中山", "萬華", "古亭", "松山", "大同", "陽明", "桃園",
    "大園", "觀音", "平鎮", "龍潭", "中壢", "湖口", "竹東", "新竹", "頭份", "苗栗",
    "三義", "豐原", "沙鹿", "大里", "忠明", "西屯", "彰化", "線西", "二林", "大城",
    "南投", "竹山", "埔里", "斗六", "崙背", "麥寮", "臺西", "新港", "朴子", "嘉義",
    "新營", "善化", "安南", "臺南", "美濃", "橋頭", "仁武", "鳳山", "大寮", "林園",
    "楠梓", "左營", "前金", "前鎮", "小港", "復興", "屏東", "潮州", "恆春", "臺東",
    "關山", "花蓮", "宜蘭", "冬山", "馬祖", "金門", "馬公", "富貴角",
];

/// The domestic air station named in the message. On overlap the longest name wins.
pub fn is_air_station(msg: &str) -> Option<&'static str> {
    AIR_STATIONS
        .iter()
        .copied()
        .filter(|name| msg.contains(name))
        .max_by_key(|name| name.chars().count())
}

/// A foreign city with an air-quality feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignCity {
    pub name: &'static str,
    pub aliases: &'static [&'static str],
    /// Feed identifier on the upstream provider.
    pub slug: &'static str,
}

pub const FOREIGN_CITIES: &[ForeignCity] = &[
    ForeignCity { name: "東京", aliases: &["東京", "tokyo"], slug: "tokyo" },
    ForeignCity { name: "大阪", aliases: &["大阪", "osaka"], slug: "osaka" },
    ForeignCity { name: "首爾", aliases: &["首爾", "seoul"], slug: "seoul" },
    ForeignCity { name: "北京", aliases: &["北京", "beijing"], slug: "beijing" },
    ForeignCity { name: "上海", aliases: &["上海", "shanghai"], slug: "shanghai" },
    ForeignCity { name: "香港", aliases: &["香港", "hongkong"], slug: "hongkong" },
    ForeignCity { name: "新加坡", aliases: &["新加坡", "singapore"], slug: "singapore" },
    ForeignCity { name: "曼谷", aliases: &["曼谷", "bangkok"], slug: "bangkok" },
    ForeignCity { name: "倫敦", aliases: &["倫敦", "london"], slug: "london" },
    ForeignCity { name: "巴黎", aliases: &["巴黎", "paris"], slug: "paris" },
    ForeignCity { name: "紐約", aliases: &["紐約", "newyork"], slug: "newyork" },
    ForeignCity { name: "洛杉磯", aliases: &["洛杉磯", "losangeles"], slug: "losangeles" },
];

pub fn is_foreign_air_station(msg: &str) -> Option<&'static ForeignCity> {
    FOREIGN_CITIES
        .iter()
        .find(|city| contains_any(msg, city.aliases))
}

/// Counties and cities, with the short forms people type.
pub const TAIWAN_AREAS: &[(&str, &[&str])] = &[
    ("新北市", &["新北市", "新北"]),
    ("臺北市", &["臺北市", "臺北"]),
    ("桃園市", &["桃園市", "桃園"]),
    ("臺中市", &["臺中市", "臺中"]),
    ("臺南市", &["臺南市", "臺南"]),
    ("高雄市", &["高雄市", "高雄"]),
    ("基隆市", &["基隆市", "基隆"]),
    ("新竹市", &["新竹市"]),
    ("新竹縣", &["新竹縣", "新竹"]),
    ("苗栗縣", &["苗栗縣", "苗栗"]),
    ("彰化縣", &["彰化縣", "彰化"]),
    ("南投縣", &["南投縣", "南投"]),
    ("雲林縣", &["雲林縣", "雲林"]),
    ("嘉義市", &["嘉義市"]),
    ("嘉義縣", &["嘉義縣", "嘉義"]),
    ("屏東縣", &["屏東縣", "屏東"]),
    ("宜蘭縣", &["宜蘭縣", "宜蘭"]),
    ("花蓮縣", &["花蓮縣", "花蓮"]),
    ("臺東縣", &["臺東縣", "臺東"]),
    ("澎湖縣", &["澎湖縣", "澎湖"]),
    ("金門縣", &["金門縣", "金門"]),
    ("連江縣", &["連江縣", "連江", "馬祖"]),
];

/// The county/city whose name (or short form) appears first in the table order.
pub fn is_taiwan_area(msg: &str) -> Option<&'static str> {
    TAIWAN_AREAS
        .iter()
        .find(|(_, aliases)| contains_any(msg, aliases))
        .map(|(name, _)| *name)
}

/// Regional bulletin file IDs, keyed to the area names they cover.
pub const OVERVIEW_AREAS: &[(&str, &str)] = &[
    ("W50_63", "臺北市"),
    ("W50_65", "新北市"),
    ("W50_10017", "基隆市"),
    ("W50_68", "桃園市"),
    ("W50_10018", "新竹市"),
    ("W50_10004", "新竹縣"),
    ("W50_10005", "苗栗縣"),
    ("W50_66", "臺中市"),
    ("W50_10007", "彰化縣"),
    ("W50_10008", "南投縣"),
    ("W50_10009", "雲林縣"),
    ("W50_10020", "嘉義市"),
    ("W50_10010", "嘉義縣"),
    ("W50_67", "臺南市"),
    ("W50_64", "高雄市"),
    ("W50_10013", "屏東縣"),
    ("W50_10002", "宜蘭縣"),
    ("W50_10015", "花蓮縣"),
    ("W50_10014", "臺東縣"),
    ("W50_10016", "澎湖縣"),
    ("W50_09020", "金門縣"),
    ("W50_09007", "連江縣"),
];

/// First bulletin whose area name contains `area`.
pub fn overview_area_id(area: &str) -> Option<&'static str> {
    OVERVIEW_AREAS
        .iter()
        .find(|(_, name)| name.contains(area))
        .map(|(id, _)| *id)
}

const FUNNY_REPLIES: &[(&str, &str)] = &[
    ("你好", "你好！輸入 help 看看我能幫你查什麼天氣資訊。"),
    ("哈囉", "哈囉！輸入 help 看看我能幫你查什麼天氣資訊。"),
    ("謝謝", "不客氣，出門前記得看看天氣喔！"),
    ("早安", "早安！今天也記得查一下天氣預報。"),
    ("晚安", "晚安，祝你有個好夢。"),
    ("你是誰", "我是氣象小幫手，可以查天氣、空氣品質、雷達與衛星雲圖。"),
    ("好熱", "多喝水、避免中午曝曬，小心中暑！"),
    ("好冷", "多穿一件外套，別著涼了。"),
];

pub fn is_funny(msg: &str) -> Option<&'static str> {
    FUNNY_REPLIES
        .iter()
        .find(|(keyword, _)| msg.contains(keyword))
        .map(|(_, reply)| *reply)
}
