//! Fixed reply texts.

use crate::keywords::AIR_STATIONS;

pub const FETCH_FAILED: &str = "取得資料失敗";

pub const NO_SUCH_STATION: &str = "無此測站，請輸入「觀測站清單」尋找欲查詢測站";

pub const AIR_IMAGE_FAILED: &str = "取得空氣品質圖失敗。請輸入[監測站清單]來查詢詳細數值。";

pub const EARTHQUAKE_FAILED: &str =
    "取得最新資料失敗。請上 http://www.cwb.gov.tw/V7/earthquake/ 查詢";

pub const SOURCE_URL: &str = "https://github.com/ntu-as-cooklab/line-bot";

pub const AGENCY_URL: &str = "www.cwb.gov.tw/";

pub const HELP: &str = "\
【氣象小幫手使用說明】
・天氣：輸入「地區＋天氣」，例如「臺北天氣」
・預報：輸入「預報」取得全臺天氣預報圖
・天氣圖：輸入「天氣圖」取得地面天氣圖
・雷達：輸入「雷達」取得最新雷達回波圖
・衛星雲圖：輸入「衛星雲圖」取得最新衛星雲圖
・地震：輸入「地震」取得最新地震報告
・觀測：輸入「測站名稱＋觀測」，例如「臺北觀測」
・觀測站清單：列出可查詢的觀測站
・空氣品質：輸入「空氣」取得全臺空氣品質圖，或「測站名稱＋空氣」，例如「板橋空氣」
・國外空氣品質：輸入「城市＋空氣」，例如「東京空氣」
・監測站清單：列出可查詢的空氣品質監測站
・概況：輸入「縣市＋概況」，例如「臺北概況」
・回報問題：輸入「issue」
・原始碼：輸入「github」";

pub const ISSUE: &str = "\
如果遇到問題或有任何建議，歡迎到以下網址回報：
https://github.com/ntu-as-cooklab/line-bot/issues";

pub const FOLLOW: &str = "\
感謝你加入氣象小幫手！
輸入「help」即可查看所有功能，例如「臺北天氣」、「雷達」、「板橋空氣」。";

pub const JOIN: &str = "\
大家好，我是氣象小幫手！
在群組中輸入「help」即可查看所有功能。";

pub const OBSERVATION_STATIONS: &str = "\
【觀測站清單】
北部：基隆、臺北、新屋、新竹、板橋、淡水、鞍部、竹子湖、彭佳嶼
中部：臺中、梧棲、日月潭、阿里山、玉山、嘉義
南部：臺南、高雄、恆春、東吉島、澎湖
東部：宜蘭、蘇澳、花蓮、成功、臺東、大武、蘭嶼
離島：金門、馬祖
輸入「測站名稱＋觀測」查詢，例如「臺北觀測」";

/// Air station list, generated from the station table so the two cannot drift apart.
pub fn air_stations() -> String {
    format!(
        "【空氣品質監測站清單】\n{}\n輸入「測站名稱＋空氣」查詢，例如「板橋空氣」",
        AIR_STATIONS.join("、")
    )
}
