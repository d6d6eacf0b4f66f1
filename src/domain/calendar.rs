use chrono::{
    DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc, Weekday,
};

/// 営業日（月〜金）か判定する
pub fn is_business_day(weekday: Weekday) -> bool {
    !matches!(weekday, Weekday::Sat | Weekday::Sun)
}

/// 純粋関数：n営業日後の日時を求める
///
/// 開始日から1日ずつ進め、月〜金の日だけを数える。
/// 土日は数えず、境界として返ることもない。祝日は考慮しない。
/// 時刻（時分秒）は開始日時のものを保つ。
///
/// n = 0 の場合は開始日時をそのまま返す。
pub fn add_business_days<Tz: TimeZone>(start: DateTime<Tz>, n: u32) -> DateTime<Tz> {
    let mut current = start;
    let mut counted = 0;
    while counted < n {
        current = current + Duration::days(1);
        if is_business_day(current.weekday()) {
            counted += 1;
        }
    }
    current
}

/// UTC日時を図書館の現地時刻に変換する
pub fn to_local(at: DateTime<Utc>, offset: FixedOffset) -> DateTime<FixedOffset> {
    at.with_timezone(&offset)
}

/// 現地日付の指定時刻（hour:00:00）を表す日時
pub fn at_local_hour(date: NaiveDate, hour: u32, offset: FixedOffset) -> DateTime<FixedOffset> {
    let local = date.and_time(NaiveTime::MIN) + Duration::hours(i64::from(hour));
    let utc = local - Duration::seconds(i64::from(offset.local_minus_utc()));
    DateTime::from_naive_utc_and_offset(utc, offset)
}
