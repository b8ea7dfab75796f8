// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! System-variable substitution for rendered post payloads. `{{var}}`-style
//! interpolation over a fixed table of date/time variables plus any
//! caller-supplied `fixed_fields`.

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};
use std::collections::HashMap;

/// Render `pattern`, substituting the fixed system variables derived from
/// `at` plus any caller-supplied extra variables (template `fixed_fields`,
/// schedule name, etc). Unknown `{{...}}` placeholders are left untouched.
pub fn render(pattern: &str, at: DateTime<Utc>, extra: &HashMap<String, String>) -> String {
    let vars = system_vars(at);
    let mut out = String::with_capacity(pattern.len());
    let mut rest = pattern;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = after[..end].trim();
                if let Some(v) = vars.get(key).or_else(|| extra.get(key)) {
                    out.push_str(v);
                } else {
                    out.push_str("{{");
                    out.push_str(key);
                    out.push_str("}}");
                }
                rest = &after[end + 2..];
            }
            None => {
                out.push_str("{{");
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

fn system_vars(at: DateTime<Utc>) -> HashMap<&'static str, String> {
    let weekday_kr = match at.weekday() {
        Weekday::Mon => "월",
        Weekday::Tue => "화",
        Weekday::Wed => "수",
        Weekday::Thu => "목",
        Weekday::Fri => "금",
        Weekday::Sat => "토",
        Weekday::Sun => "일",
    };
    let mut m = HashMap::new();
    m.insert("오늘날짜", at.format("%Y-%m-%d").to_string());
    m.insert("년도", at.year().to_string());
    m.insert("월", format!("{:02}", at.month()));
    m.insert("일", format!("{:02}", at.day()));
    m.insert("시간", at.format("%H:%M").to_string());
    m.insert("시", format!("{:02}", at.hour()));
    m.insert("분", format!("{:02}", at.minute()));
    m.insert("요일", weekday_kr.to_string());
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Utc> {
        // 2026-03-05 is a Thursday.
        Utc.with_ymd_and_hms(2026, 3, 5, 9, 7, 0).single().unwrap()
    }

    #[test]
    fn substitutes_known_variables() {
        let rendered = render("{{오늘날짜}} {{시간}} ({{요일}})", sample_time(), &HashMap::new());
        assert_eq!(rendered, "2026-03-05 09:07 (목)");
    }

    #[test]
    fn leaves_unknown_placeholders_untouched() {
        let rendered = render("hello {{unknown}}", sample_time(), &HashMap::new());
        assert_eq!(rendered, "hello {{unknown}}");
    }

    #[test]
    fn extra_vars_override_nothing_but_fill_gaps() {
        let mut extra = HashMap::new();
        extra.insert("board".to_string(), "notices".to_string());
        let rendered = render("post to {{board}} on {{요일}}", sample_time(), &extra);
        assert_eq!(rendered, "post to notices on 목");
    }

    #[test]
    fn unterminated_placeholder_is_left_as_is() {
        let rendered = render("broken {{오늘날짜", sample_time(), &HashMap::new());
        assert_eq!(rendered, "broken {{오늘날짜");
    }
}
