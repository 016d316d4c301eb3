//! Transcript normalizer
//!
//! Deterministic multi-pass rewriting of a raw chat export into a compact,
//! PII-redacted, speaker-attributed text block. The passes are ordered:
//! later passes assume the normalized form produced by earlier ones (e.g.
//! colon joining runs after speaker/timestamp reformatting). Every pass is
//! best-effort on pattern matches and passes unmatched lines through
//! unchanged, so malformed input degrades to fewer rewrites, never to an
//! error.

use regex::Regex;

/// Marker opening the bot-only preamble in the source chat export.
const BOT_SEGMENT_MARKER: &str = "-----以下是机器人服务消息-----";
/// Marker where the human agent takes over.
const HUMAN_SEGMENT_MARKER: &str = "-----以下是人工客服消息-----";
/// Speaker label prefix for customer utterances.
const CUSTOMER_LABEL: &str = "客户：";
/// Literal separator emitted between log sections.
const SEPARATOR_MARKER: &str = "----：----";

/// Canned system/agent text with no information value, removed wherever it
/// appears (not line-bound).
const BOILERPLATE_PHRASES: &[&str] = &[
    "这边是人工客服，请问有什么可以帮您？",
    "您好，智能客服小飞为您服务！可以点击/:no选择下方问题或输入您的问题/:?",
    "询前表单客户已提交",
    "您好，已进入人工，请问有什么可以帮您",
    "您好，已进入人工服务，请问有什么可以帮您？",
    "为了您账户信息安全，请您提供下姓名全称、注册账户手机号、身份证号后4位帮您核实账户情况哦，谢谢",
    "有新的咨询进来了",
    "锁定会话",
    "解锁会话",
    "解锁对话",
    "系统发送未响应超时提醒",
    "非常抱歉没有得到您的响应,请问还有什么可以帮您？",
    "非常抱歉没有得到您的响应，如有问题，欢迎您在工作时间随时留言，法定假日除外，感谢您的配合！",
    "系统发送满意度调查",
    "感谢您的咨询，祝您生活愉快，再见！",
    "客户超时未响应，系统关闭会话",
    "您好，请您提供下注册账户手机号，谢谢",
    "。",
    "稍等，为您核实~",
    SEPARATOR_MARKER,
    "客户已进行满意度评价",
    "''",
];

/// Agent phrases that open a PII request/response exchange. The request line
/// and the customer's next reply are both redacted.
const PII_REQUEST_PHRASES: &[&str] = &["为了账户信息安全", "身份证后4位", "完整手机号", "身份证后四位"];

/// Substrings marking a line as sensitive on its own.
const SENSITIVE_SUBSTRINGS: &[&str] = &[
    "为了您账户信息安全",
    "身份证号后四位",
    "身份证后4位",
    "姓名全称",
    "银行卡后四位",
    "提供一下您的",
    "注册手机号码",
    "注册账户手机号",
    "手机号",
];

/// Deterministic transcript cleaner. Compiles its patterns once; share one
/// instance across requests.
pub struct TranscriptNormalizer {
    date: Regex,
    speaker_header: Regex,
    flagged_line: Regex,
    phone_bounded: Regex,
    phone_unbounded: Regex,
    id_full: Regex,
    id_wide: Regex,
    sensitive_patterns: Vec<Regex>,
    masked_phone: Regex,
    masked_mid: Regex,
    masked_id: Regex,
    digit_run: Regex,
    bare_name_line: Regex,
    cjk_char: Regex,
    whitespace_run: Regex,
}

impl TranscriptNormalizer {
    pub fn new() -> Self {
        Self {
            date: Regex::new(r"\d{4}/\d{1,2}/\d{1,2}").unwrap(),
            speaker_header: Regex::new(r"^(\S+)\s*\d{4}/\d{1,2}/\d{1,2}\s*\d{1,2}:\d{1,2}:\d{1,2}")
                .unwrap(),
            flagged_line: Regex::new(r"询前表单-提交手机|您好，已进入人工服务|已撤回|【图片】|----：----|x|X")
                .unwrap(),
            phone_bounded: Regex::new(r"\b(\d{3})\d{4}(\d{4})\b").unwrap(),
            phone_unbounded: Regex::new(r"(\d{3})\d{4}(\d{4})").unwrap(),
            id_full: Regex::new(r"\b(\d{4})\d{10}(\d{4})\b").unwrap(),
            id_wide: Regex::new(r"\b(\d{4})\d{8,11}(\d{4})\b").unwrap(),
            sensitive_patterns: vec![
                Regex::new(r"\d{11}").unwrap(),
                Regex::new(r"\d{17}[\dXx]").unwrap(),
                Regex::new(r"[\u{4e00}-\u{9fa5}]{2,4}\s*\d{18}").unwrap(),
                Regex::new(r"[\u{4e00}-\u{9fa5}]{2,4}\s*\d{11}").unwrap(),
            ],
            masked_phone: Regex::new(r"\d{3}\*{4}\d{4}").unwrap(),
            masked_mid: Regex::new(r"\d{6}\*{4}\d{4}").unwrap(),
            masked_id: Regex::new(r"\d{4}\*{8}\d{4}").unwrap(),
            digit_run: Regex::new(r"\b\d{4,}\b").unwrap(),
            bare_name_line: Regex::new(r"^[\s\W]*[\u{4e00}-\u{9fa5}]{2,4}[\s\W]*$").unwrap(),
            cjk_char: Regex::new(r"[\u{4e00}-\u{9fa5}]").unwrap(),
            whitespace_run: Regex::new(r"\s{2,}").unwrap(),
        }
    }

    /// Rewrite a raw transcript into its canonical cleaned form. Never
    /// fails; empty input maps to the empty string, and text without the
    /// expected structure passes through with fewer rewrites.
    pub fn normalize(&self, raw: &str) -> String {
        if raw.trim().is_empty() {
            return String::new();
        }

        let text = excise_bot_segment(raw);
        let text = strip_boilerplate(&text);
        let text = self.drop_flagged_lines(&text);
        let text = self.mask_numbers(&text);
        let text = drop_blank_lines(&text);
        let text = self.collapse_timestamp_lines(&text);
        let text = self.reformat_speaker_lines(&text);
        let text = join_colon_continuations(&text);
        let text = self.redact_identity_exchanges(&text);
        let text = drop_lone_customer_labels(&text);
        let text = drop_blank_lines(&text);

        let text = self.whitespace_run.replace_all(&text, " ");
        let text = text.replace(SEPARATOR_MARKER, "");
        let text = text.replace(HUMAN_SEGMENT_MARKER, "");
        text.trim().to_string()
    }

    /// Drop whole lines carrying form markers, withdrawn messages, image
    /// placeholders, separators or stray x/X.
    fn drop_flagged_lines(&self, text: &str) -> String {
        text.trim()
            .split('\n')
            .filter(|line| !self.flagged_line.is_match(line))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Mask phone- and ID-shaped digit runs, keeping a fixed-width prefix
    /// and suffix. The bounded phone pattern runs before the unbounded one
    /// so isolated numbers are handled before embedded ones.
    fn mask_numbers(&self, text: &str) -> String {
        let text = self.phone_bounded.replace_all(text, "${1}****${2}");
        let text = self.phone_unbounded.replace_all(&text, "${1}****${2}");
        let text = self.id_full.replace_all(&text, "${1}**********${2}");
        let text = self.id_wide.replace_all(&text, "${1}********${2}");
        text.into_owned()
    }

    /// Collapse consecutive header-only lines: a dated line directly followed
    /// by another dated line carries no message content. A trailing dated
    /// line is dropped for the same reason.
    fn collapse_timestamp_lines(&self, text: &str) -> String {
        let lines: Vec<&str> = text.trim().split('\n').collect();
        let mut kept: Vec<&str> = Vec::new();
        for (i, line) in lines.iter().copied().enumerate() {
            if self.date.is_match(line)
                && i + 1 < lines.len()
                && self.date.is_match(lines[i + 1])
            {
                continue;
            }
            kept.push(line);
        }
        if kept.last().is_some_and(|last| self.date.is_match(last)) {
            kept.pop();
        }
        kept.join("\n")
    }

    /// Rewrite `<speaker> <date> <time> <content>` into `<speaker>：<content>`.
    fn reformat_speaker_lines(&self, text: &str) -> String {
        text.trim()
            .split('\n')
            .map(|line| match self.speaker_header.captures(line) {
                Some(caps) => {
                    let speaker = caps.get(1).map_or("", |m| m.as_str());
                    let content = line[caps.get(0).map_or(0, |m| m.end())..].trim();
                    format!("{speaker}：{content}")
                }
                None => line.to_string(),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn line_contains_sensitive(&self, line: &str) -> bool {
        SENSITIVE_SUBSTRINGS.iter().any(|s| line.contains(s))
            || self.sensitive_patterns.iter().any(|re| re.is_match(line))
    }

    /// Two-flag state machine redacting PII request/response exchanges.
    ///
    /// Content rules are evaluated first and the `in_sensitive_block` flag is
    /// cleared last in each iteration: the customer line terminating a block
    /// is itself withheld, and only lines after it are emitted again.
    fn redact_identity_exchanges(&self, text: &str) -> String {
        let mut kept: Vec<String> = Vec::new();
        let mut skip_next_customer = false;
        let mut in_sensitive_block = false;

        for line in text.split('\n') {
            if line.trim().is_empty() {
                continue;
            }

            let contains_sensitive = self.line_contains_sensitive(line);

            if PII_REQUEST_PHRASES.iter().any(|p| line.contains(p)) {
                skip_next_customer = true;
                in_sensitive_block = true;
                continue;
            }

            if skip_next_customer && line.starts_with(CUSTOMER_LABEL) {
                skip_next_customer = false;
                in_sensitive_block = false;
                continue;
            }

            if contains_sensitive {
                in_sensitive_block = true;
                continue;
            }

            if !in_sensitive_block {
                let cleaned = self.masked_phone.replace_all(line, "");
                let cleaned = self.masked_mid.replace_all(&cleaned, "");
                let cleaned = self.masked_id.replace_all(&cleaned, "");
                if !cleaned.trim().is_empty() {
                    kept.push(cleaned.into_owned());
                }
            }

            if in_sensitive_block && line.starts_with(CUSTOMER_LABEL) {
                in_sensitive_block = false;
            }
        }

        let joined = kept.join("\n");
        let joined = self.digit_run.replace_all(&joined, "");

        joined
            .split('\n')
            .filter(|line| !self.is_pii_debris(line))
            .collect::<Vec<_>>()
            .join("\n")
            .trim()
            .to_string()
    }

    /// Redaction leftovers: a line that is only a short CJK name with
    /// punctuation, or a name-list marker with too little prose around it.
    fn is_pii_debris(&self, line: &str) -> bool {
        self.bare_name_line.is_match(line.trim())
            || (line.contains('·') && self.cjk_char.find_iter(line).count() < 14)
    }
}

impl Default for TranscriptNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Delete the bot-only preamble between the bot marker and the human marker,
/// when both are present.
fn excise_bot_segment(text: &str) -> String {
    match (text.find(BOT_SEGMENT_MARKER), text.find(HUMAN_SEGMENT_MARKER)) {
        (Some(start), Some(end)) if start < end => format!("{}{}", &text[..start], &text[end..]),
        _ => text.to_string(),
    }
}

fn strip_boilerplate(text: &str) -> String {
    let mut text = text.to_string();
    for phrase in BOILERPLATE_PHRASES {
        text = text.replace(phrase, "");
    }
    text.trim().to_string()
}

fn drop_blank_lines(text: &str) -> String {
    text.split('\n')
        .filter(|line| !line.trim().is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Merge a speaker-tag-only line (`客服：`) with its content on the next
/// line. A next line that repeats the label itself is consumed without
/// merging, so `甲：甲` never becomes `甲：甲：`.
fn join_colon_continuations(text: &str) -> String {
    let lines: Vec<&str> = text.trim().split('\n').collect();
    let mut out: Vec<String> = Vec::new();
    let mut i = 0;
    while i < lines.len() {
        let current = lines[i];
        match current.strip_suffix('：') {
            Some(label) if i + 1 < lines.len() => {
                let next = lines[i + 1].trim();
                if label != next {
                    out.push(format!("{current}{next}"));
                } else {
                    out.push(current.to_string());
                }
                i += 1;
            }
            _ => out.push(current.to_string()),
        }
        i += 1;
    }
    out.join("\n")
}

/// Drop lines that are exactly the customer label, an artifact of redaction
/// leaving an empty utterance.
fn drop_lone_customer_labels(text: &str) -> String {
    text.trim()
        .split('\n')
        .filter(|line| line.trim() != CUSTOMER_LABEL)
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> TranscriptNormalizer {
        TranscriptNormalizer::new()
    }

    #[test]
    fn test_empty_and_whitespace_input_normalize_to_empty() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   \n\t  "), "");
    }

    #[test]
    fn test_boilerplate_only_transcript_becomes_empty() {
        let n = normalizer();
        let raw = "您好，智能客服小飞为您服务！可以点击/:no选择下方问题或输入您的问题/:?\n\
                   系统发送满意度调查\n\
                   感谢您的咨询，祝您生活愉快，再见！";
        assert_eq!(n.normalize(raw), "");
    }

    #[test]
    fn test_bot_segment_excised_when_both_markers_present() {
        let raw = format!(
            "前言\n{BOT_SEGMENT_MARKER}\n机器人应答一\n机器人应答二\n{HUMAN_SEGMENT_MARKER}\n客户：请帮我处理"
        );
        let cleaned = normalizer().normalize(&raw);
        assert!(!cleaned.contains("机器人应答一"));
        assert!(cleaned.contains("客户：请帮我处理"));
        assert!(cleaned.contains("前言"));
    }

    #[test]
    fn test_bot_segment_kept_when_human_marker_missing() {
        let raw = format!("{BOT_SEGMENT_MARKER}\n机器人应答");
        let cleaned = normalizer().normalize(&raw);
        assert!(cleaned.contains("机器人应答"));
    }

    #[test]
    fn test_flagged_lines_dropped_including_stray_x() {
        let n = normalizer();
        let raw = "客户：帮我看看订单\n【图片】\nxx\n客服：收到";
        let cleaned = n.normalize(raw);
        assert!(!cleaned.contains("【图片】"));
        assert!(!cleaned.contains("xx"));
        assert!(cleaned.contains("客户：帮我看看订单"));
    }

    #[test]
    fn test_phone_masking_keeps_prefix_and_suffix() {
        let n = normalizer();
        assert_eq!(n.mask_numbers("13812345678"), "138****5678");
        // Embedded in text the unbounded pattern catches it.
        assert_eq!(n.mask_numbers("尾号13812345678已登记"), "尾号138****5678已登记");
    }

    #[test]
    fn test_masking_never_leaks_middle_digits() {
        let n = normalizer();
        let masked = n.mask_numbers("联系方式 13812345678 谢谢");
        assert!(!masked.contains("1234567"));
        assert!(masked.contains("138****5678"));
    }

    #[test]
    fn test_timestamp_header_pairs_collapse() {
        let n = normalizer();
        let text = "客户 2024/1/2 10:23:45\n客户 2024/1/2 10:23:50\n在吗";
        // First header is directly followed by another header: dropped.
        let collapsed = n.collapse_timestamp_lines(text);
        assert_eq!(collapsed, "客户 2024/1/2 10:23:50\n在吗");
    }

    #[test]
    fn test_trailing_timestamp_header_dropped() {
        let n = normalizer();
        let text = "在吗\n客服 2024/1/2 10:24:01";
        assert_eq!(n.collapse_timestamp_lines(text), "在吗");
    }

    #[test]
    fn test_speaker_header_rewritten_with_fullwidth_colon() {
        let n = normalizer();
        let text = "客服 2024/1/2 10:23:45 您好";
        assert_eq!(n.reformat_speaker_lines(text), "客服：您好");
    }

    #[test]
    fn test_colon_continuation_joins_content_line() {
        let text = "客户：\n我想退飞享会员\n客服：\n好的";
        assert_eq!(
            join_colon_continuations(text),
            "客户：我想退飞享会员\n客服：好的"
        );
    }

    #[test]
    fn test_colon_continuation_skips_duplicate_label() {
        // The repeated label is consumed, not merged.
        let text = "客服：\n客服";
        assert_eq!(join_colon_continuations(text), "客服：");
    }

    #[test]
    fn test_full_pipeline_on_timestamped_transcript() {
        let n = normalizer();
        let raw = "客户 2024/1/2 10:23:45\n我想退飞享会员\n客服 2024/1/2 10:24:01\n好的，为您处理";
        assert_eq!(n.normalize(raw), "客户：我想退飞享会员\n客服：好的，为您处理");
    }

    #[test]
    fn test_pii_request_and_customer_reply_both_redacted() {
        let n = normalizer();
        let text = "客服：为了账户信息安全，请提供身份证后4位\n客户：一二三四\n客户：好的谢谢";
        assert_eq!(n.redact_identity_exchanges(text), "客户：好的谢谢");
    }

    #[test]
    fn test_sensitive_block_terminator_line_is_itself_withheld() {
        // The customer line that ends the block is dropped; only lines after
        // it come back. Pins the evaluate-content-first, update-flags-last
        // ordering.
        let n = normalizer();
        let text = "客服：请问您的注册手机号码是多少\n客户：不想提供\n客户：换个话题";
        assert_eq!(n.redact_identity_exchanges(text), "客户：换个话题");
    }

    #[test]
    fn test_masked_remnants_and_digit_runs_stripped() {
        let n = normalizer();
        let text = "客服：已登记138****5678\n客户：订单号 87654321 对吗";
        let cleaned = n.redact_identity_exchanges(text);
        assert!(!cleaned.contains("138****5678"));
        assert!(!cleaned.contains("87654321"));
        assert!(cleaned.contains("客户：订单号"));
    }

    #[test]
    fn test_bare_name_line_dropped_as_debris() {
        let n = normalizer();
        let text = "客户：帮我查一下\n张三。\n客服：稍等";
        let cleaned = n.redact_identity_exchanges(text);
        assert!(!cleaned.contains("张三"));
    }

    #[test]
    fn test_lone_customer_label_removed() {
        assert_eq!(
            drop_lone_customer_labels("客户：\n客服：还在吗"),
            "客服：还在吗"
        );
    }

    #[test]
    fn test_normalize_is_idempotent_on_canonical_text() {
        let n = normalizer();
        let raw = "客户 2024/1/2 10:23:45\n我想退飞享会员\n客服 2024/1/2 10:24:01\n好的，为您处理";
        let once = n.normalize(raw);
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn test_unstructured_text_passes_through() {
        let n = normalizer();
        assert_eq!(n.normalize("帮我退订会员"), "帮我退订会员");
    }
}
