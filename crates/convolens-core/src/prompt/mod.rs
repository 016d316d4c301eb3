//! Prompt templates for classification and summary calls.
//!
//! These are configuration data, not logic: the classifier and summarizer
//! render them verbatim around the candidate lists and cleaned transcript.

use std::fmt::Write;

use crate::classifier::Level;

/// Level-1 category guide: short annotation rendered under each candidate.
/// Candidates without an entry are listed bare.
const LEVEL1_GUIDE: &[(&str, &str)] = &[
    ("APP下载和注册", "主要是注销账号、更换手机号"),
    (
        "额度激活咨询",
        "额度咨询、额度提升等（如果是提额卡相关问题请选择\"费用异议咨询\"分类）",
    ),
    ("提现申请咨询", "提现、借款、放款相关问题"),
    (
        "贷款还款咨询",
        "还款相关问题，如：还款方式、还款失败、转账销账、还款时间、账单查询等",
    ),
    (
        "费用异议咨询",
        "主要是一些退款、续费、权益等问题，例如飞享会员、提额卡、利息、担保费、逾期费等相关问题（这是最常用的分类）",
    ),
    (
        "贷后凭证开具",
        "主要是查看和开具合同，还有结清证明、征信问题、发票等",
    ),
    ("机票分期", "涉及机票业务（不常用分类）"),
    ("产品活动咨询", "涉及营销活动（不常用分类）"),
    (
        "催收相关业务",
        "涉及催收问题，如停催缓催、催收投诉、协商还款等",
    ),
    ("其他", "不属于以上类别的问题"),
];

fn level1_guide(name: &str) -> Option<&'static str> {
    LEVEL1_GUIDE
        .iter()
        .find(|(guide_name, _)| *guide_name == name)
        .map(|(_, description)| *description)
}

fn level_label(level: Level) -> &'static str {
    match level {
        Level::One => "一级",
        Level::Two => "二级",
        Level::Three => "三级",
    }
}

/// Level-1 prompt: carries the full cleaned transcript plus the annotated
/// candidate list.
pub fn level1_prompt(transcript: &str, candidates: &[String]) -> String {
    let mut listing = String::new();
    for candidate in candidates {
        match level1_guide(candidate) {
            Some(description) => {
                let _ = writeln!(listing, "● {candidate}\n  └─ {description}");
            }
            None => {
                let _ = writeln!(listing, "● {candidate}");
            }
        }
    }

    format!(
        "作为专业的对话分类分析师，请对以下对话进行一级分类。请注意，一级分类是最重要的，它决定了后续的分类方向。\n\n\
         当前分类层级: 一级分类\n\n\
         当前对话内容:\n{transcript}\n\n\
         可选的一级分类及其含义:\n{listing}\n\
         分类规则：\n\
         1. 仔细阅读对话内容，准确判断主要诉求\n\
         2. 根据主要诉求选择最匹配的一级分类\n\
         3. 只输出分类名称，不要输出任何解释\n\
         4. 必须从上述选项中选择，不能创建新的分类\n\
         5. 如果对话内容涉及多个分类，选择最主要的诉求对应的分类\n\
         6. 如果实在无法确定具体类别，再选择\"其他\"类\n\n\
         请直接输出一个分类名称。"
    )
}

/// Level-2/3 prompt: only the path so far and the candidate list. The
/// transcript is already present in the accumulated conversation turns, so
/// it is not repeated here.
pub fn followup_prompt(level: Level, path: &[String], candidates: &[String]) -> String {
    let mut listing = String::new();
    for candidate in candidates {
        let _ = writeln!(listing, "● {candidate}");
    }
    let label = level_label(level);
    let path_str = path.join(" > ");

    format!(
        "作为专业的对话分类分析师，请基于上面的对话进行{label}分类。\n\n\
         当前分类路径: {path_str}\n\n\
         可选的{label}分类:\n{listing}\n\
         分类规则：\n\
         1. 只能从上述分类选项中选择一个\n\
         2. 只输出分类名称，不要输出任何解释\n\
         3. 确保输出的分类名称与选项完全一致\n\n\
         提示：\n\
         1. 如果二级分类为\"飞享会员\"，重点区分用户诉求是\"取消扣款\"还是\"取消续费\"，不要混淆！如果没出现\"续费\"字眼，一般认为是取消扣款或退款。\n\n\
         请直接输出一个分类名称。"
    )
}

/// Summary prompt: three fixed sections around the cleaned transcript.
pub fn summary_prompt(transcript: &str) -> String {
    format!(
        "作为一名专业的对话分析师，请分析以下客服对话记录，提取关键信息并按照以下格式输出结构化摘要:\n\n\
         【沟通内容】\n\
         提取用户反馈的主要问题和诉求要点，保持简洁明了。如涉及产品需明确指出(如飞享会员)。多个诉求分条呈现。\n\n\
         【方案详情】\n\
         列出针对每个诉求的具体解决方案；如果有如下信息则需要注明，没有则忽略（仅给出解决方案）:\n\
         - 若涉及金额要明确标注具体数字\n\
         - 如果有减免、退款等操作要清晰说明\n\
         - 如果有订单编号则要说明\n\n\
         【处理结果】\n\
         说明最终处理状态，包括:\n\
         - 用户是否接受方案\n\
         - 相关操作是否已完成\n\
         - 如有待跟进事项需注明（没有则忽略这条）\n\n\
         要求:\n\
         1. 保持客观中立的叙述语气\n\
         2. 方案和金额必须准确对应原文\n\
         3. 按照【】分类标题组织内容\n\
         4. 多个问题按时间顺序分别完整描述\n\
         5. 每个部分表述要简明扼要\n\
         6. 总字数不要超过120字\n\n\
         请基于以上要求，分析如下对话内容:\n{transcript}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level1_prompt_lists_candidates_with_guides() {
        let candidates = vec!["费用异议咨询".to_string(), "自定义分类".to_string()];
        let prompt = level1_prompt("客户：我想退会员", &candidates);

        assert!(prompt.contains("客户：我想退会员"));
        assert!(prompt.contains("● 费用异议咨询"));
        assert!(prompt.contains("└─ 主要是一些退款、续费、权益等问题"));
        // Unknown candidate is listed without an annotation.
        assert!(prompt.contains("● 自定义分类\n"));
    }

    #[test]
    fn test_followup_prompt_omits_transcript_and_shows_path() {
        let path = vec!["费用异议咨询".to_string()];
        let candidates = vec!["飞享会员".to_string()];
        let prompt = followup_prompt(Level::Two, &path, &candidates);

        assert!(prompt.contains("当前分类路径: 费用异议咨询"));
        assert!(prompt.contains("二级分类"));
        assert!(prompt.contains("● 飞享会员"));
        assert!(!prompt.contains("当前对话内容"));
    }

    #[test]
    fn test_summary_prompt_carries_section_headers() {
        let prompt = summary_prompt("客户：我想退飞享会员");
        assert!(prompt.contains("【沟通内容】"));
        assert!(prompt.contains("【方案详情】"));
        assert!(prompt.contains("【处理结果】"));
        assert!(prompt.ends_with("客户：我想退飞享会员"));
    }
}
