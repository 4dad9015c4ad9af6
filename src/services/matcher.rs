//! 选项匹配服务 - 业务能力层
//!
//! 负责把 LLM 返回的答案文本确定性地映射到具体的表单选项。
//! 只处理单道题目的候选列表，不关心流程顺序。

use crate::config::Config;

/// 单个可点击选项的候选描述
///
/// `option_index` 是该选项在题目选项列表中的位置，
/// 与 `FormSurface` 的选项句柄一一对应。
#[derive(Debug, Clone)]
pub struct OptionCandidate {
    pub display_text: String,
    pub is_selected: bool,
    pub option_index: usize,
}

/// 匹配层级（层级高者胜出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum MatchTier {
    /// 答案包含选项文本
    TargetContainsCandidate = 40,
    /// 选项文本包含答案
    CandidateContainsTarget = 60,
    /// 完全相等
    Exact = 100,
}

/// 选项匹配器
///
/// 匹配结果只依赖输入，两次调用同样的输入必然得到同样的结果。
pub struct AnswerMatcher {
    /// 包含关系成立所需的最小字符数，防止无意义的短子串误匹配
    min_match_len: usize,
}

impl AnswerMatcher {
    pub fn new(config: &Config) -> Self {
        Self {
            min_match_len: config.min_match_len,
        }
    }

    pub fn with_min_len(min_match_len: usize) -> Self {
        Self { min_match_len }
    }

    /// 在候选列表中找出与答案文本最匹配的选项
    ///
    /// 返回候选在 `candidates` 中的下标；没有任何候选达到匹配
    /// 层级时返回 `None`。同层级时保留先出现的候选（扫描序稳定）。
    pub fn find_best_option(
        &self,
        candidates: &[OptionCandidate],
        target: &str,
    ) -> Option<usize> {
        let target = normalize(target);
        if target.is_empty() {
            return None;
        }

        let mut best: Option<(MatchTier, usize)> = None;

        for (idx, candidate) in candidates.iter().enumerate() {
            let option_text = normalize(&candidate.display_text);
            if option_text.is_empty() {
                continue;
            }

            if let Some(tier) = self.score(&option_text, &target) {
                // 只有层级严格更高才替换，保证同层级先出现者胜出
                match best {
                    Some((best_tier, _)) if tier <= best_tier => {}
                    _ => best = Some((tier, idx)),
                }
                if tier == MatchTier::Exact {
                    // 完全相等已是最高层级，后续候选不可能更优
                    break;
                }
            }
        }

        best.map(|(_, idx)| idx)
    }

    /// 对单个候选打分
    fn score(&self, option_text: &str, target: &str) -> Option<MatchTier> {
        if option_text == target {
            Some(MatchTier::Exact)
        } else if option_text.contains(target) && target.chars().count() > self.min_match_len {
            Some(MatchTier::CandidateContainsTarget)
        } else if target.contains(option_text) && option_text.chars().count() > self.min_match_len
        {
            Some(MatchTier::TargetContainsCandidate)
        } else {
            None
        }
    }
}

/// 归一化：小写 + 去首尾空白
///
/// 结构性噪音（必答星号、换行）由上游抓取器清理，这里不重复处理。
fn normalize(text: &str) -> String {
    text.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidates(texts: &[&str]) -> Vec<OptionCandidate> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| OptionCandidate {
                display_text: t.to_string(),
                is_selected: false,
                option_index: i,
            })
            .collect()
    }

    fn matcher() -> AnswerMatcher {
        AnswerMatcher::with_min_len(2)
    }

    #[test]
    fn test_exact_match_wins_over_substring() {
        // "Paris" 完全相等应胜过 "Paris, France" 的包含关系
        let cands = candidates(&["Paris, France", "Paris", "London"]);
        assert_eq!(matcher().find_best_option(&cands, "Paris"), Some(1));
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let cands = candidates(&["Paris", "London", "Berlin"]);
        assert_eq!(matcher().find_best_option(&cands, "  pArIs  "), Some(0));
    }

    #[test]
    fn test_candidate_contains_target() {
        let cands = candidates(&["The city of Paris", "London"]);
        assert_eq!(matcher().find_best_option(&cands, "Paris"), Some(0));
    }

    #[test]
    fn test_target_contains_candidate() {
        let cands = candidates(&["Paris", "London"]);
        assert_eq!(
            matcher().find_best_option(&cands, "The answer is Paris"),
            Some(0)
        );
    }

    #[test]
    fn test_candidate_contains_beats_target_contains() {
        // 层级 60 应胜过层级 40
        let cands = candidates(&["red", "dark red color"]);
        assert_eq!(
            matcher().find_best_option(&cands, "dark red"),
            Some(1)
        );
    }

    #[test]
    fn test_short_substring_guard() {
        // "ab" 不超过最小长度阈值 2，包含关系不成立
        let cands = candidates(&["abcdef"]);
        assert_eq!(matcher().find_best_option(&cands, "ab"), None);
    }

    #[test]
    fn test_no_match_returns_none() {
        let cands = candidates(&["Paris", "London"]);
        assert_eq!(matcher().find_best_option(&cands, "Tokyo"), None);
    }

    #[test]
    fn test_tie_break_keeps_first_seen() {
        // 两个候选都包含答案文本，同层级时保留先出现者
        let cands = candidates(&["Paris is nice", "Paris is big"]);
        assert_eq!(matcher().find_best_option(&cands, "Paris"), Some(0));
    }

    #[test]
    fn test_deterministic() {
        let cands = candidates(&["Red", "Green", "Blue"]);
        let m = matcher();
        let first = m.find_best_option(&cands, "Green");
        let second = m.find_best_option(&cands, "Green");
        assert_eq!(first, second);
        assert_eq!(first, Some(1));
    }

    #[test]
    fn test_empty_target() {
        let cands = candidates(&["Paris"]);
        assert_eq!(matcher().find_best_option(&cands, "   "), None);
    }
}
