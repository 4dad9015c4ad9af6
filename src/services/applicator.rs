//! 答案应用服务 - 业务能力层
//!
//! 消费结构化答案，借助匹配器决定激活哪些选项元素，
//! 并执行单选/多选/填空各自的选择策略。
//!
//! DOM 的具体操作通过 `FormSurface` 抽象注入：抓取时建立的
//! `Question::id` → 选项句柄映射由宿主持有，这里只通过
//! `(question_id, option_index)` 寻址，不直接接触页面全局状态。

use std::collections::{BTreeMap, HashSet};

use tracing::{debug, warn};

use crate::config::Config;
use crate::models::{AnswerResult, Question, QuestionType};
use crate::services::matcher::{AnswerMatcher, OptionCandidate};

/// 题目文本模糊关联的最低词重叠率
const SNIPPET_OVERLAP_THRESHOLD: f64 = 0.6;

/// 参与重叠率计算的最小词长
const SIGNIFICANT_WORD_LEN: usize = 3;

/// 表单操作抽象
///
/// 由宿主（内容脚本一侧）实现，持有抓取时建立的选项句柄表。
/// 所有方法都以 `(question_id, option_index)` 寻址。
pub trait FormSurface: Send {
    /// 选项当前是否处于选中状态
    fn is_option_selected(&self, question_id: u32, option_index: usize) -> bool;
    /// 激活（点击）一个选项
    fn activate_option(&mut self, question_id: u32, option_index: usize);
    /// 清除该题目下所有选项的高亮标记
    fn clear_option_highlights(&mut self, question_id: u32);
    /// 给选项打上"成功"标记
    fn mark_option_success(&mut self, question_id: u32, option_index: usize);
    /// 设置填空题的文本内容
    fn set_text_value(&mut self, question_id: u32, value: &str);
    /// 触发填空题的内容变更通知
    fn notify_text_changed(&mut self, question_id: u32);
    /// 取消页面上所有处于选中状态的选项
    fn deactivate_all(&mut self);
    /// 清除页面上所有高亮标记
    fn clear_all_marks(&mut self);
}

/// 答案应用器
pub struct FormApplicator {
    matcher: AnswerMatcher,
}

impl FormApplicator {
    pub fn new(config: &Config) -> Self {
        Self {
            matcher: AnswerMatcher::new(config),
        }
    }

    /// 把答案集合应用到表单上，返回本次新激活/写入的数量
    ///
    /// 重复调用是幂等的：已选中的正确选项不会被再次激活，
    /// 也不会被计入返回值。
    pub fn apply(
        &self,
        questions: &BTreeMap<u32, Question>,
        results: &[AnswerResult],
        surface: &mut dyn FormSurface,
    ) -> usize {
        let mut applied = 0;

        for result in results {
            let question = match self.resolve_question(questions, result) {
                Some(q) => q,
                None => {
                    warn!("⚠️ 无法定位答案对应的题目: {:?}", result.id);
                    continue;
                }
            };

            if result.answers.is_empty() {
                continue;
            }

            match question.qtype {
                QuestionType::Text => {
                    let joined = result.answers.join(", ");
                    surface.set_text_value(question.id, &joined);
                    surface.notify_text_changed(question.id);
                    debug!("✓ [题目 {}] 填空已写入: {}", question.id, joined);
                    applied += 1;
                }
                QuestionType::Radio => {
                    // 单选题只考虑第一个答案
                    applied += self.apply_radio(question, &result.answers[0], surface);
                }
                QuestionType::Checkbox => {
                    for answer in &result.answers {
                        applied += self.apply_checkbox(question, answer, surface);
                    }
                }
                QuestionType::Unknown => {
                    warn!("⚠️ [题目 {}] 类型未识别，跳过", question.id);
                }
            }
        }

        applied
    }

    /// 清除所有选择与标记，重置填空题为空
    pub fn clear_all(&self, questions: &BTreeMap<u32, Question>, surface: &mut dyn FormSurface) {
        surface.deactivate_all();
        surface.clear_all_marks();

        for question in questions.values() {
            if question.qtype == QuestionType::Text {
                surface.set_text_value(question.id, "");
                surface.notify_text_changed(question.id);
            }
        }
    }

    /// 单选策略：匹配成功且未选中时激活，并清理同组旧高亮
    fn apply_radio(
        &self,
        question: &Question,
        answer: &str,
        surface: &mut dyn FormSurface,
    ) -> usize {
        let candidates = build_candidates(question, surface);

        let Some(idx) = self.matcher.find_best_option(&candidates, answer) else {
            debug!("[题目 {}] 未找到与 '{}' 匹配的选项", question.id, answer);
            return 0;
        };
        let option_index = candidates[idx].option_index;

        if surface.is_option_selected(question.id, option_index) {
            // 已选中正确选项，保持现状
            surface.mark_option_success(question.id, option_index);
            return 0;
        }

        surface.activate_option(question.id, option_index);
        surface.clear_option_highlights(question.id);
        surface.mark_option_success(question.id, option_index);
        debug!(
            "✓ [题目 {}] 单选已激活: {}",
            question.id, candidates[idx].display_text
        );
        1
    }

    /// 多选策略：每个答案独立匹配激活，互不排斥
    fn apply_checkbox(
        &self,
        question: &Question,
        answer: &str,
        surface: &mut dyn FormSurface,
    ) -> usize {
        let candidates = build_candidates(question, surface);

        let Some(idx) = self.matcher.find_best_option(&candidates, answer) else {
            debug!("[题目 {}] 未找到与 '{}' 匹配的选项", question.id, answer);
            return 0;
        };
        let option_index = candidates[idx].option_index;

        if surface.is_option_selected(question.id, option_index) {
            surface.mark_option_success(question.id, option_index);
            return 0;
        }

        surface.activate_option(question.id, option_index);
        surface.mark_option_success(question.id, option_index);
        debug!(
            "✓ [题目 {}] 多选已激活: {}",
            question.id, candidates[idx].display_text
        );
        1
    }

    /// 定位答案对应的题目
    ///
    /// 优先用 id 直接关联；没有 id 时退化为题干文本的词重叠匹配，
    /// 重叠率低于阈值则放弃该条答案。
    fn resolve_question<'a>(
        &self,
        questions: &'a BTreeMap<u32, Question>,
        result: &AnswerResult,
    ) -> Option<&'a Question> {
        if let Some(id) = result.id {
            return questions.get(&id);
        }

        let snippet = result.question_snippet.as_deref()?;

        let mut best: Option<(f64, &Question)> = None;
        for question in questions.values() {
            let ratio = snippet_overlap_ratio(&question.text, snippet);
            match best {
                Some((best_ratio, _)) if ratio <= best_ratio => {}
                _ => best = Some((ratio, question)),
            }
        }

        match best {
            Some((ratio, question)) if ratio >= SNIPPET_OVERLAP_THRESHOLD => {
                debug!(
                    "✓ 模糊关联到题目 {} (重叠率: {:.2})",
                    question.id, ratio
                );
                Some(question)
            }
            _ => None,
        }
    }
}

/// 根据题目选项和当前页面状态构建候选列表
fn build_candidates(question: &Question, surface: &dyn FormSurface) -> Vec<OptionCandidate> {
    question
        .options
        .iter()
        .enumerate()
        .map(|(i, text)| OptionCandidate {
            display_text: text.clone(),
            is_selected: surface.is_option_selected(question.id, i),
            option_index: i,
        })
        .collect()
}

/// 计算题干文本与答案片段的词重叠率
///
/// 只统计长度超过 3 个字符的"显著词"，
/// 重叠率 = 命中词数 / 片段显著词数。
fn snippet_overlap_ratio(question_text: &str, snippet: &str) -> f64 {
    let search_words = significant_words(snippet);
    if search_words.is_empty() {
        return 0.0;
    }

    let question_words: HashSet<String> = significant_words(question_text).into_iter().collect();
    let matched = search_words
        .iter()
        .filter(|w| question_words.contains(*w))
        .count();

    matched as f64 / search_words.len() as f64
}

fn significant_words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_string())
        .filter(|w| w.chars().count() > SIGNIFICANT_WORD_LEN)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// 内存表单，记录激活调用以便断言幂等性
    #[derive(Default)]
    struct TestSurface {
        selected: HashMap<(u32, usize), bool>,
        marks: HashSet<(u32, usize)>,
        texts: HashMap<u32, String>,
        activation_log: Vec<(u32, usize)>,
        text_change_notices: usize,
    }

    impl FormSurface for TestSurface {
        fn is_option_selected(&self, question_id: u32, option_index: usize) -> bool {
            *self.selected.get(&(question_id, option_index)).unwrap_or(&false)
        }

        fn activate_option(&mut self, question_id: u32, option_index: usize) {
            self.selected.insert((question_id, option_index), true);
            self.activation_log.push((question_id, option_index));
        }

        fn clear_option_highlights(&mut self, question_id: u32) {
            self.marks.retain(|(qid, _)| *qid != question_id);
        }

        fn mark_option_success(&mut self, question_id: u32, option_index: usize) {
            self.marks.insert((question_id, option_index));
        }

        fn set_text_value(&mut self, question_id: u32, value: &str) {
            self.texts.insert(question_id, value.to_string());
        }

        fn notify_text_changed(&mut self, _question_id: u32) {
            self.text_change_notices += 1;
        }

        fn deactivate_all(&mut self) {
            self.selected.clear();
        }

        fn clear_all_marks(&mut self) {
            self.marks.clear();
        }
    }

    impl TestSurface {
        fn selected_options(&self) -> Vec<(u32, usize)> {
            let mut v: Vec<(u32, usize)> = self
                .selected
                .iter()
                .filter(|(_, on)| **on)
                .map(|(k, _)| *k)
                .collect();
            v.sort();
            v
        }
    }

    fn question(id: u32, qtype: QuestionType, text: &str, options: &[&str]) -> Question {
        Question {
            id,
            qtype,
            text: text.to_string(),
            options: options.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn questions(list: Vec<Question>) -> BTreeMap<u32, Question> {
        list.into_iter().map(|q| (q.id, q)).collect()
    }

    fn applicator() -> FormApplicator {
        FormApplicator::new(&Config::default())
    }

    fn answer_by_id(id: u32, answers: &[&str]) -> AnswerResult {
        AnswerResult {
            id: Some(id),
            question_snippet: None,
            answers: answers.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn test_radio_selects_exactly_one() {
        let qs = questions(vec![question(
            0,
            QuestionType::Radio,
            "What is the capital of France?",
            &["Paris", "London", "Berlin"],
        )]);
        let mut surface = TestSurface::default();

        let count = applicator().apply(&qs, &[answer_by_id(0, &["Paris"])], &mut surface);

        assert_eq!(count, 1);
        assert_eq!(surface.selected_options(), vec![(0, 0)]);
    }

    #[test]
    fn test_radio_ignores_extra_answers() {
        // 单选题即使答案列出多个，也只考虑第一个
        let qs = questions(vec![question(
            0,
            QuestionType::Radio,
            "Pick one",
            &["Paris", "London", "Berlin"],
        )]);
        let mut surface = TestSurface::default();

        let count = applicator().apply(&qs, &[answer_by_id(0, &["London", "Berlin"])], &mut surface);

        assert_eq!(count, 1);
        assert_eq!(surface.selected_options(), vec![(0, 1)]);
    }

    #[test]
    fn test_checkbox_selects_matching_set() {
        let qs = questions(vec![question(
            1,
            QuestionType::Checkbox,
            "Pick colors",
            &["Red", "Blue", "Green"],
        )]);
        let mut surface = TestSurface::default();

        let count = applicator().apply(&qs, &[answer_by_id(1, &["Red", "Green"])], &mut surface);

        assert_eq!(count, 2);
        assert_eq!(surface.selected_options(), vec![(1, 0), (1, 2)]);
    }

    #[test]
    fn test_text_question_joins_answers() {
        let qs = questions(vec![question(2, QuestionType::Text, "你的爱好?", &[])]);
        let mut surface = TestSurface::default();

        let count = applicator().apply(&qs, &[answer_by_id(2, &["读书", "跑步"])], &mut surface);

        assert_eq!(count, 1);
        assert_eq!(surface.texts.get(&2).map(String::as_str), Some("读书, 跑步"));
        assert_eq!(surface.text_change_notices, 1);
    }

    #[test]
    fn test_apply_is_idempotent() {
        let qs = questions(vec![question(
            0,
            QuestionType::Checkbox,
            "Pick colors",
            &["Red", "Blue", "Green"],
        )]);
        let mut surface = TestSurface::default();
        let results = [answer_by_id(0, &["Red", "Green"])];
        let app = applicator();

        let first = app.apply(&qs, &results, &mut surface);
        let selections_after_first = surface.selected_options();
        let second = app.apply(&qs, &results, &mut surface);

        assert_eq!(first, 2);
        // 已选中的选项不再计入，也不会再次点击
        assert_eq!(second, 0);
        assert_eq!(surface.selected_options(), selections_after_first);
        assert_eq!(surface.activation_log.len(), 2);
    }

    #[test]
    fn test_preexisting_selection_not_deactivated() {
        let qs = questions(vec![question(
            0,
            QuestionType::Radio,
            "Pick one",
            &["Paris", "London"],
        )]);
        let mut surface = TestSurface::default();
        surface.selected.insert((0, 0), true);

        let count = applicator().apply(&qs, &[answer_by_id(0, &["Paris"])], &mut surface);

        assert_eq!(count, 0);
        assert!(surface.is_option_selected(0, 0));
        assert!(surface.activation_log.is_empty());
    }

    #[test]
    fn test_snippet_resolution_above_threshold() {
        let qs = questions(vec![
            question(
                0,
                QuestionType::Radio,
                "What is the capital of France?",
                &["Paris", "London"],
            ),
            question(1, QuestionType::Radio, "Pick a color", &["Red", "Blue"]),
        ]);
        let mut surface = TestSurface::default();
        let result = AnswerResult {
            id: None,
            question_snippet: Some("What is the capital".to_string()),
            answers: vec!["Paris".to_string()],
        };

        let count = applicator().apply(&qs, &[result], &mut surface);

        assert_eq!(count, 1);
        assert_eq!(surface.selected_options(), vec![(0, 0)]);
    }

    #[test]
    fn test_snippet_resolution_below_threshold_skips() {
        let qs = questions(vec![question(
            0,
            QuestionType::Radio,
            "What is the capital of France?",
            &["Paris", "London"],
        )]);
        let mut surface = TestSurface::default();
        let result = AnswerResult {
            id: None,
            question_snippet: Some("something entirely different here".to_string()),
            answers: vec!["Paris".to_string()],
        };

        let count = applicator().apply(&qs, &[result], &mut surface);

        assert_eq!(count, 0);
        assert!(surface.selected_options().is_empty());
    }

    #[test]
    fn test_unknown_id_skipped() {
        let qs = questions(vec![question(
            0,
            QuestionType::Radio,
            "Pick one",
            &["Paris", "London"],
        )]);
        let mut surface = TestSurface::default();

        let count = applicator().apply(&qs, &[answer_by_id(99, &["Paris"])], &mut surface);

        assert_eq!(count, 0);
    }

    #[test]
    fn test_clear_all_then_reapply_round_trip() {
        let qs = questions(vec![
            question(0, QuestionType::Checkbox, "Pick colors", &["Red", "Blue", "Green"]),
            question(1, QuestionType::Text, "你的爱好?", &[]),
        ]);
        let mut surface = TestSurface::default();
        let results = [answer_by_id(0, &["Red", "Green"]), answer_by_id(1, &["读书"])];
        let app = applicator();

        app.apply(&qs, &results, &mut surface);
        let selections = surface.selected_options();

        app.clear_all(&qs, &mut surface);
        assert!(surface.selected_options().is_empty());
        assert!(surface.marks.is_empty());
        assert_eq!(surface.texts.get(&1).map(String::as_str), Some(""));

        let count = app.apply(&qs, &results, &mut surface);
        assert_eq!(count, 3);
        assert_eq!(surface.selected_options(), selections);
    }
}
