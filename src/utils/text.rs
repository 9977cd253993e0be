//! 文本清理与分类
//!
//! 纯函数：空白归一化、中间状态文本识别、关键词分词与重合判断

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// 页面在真正生成回复之前显示的中间状态文本
const TRANSIENT_PATTERNS: &[&str] = &[r"找到\d+相关资料", r"正在分析", r"正在处理", r"正在生成"];

static NORMALIZER: LazyLock<TextNormalizer> = LazyLock::new(TextNormalizer::new);

/// 文本清理器，持有编译好的正则
pub struct TextNormalizer {
    whitespace: Regex,
    space_before_punct: Regex,
    transient: Vec<Regex>,
    word: Regex,
}

impl TextNormalizer {
    fn new() -> Self {
        Self {
            whitespace: Regex::new(r"\s+").expect("静态正则"),
            space_before_punct: Regex::new(r"\s+([.。，,；;！!？?])").expect("静态正则"),
            transient: TRANSIENT_PATTERNS
                .iter()
                .map(|p| Regex::new(p).expect("静态正则"))
                .collect(),
            word: Regex::new(r"\b\w+\b").expect("静态正则"),
        }
    }

    /// 连续空白折叠为一个空格，去掉句末标点前的空白
    pub fn normalize(&self, text: &str) -> String {
        let collapsed = self.whitespace.replace_all(text.trim(), " ");
        self.space_before_punct
            .replace_all(collapsed.trim(), "$1")
            .into_owned()
    }

    /// 是否为中间状态文本
    pub fn is_transient(&self, text: &str) -> bool {
        self.transient.iter().any(|re| re.is_match(text))
    }

    /// 小写后按单词边界切分
    pub fn tokenize(&self, text: &str) -> HashSet<String> {
        let lowered = text.to_lowercase();
        self.word
            .find_iter(&lowered)
            .map(|m| m.as_str().to_string())
            .collect()
    }

    /// 两段文本的共同词数是否达到 `min(min_keywords, 查询词数)`
    pub fn shares_keywords(&self, text: &str, query: &str, min_keywords: usize) -> bool {
        if text.is_empty() || query.is_empty() {
            return false;
        }
        let text_words = self.tokenize(text);
        let query_words = self.tokenize(query);
        let common = text_words.intersection(&query_words).count();
        common >= min_keywords.min(query_words.len())
    }
}

/// 见 [`TextNormalizer::normalize`]
pub fn normalize(text: &str) -> String {
    NORMALIZER.normalize(text)
}

/// 见 [`TextNormalizer::is_transient`]
pub fn is_transient(text: &str) -> bool {
    NORMALIZER.is_transient(text)
}

/// 见 [`TextNormalizer::tokenize`]
pub fn tokenize(text: &str) -> HashSet<String> {
    NORMALIZER.tokenize(text)
}

/// 见 [`TextNormalizer::shares_keywords`]
pub fn shares_keywords(text: &str, query: &str, min_keywords: usize) -> bool {
    NORMALIZER.shares_keywords(text, query, min_keywords)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  你好\n\n  世界 \t!"), "你好 世界!");
        assert_eq!(normalize("a  b\nc"), "a b c");
        assert_eq!(normalize("结束了 。"), "结束了。");
        assert_eq!(normalize("Hello , world ?"), "Hello, world?");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_transient_patterns() {
        assert!(is_transient("找到12相关资料"));
        assert!(is_transient("正在分析你的问题"));
        assert!(is_transient("正在生成..."));
        assert!(!is_transient("找到相关资料"));
        assert!(!is_transient("递归是函数调用自身"));
    }

    #[test]
    fn test_tokenize_is_case_folded() {
        let tokens = tokenize("Explain RECURSION, please");
        assert!(tokens.contains("explain"));
        assert!(tokens.contains("recursion"));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_shares_keywords() {
        assert!(shares_keywords(
            "Recursion is when you explain a thing in terms of itself",
            "explain recursion",
            2
        ));
        assert!(!shares_keywords("Recursion is neat", "explain recursion", 2));
        // 单词查询只要求一个共同词
        assert!(shares_keywords("Hello there", "hello", 2));
        assert!(!shares_keywords("", "hello", 2));
    }

    proptest! {
        #[test]
        fn prop_normalize_is_idempotent(s in "\\PC*") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_normalize_idempotent_on_spacey_punctuation(s in "[ a-z\\n\\t.,;!?。，；！？]{0,40}") {
            let once = normalize(&s);
            prop_assert_eq!(normalize(&once), once);
        }
    }
}
