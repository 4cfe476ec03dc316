//! 题目内容解码
//! contentUri 是十六进制编码的 UTF-8 文本，正文为按行组织的题目格式：
//!
//! ```text
//! Question: 中国的首都是哪里？
//! Options:
//! 上海
//! 北京
//! Correct Answer: 北京
//! ```

use serde::Serialize;

const QUESTION_MARKER: &str = "Question:";
const QUESTION_PREFIX: &str = "Question: ";
const OPTIONS_MARKER: &str = "Options:";
const ANSWER_MARKER: &str = "Correct Answer:";
const ANSWER_PREFIX: &str = "Correct Answer: ";

/// 解析结果，不持久化，内容变化时重新计算
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedQuestionContent {
    pub title: String,
    pub description: String,
    pub options: Vec<String>,
    pub correct_answer: String,
}

/// 解码 `0x` 十六进制内容；失败时记录日志并原样返回
pub fn decode_content(raw: &str) -> String {
    let Some(body) = raw.strip_prefix("0x") else {
        return raw.to_string();
    };

    let decoded = hex::decode(body)
        .map_err(anyhow::Error::from)
        .and_then(|bytes| String::from_utf8(bytes).map_err(anyhow::Error::from));

    match decoded {
        Ok(text) => text,
        Err(e) => {
            log::warn!("解析题目内容出错: {}", e);
            raw.to_string()
        }
    }
}

/// 逐行解析器
#[derive(Debug, Default)]
pub struct ContentParser {
    in_options: bool,
    parsed: ParsedQuestionContent,
}

impl ContentParser {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn parse(&mut self, content: &str) -> ParsedQuestionContent {
        self.reset();

        if !content.contains(QUESTION_MARKER) {
            return ParsedQuestionContent::default();
        }

        let mut lines = content.split('\n').map(|line| line.strip_suffix('\r').unwrap_or(line));
        if let Some(first) = lines.next() {
            self.parsed.title = first.replacen(QUESTION_PREFIX, "", 1);
        }
        for line in lines {
            self.process_line(line);
        }

        self.parsed.description = self.parsed.title.clone();
        std::mem::take(&mut self.parsed)
    }

    fn reset(&mut self) {
        self.in_options = false;
        self.parsed = ParsedQuestionContent::default();
    }

    fn process_line(&mut self, line: &str) {
        if line == OPTIONS_MARKER {
            self.in_options = true;
            return;
        }

        if line.starts_with(ANSWER_MARKER) {
            self.in_options = false;
            self.parsed.correct_answer = line.replacen(ANSWER_PREFIX, "", 1);
            return;
        }

        if self.in_options && !line.trim().is_empty() {
            self.parsed.options.push(line.to_string());
        }
    }
}

/// 解析已解码的文本
pub fn parse_content(content: &str) -> ParsedQuestionContent {
    ContentParser::new().parse(content)
}

/// 解码并解析 contentUri
pub fn parse_content_uri(content_uri: &str) -> ParsedQuestionContent {
    parse_content(&decode_content(content_uri))
}

/// 标题为空时使用占位标题
pub fn display_title(parsed: &ParsedQuestionContent, id: u64) -> String {
    if parsed.title.is_empty() {
        format!("题目 #{}", id)
    } else {
        parsed.title.clone()
    }
}

fn single_line(text: &str) -> String {
    text.trim().replace(['\r', '\n'], " ")
}

/// 渲染后会被当作格式标记的文本，不能作为选项
pub fn is_reserved_line(text: &str) -> bool {
    let line = single_line(text);
    line == OPTIONS_MARKER || line.starts_with(ANSWER_MARKER)
}

/// 把草稿写成题目格式；不写 `Correct Answer:` 行，答案只以哈希形式上链
pub fn render_content(question: &str, options: &[String]) -> String {
    let mut content = format!("{}{}\n{}", QUESTION_PREFIX, single_line(question), OPTIONS_MARKER);
    for option in options {
        content.push('\n');
        content.push_str(&single_line(option));
    }
    content
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_round_trip() {
        let text = "Question: 区块链是什么？\nOptions:\nA\nB";
        let hex_content = format!("0x{}", hex::encode(text));

        let decoded = decode_content(&hex_content);

        assert_eq!(decoded, text);
        assert_eq!(format!("0x{}", hex::encode(&decoded)), hex_content);
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(decode_content("什么是以太坊"), "什么是以太坊");
        assert_eq!(decode_content(""), "");
    }

    #[test]
    fn test_bad_hex_falls_back_to_raw() {
        assert_eq!(decode_content("0xnothex"), "0xnothex");
        // 合法十六进制但不是 UTF-8
        assert_eq!(decode_content("0xfffe"), "0xfffe");
    }

    #[test]
    fn test_parse_full_format() {
        let parsed = parse_content("Question: T\nOptions:\nA\nB\nCorrect Answer: A");

        assert_eq!(parsed.title, "T");
        assert_eq!(parsed.description, "T");
        assert_eq!(parsed.options, vec!["A", "B"]);
        assert_eq!(parsed.correct_answer, "A");
    }

    #[test]
    fn test_parse_without_marker() {
        let parsed = parse_content("just some words\nOptions:\nA");

        assert_eq!(parsed, ParsedQuestionContent::default());
        assert_eq!(display_title(&parsed, 7), "题目 #7");
    }

    #[test]
    fn test_parse_missing_answer_and_blank_lines() {
        let parsed = parse_content("Question: T\nignored\nOptions:\nA\n\n   \nB");

        assert_eq!(parsed.options, vec!["A", "B"]);
        assert_eq!(parsed.correct_answer, "");
    }

    #[test]
    fn test_lines_after_answer_are_ignored() {
        let parsed = parse_content("Question: T\nOptions:\nA\nCorrect Answer: A\nB");
        assert_eq!(parsed.options, vec!["A"]);
    }

    #[test]
    fn test_reserved_lines() {
        assert!(is_reserved_line("Options:"));
        assert!(is_reserved_line("  Options:\n"));
        assert!(is_reserved_line("Correct Answer: b"));
        assert!(is_reserved_line("\nCorrect Answer:"));
        assert!(!is_reserved_line("Options: 两个"));
        assert!(!is_reserved_line("the Correct Answer: b"));
        assert!(!is_reserved_line("北京"));
    }

    #[test]
    fn test_reserved_option_breaks_rendered_content() {
        let options = vec!["Correct Answer: b".to_string(), "b".to_string()];
        let parsed = parse_content(&render_content("T", &options));
        // 渲染后选项被当成答案行，因此出题前必须拒绝
        assert_eq!(parsed.correct_answer, "b");
        assert!(parsed.options.is_empty());
    }

    #[test]
    fn test_rendered_draft_parses_back() {
        let options = vec!["上海".to_string(), "北京\n".to_string()];
        let content = render_content("中国的首都是哪里？", &options);
        let parsed = parse_content_uri(&format!("0x{}", hex::encode(&content)));

        assert_eq!(parsed.title, "中国的首都是哪里？");
        assert_eq!(parsed.options, vec!["上海", "北京"]);
        assert!(parsed.correct_answer.is_empty());
    }
}
